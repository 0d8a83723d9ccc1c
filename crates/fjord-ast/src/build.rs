//! Constructors for building trees without source text.
//!
//! Nodes built here carry an empty span; use `with_span` where a position
//! matters.

use rowan::TextRange;

use crate::expr::*;
use crate::item::*;
use crate::pat::{FieldBinding, Pattern, PatternKind};
use crate::ty::{FieldType, TypeExpr, TypeExprKind};
use crate::{Ident, RefName};

fn nowhere() -> TextRange {
    TextRange::default()
}

pub fn ident(name: &str) -> Ident {
    Ident::new(name, nowhere())
}

pub fn ref_name(name: &str) -> RefName {
    RefName {
        module: None,
        name: name.to_string(),
        span: nowhere(),
    }
}

pub fn ref_name_in(module: &str, name: &str) -> RefName {
    RefName {
        module: Some(module.to_string()),
        name: name.to_string(),
        span: nowhere(),
    }
}

// ── Types ──────────────────────────────────────────────────────────────

fn type_expr(kind: TypeExprKind) -> TypeExpr {
    TypeExpr {
        kind,
        span: nowhere(),
    }
}

/// `Name` (also used for type parameters).
pub fn ty(name: &str) -> TypeExpr {
    ty_args(name, vec![])
}

/// `Name[args]`
pub fn ty_args(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    type_expr(TypeExprKind::Ref {
        name: ref_name(name),
        args,
    })
}

/// `Module::Name[args]`
pub fn ty_in(module: &str, name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    type_expr(TypeExprKind::Ref {
        name: ref_name_in(module, name),
        args,
    })
}

pub fn unit_ty() -> TypeExpr {
    type_expr(TypeExprKind::Tuple(vec![]))
}

pub fn tuple_ty(elements: Vec<TypeExpr>) -> TypeExpr {
    type_expr(TypeExprKind::Tuple(elements))
}

pub fn bundle_ty(fields: Vec<(&str, TypeExpr)>) -> TypeExpr {
    type_expr(TypeExprKind::Bundle(
        fields
            .into_iter()
            .map(|(name, ty)| FieldType {
                name: ident(name),
                ty,
            })
            .collect(),
    ))
}

pub fn func_ty(input: TypeExpr, output: TypeExpr) -> TypeExpr {
    type_expr(TypeExprKind::Func {
        input: Box::new(input),
        output: Box::new(output),
    })
}

// ── Declarations ───────────────────────────────────────────────────────

pub fn param(name: &str) -> TypeParamDecl {
    TypeParamDecl {
        name: ident(name),
        bound: None,
        default: None,
    }
}

/// `name < bound`
pub fn param_below(name: &str, bound: TypeExpr) -> TypeParamDecl {
    TypeParamDecl {
        bound: Some(TypeBound {
            kind: BoundKind::Super,
            ty: bound,
        }),
        ..param(name)
    }
}

/// `name > bound`
pub fn param_above(name: &str, bound: TypeExpr) -> TypeParamDecl {
    TypeParamDecl {
        bound: Some(TypeBound {
            kind: BoundKind::Sub,
            ty: bound,
        }),
        ..param(name)
    }
}

pub fn param_default(name: &str, default: TypeExpr) -> TypeParamDecl {
    TypeParamDecl {
        default: Some(default),
        ..param(name)
    }
}

fn type_decl(name: &str, params: Vec<TypeParamDecl>, def: TypeDefExpr) -> TypeDecl {
    TypeDecl {
        name: ident(name),
        params,
        doc: String::new(),
        tags: Vec::new(),
        def,
        span: nowhere(),
    }
}

pub fn boxed(name: &str, params: Vec<TypeParamDecl>, inner: TypeExpr) -> TypeDecl {
    boxed_with(
        name,
        params,
        BoxedDecl {
            inner: Some(inner),
            ..BoxedDecl::default()
        },
    )
}

pub fn boxed_with(name: &str, params: Vec<TypeParamDecl>, decl: BoxedDecl) -> TypeDecl {
    type_decl(name, params, TypeDefExpr::Boxed(decl))
}

/// A boxed type with no inner type, i.e. boxing unit.
pub fn unit_boxed(name: &str) -> TypeDecl {
    boxed_with(name, vec![], BoxedDecl::default())
}

pub fn union(name: &str, params: Vec<TypeParamDecl>, cases: Vec<TypeDecl>) -> TypeDecl {
    type_decl(name, params, TypeDefExpr::Union(cases))
}

pub fn native(name: &str, params: Vec<TypeParamDecl>) -> TypeDecl {
    type_decl(name, params, TypeDefExpr::Native)
}

impl TypeDecl {
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.push(Tag {
            text: tag.to_string(),
            span: nowhere(),
        });
        self
    }

    pub fn with_span(mut self, span: TextRange) -> Self {
        self.span = span;
        self
    }
}

pub fn function(
    name: &str,
    params: Vec<TypeParamDecl>,
    input: TypeExpr,
    output: TypeExpr,
    body: Lambda,
) -> FunctionDecl {
    FunctionDecl {
        name: ident(name),
        public: true,
        doc: String::new(),
        params,
        input,
        output,
        body: FunctionBody::Lambda(body),
        span: nowhere(),
    }
}

pub fn native_function(
    name: &str,
    params: Vec<TypeParamDecl>,
    input: TypeExpr,
    output: TypeExpr,
) -> FunctionDecl {
    FunctionDecl {
        name: ident(name),
        public: true,
        doc: String::new(),
        params,
        input,
        output,
        body: FunctionBody::Native(name.to_string()),
        span: nowhere(),
    }
}

pub fn constant(name: &str, ty: TypeExpr, value: Expr) -> ConstDecl {
    ConstDecl {
        name: ident(name),
        public: true,
        doc: String::new(),
        ty,
        value: ConstValue::Expr(value),
        span: nowhere(),
    }
}

pub fn effect(value: Expr) -> DoStmt {
    DoStmt {
        value,
        span: nowhere(),
    }
}

pub fn module(name: &str) -> Module {
    Module {
        name: name.to_string(),
        ..Module::default()
    }
}

impl Module {
    pub fn import(mut self, name: &str) -> Self {
        self.imports.push(ident(name));
        self
    }

    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    pub fn with_function(mut self, decl: FunctionDecl) -> Self {
        self.functions.push(decl);
        self
    }

    pub fn with_constant(mut self, decl: ConstDecl) -> Self {
        self.constants.push(decl);
        self
    }

    pub fn with_effect(mut self, stmt: DoStmt) -> Self {
        self.effects.push(stmt);
        self
    }
}

// ── Patterns ───────────────────────────────────────────────────────────

pub fn pat(name: &str) -> Pattern {
    Pattern {
        kind: PatternKind::Trivial(ident(name)),
        span: nowhere(),
    }
}

pub fn pat_tuple(names: &[&str]) -> Pattern {
    Pattern {
        kind: PatternKind::Tuple(names.iter().map(|n| ident(n)).collect()),
        span: nowhere(),
    }
}

pub fn pat_bundle(fields: &[(&str, &str)]) -> Pattern {
    Pattern {
        kind: PatternKind::Bundle(
            fields
                .iter()
                .map(|(field, binding)| FieldBinding {
                    field: ident(field),
                    binding: ident(binding),
                })
                .collect(),
        ),
        span: nowhere(),
    }
}

// ── Expressions ────────────────────────────────────────────────────────

fn expr(kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: nowhere(),
    }
}

pub fn var(name: &str) -> Expr {
    var_args(name, vec![])
}

pub fn var_args(name: &str, type_args: Vec<TypeExpr>) -> Expr {
    expr(ExprKind::Ref(InlineRef {
        name: ref_name(name),
        type_args,
    }))
}

pub fn var_in(module: &str, name: &str) -> Expr {
    expr(ExprKind::Ref(InlineRef {
        name: ref_name_in(module, name),
        type_args: vec![],
    }))
}

pub fn call(callee: Expr, arg: Expr) -> Expr {
    expr(ExprKind::Call {
        callee: Box::new(callee),
        arg: Box::new(arg),
    })
}

pub fn infix(op: Expr, left: Expr, right: Expr) -> Expr {
    expr(ExprKind::Infix {
        op: Box::new(op),
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn cast(value: Expr, target: TypeExpr) -> Expr {
    expr(ExprKind::Cast {
        value: Box::new(value),
        target,
    })
}

pub fn get(base: Expr, field: &str) -> Expr {
    expr(ExprKind::Get {
        base: Box::new(base),
        field: ident(field),
    })
}

pub fn lambda(input: Pattern, output: Expr) -> Lambda {
    Lambda {
        input,
        output: Box::new(output),
        span: nowhere(),
    }
}

pub fn lambda_expr(input: Pattern, output: Expr) -> Expr {
    expr(ExprKind::Lambda(lambda(input, output)))
}

pub fn tuple(elements: Vec<Expr>) -> Expr {
    expr(ExprKind::Tuple(elements))
}

pub fn unit() -> Expr {
    tuple(vec![])
}

fn field_values(fields: Vec<(&str, Expr)>) -> Vec<FieldValue> {
    fields
        .into_iter()
        .map(|(name, value)| FieldValue {
            name: ident(name),
            value: Some(value),
        })
        .collect()
}

pub fn bundle(fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::Bundle(field_values(fields)))
}

pub fn update(base: Expr, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::Update {
        base: Box::new(base),
        fields: field_values(fields),
    })
}

pub fn array(items: Vec<Expr>) -> Expr {
    expr(ExprKind::Array(items))
}

pub fn int(digits: &str) -> Expr {
    expr(ExprKind::Int(digits.to_string()))
}

pub fn float(value: f64) -> Expr {
    expr(ExprKind::Float(value))
}

pub fn text(value: &str) -> Expr {
    expr(ExprKind::Text(value.to_string()))
}

pub fn char_lit(value: char) -> Expr {
    expr(ExprKind::Char(value))
}

pub fn binding(pattern: Pattern, value: Expr) -> Binding {
    Binding {
        pattern,
        ty: None,
        value,
        recursive: false,
        span: nowhere(),
    }
}

pub fn typed_binding(pattern: Pattern, ty: TypeExpr, value: Expr) -> Binding {
    Binding {
        ty: Some(ty),
        ..binding(pattern, value)
    }
}

pub fn block(bindings: Vec<Binding>, ret: Expr) -> Expr {
    expr(ExprKind::Block(Block {
        bindings,
        ret: Box::new(ret),
    }))
}

fn case_ref(name: &str) -> InlineRef {
    InlineRef {
        name: ref_name(name),
        type_args: vec![],
    }
}

/// `case A, B (pattern): value`
pub fn branch(types: &[&str], pattern: Option<Pattern>, value: Expr) -> Branch {
    Branch {
        types: types.iter().map(|t| case_ref(t)).collect(),
        pattern,
        value,
        span: nowhere(),
    }
}

pub fn default_branch(value: Expr) -> Branch {
    branch(&[], None, value)
}

pub fn switch(arg: Expr, branches: Vec<Branch>) -> Expr {
    expr(ExprKind::Switch(Switch {
        arg: Box::new(arg),
        branches,
    }))
}

/// `case (A, _, C) (pattern): value`
pub fn multi_branch(types: &[&str], pattern: Option<Pattern>, value: Expr) -> MultiBranch {
    MultiBranch {
        types: Some(types.iter().map(|t| case_ref(t)).collect()),
        pattern,
        value,
        span: nowhere(),
    }
}

pub fn multi_default(value: Expr) -> MultiBranch {
    MultiBranch {
        types: None,
        pattern: None,
        value,
        span: nowhere(),
    }
}

pub fn multi_switch(args: Vec<Expr>, branches: Vec<MultiBranch>) -> Expr {
    expr(ExprKind::MultiSwitch(MultiSwitch { args, branches }))
}

pub fn if_else(cond: Expr, yes: Expr, no: Expr) -> Expr {
    if_chain(cond, yes, vec![], no)
}

pub fn if_chain(cond: Expr, yes: Expr, elifs: Vec<(Expr, Expr)>, no: Expr) -> Expr {
    expr(ExprKind::If(If {
        cond: Box::new(cond),
        yes: Box::new(yes),
        elifs: elifs
            .into_iter()
            .map(|(cond, yes)| ElIf {
                cond,
                yes,
                span: nowhere(),
            })
            .collect(),
        no: Box::new(no),
    }))
}
