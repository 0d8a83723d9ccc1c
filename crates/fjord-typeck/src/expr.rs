//! Checked and partially checked expressions.
//!
//! Checking is bidirectional. [`check`] turns a syntax tree into a
//! [`SemiExpr`]: either a fully typed [`Expr`], or a construct whose type
//! depends on where it is used (a lambda, an integer literal, a tuple of
//! such things, an overloaded call that is still ambiguous, ...). Once the
//! expected type is known, [`crate::assign::assign_to`] finishes the job.

use fjord_ast::expr::{Expr as AstExpr, ExprKind, Lambda};
use fjord_ast::ty::TypeExpr;
use fjord_ast::{Ident, RefName};
use fjord_common::Symbol;
use rowan::TextRange;
use rustc_hash::FxHashMap;

use crate::config::Limits;
use crate::declare::resolve_type;
use crate::describe::describe_type;
use crate::error::{ExprError, ExprErrorKind};
use crate::function::{FunctionSig, ModuleScope};
use crate::infer::{describe_in_ctx, TypeArgsInferringContext};
use crate::pattern::CheckedPattern;
use crate::ty::{Type, TypeBounds, TypeCtx, TypeParam, TypeRegistry};
use crate::{array, block, call, lambda, literal, product, refs, sum};

// ── Typed expressions ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub ty: Type,
    pub value: ExprVal,
    pub span: TextRange,
}

impl Expr {
    pub fn new(ty: Type, value: ExprVal, span: TextRange) -> Self {
        Self { ty, value, span }
    }

    pub fn unit(span: TextRange) -> Self {
        Self::new(Type::unit(), ExprVal::UnitValue, span)
    }

    /// Same value, different type.
    pub fn with_type(self, ty: Type) -> Self {
        Self { ty, ..self }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprVal {
    UnitValue,
    /// Tuple elements, or bundle fields in slot order.
    Product(Vec<Expr>),
    Get {
        product: Box<Expr>,
        index: usize,
    },
    Set {
        product: Box<Expr>,
        index: usize,
        value: Box<Expr>,
    },
    /// A case value lifted into its union.
    Sum {
        value: Box<Expr>,
        index: usize,
    },
    Switch {
        arg: Box<Expr>,
        branches: Vec<Branch>,
        reactive: bool,
    },
    MultiSwitch {
        args: Vec<Expr>,
        branches: Vec<MultiBranch>,
    },
    Lambda {
        input: CheckedPattern,
        output: Box<Expr>,
    },
    Block {
        bindings: Vec<Binding>,
        ret: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arg: Box<Expr>,
    },
    /// The `index`-th overload of `name` within its declaring module.
    RefFunction {
        name: Symbol,
        index: usize,
        type_args: Vec<Type>,
    },
    RefConstant(Symbol),
    RefLocal(String),
    Array(Vec<Expr>),
    Int(i128),
    Float(f64),
    Text(String),
    Char(char),
}

/// A switch branch; `case` is `None` for the default branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub case: Option<usize>,
    pub pattern: Option<CheckedPattern>,
    pub value: Expr,
}

/// A multi-switch branch; `cases` is `None` for the default branch and
/// holds `None` at positions written as `_`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBranch {
    pub cases: Option<Vec<Option<usize>>>,
    pub pattern: Option<CheckedPattern>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub pattern: CheckedPattern,
    pub value: Expr,
    pub recursive: bool,
}

// ── Partially typed expressions ────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SemiExpr {
    pub value: SemiExprVal,
    pub span: TextRange,
}

impl SemiExpr {
    pub fn new(value: SemiExprVal, span: TextRange) -> Self {
        Self { value, span }
    }

    pub fn typed(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(SemiExprVal::Typed(expr), span)
    }

    pub fn as_typed(&self) -> Option<&Expr> {
        match &self.value {
            SemiExprVal::Typed(expr) => Some(expr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SemiExprVal {
    Typed(Expr),
    Lambda(UntypedLambda),
    Integer(i128),
    Ref(UntypedRef),
    Undecided(UndecidedCall),
    Tuple(Vec<SemiExpr>),
    Bundle(Vec<SemiField>),
    Array(Vec<SemiExpr>),
    Block(SemiBlock),
    Switch(SemiSwitch),
    MultiSwitch(SemiMultiSwitch),
}

/// A lambda waiting for its input type. The locals in scope where it was
/// written go along with it.
#[derive(Debug, Clone)]
pub struct UntypedLambda {
    pub lambda: Lambda,
    pub locals: FxHashMap<String, Type>,
}

#[derive(Debug, Clone)]
pub struct SemiField {
    pub name: Ident,
    pub value: SemiExpr,
}

#[derive(Debug, Clone)]
pub struct SemiBlock {
    pub bindings: Vec<Binding>,
    pub ret: Box<SemiExpr>,
}

#[derive(Debug, Clone)]
pub struct SemiSwitch {
    pub arg: Expr,
    pub branches: Vec<SemiBranch>,
    pub reactive: bool,
}

#[derive(Debug, Clone)]
pub struct SemiBranch {
    pub case: Option<usize>,
    pub pattern: Option<CheckedPattern>,
    pub value: SemiExpr,
}

#[derive(Debug, Clone)]
pub struct SemiMultiSwitch {
    pub args: Vec<Expr>,
    pub branches: Vec<SemiMultiBranch>,
}

#[derive(Debug, Clone)]
pub struct SemiMultiBranch {
    pub cases: Option<Vec<Option<usize>>>,
    pub pattern: Option<CheckedPattern>,
    pub value: SemiExpr,
}

/// A reference whose meaning depends on how it is used.
#[derive(Debug, Clone)]
pub struct UntypedRef {
    pub target: RefTarget,
    pub type_args: Vec<Type>,
}

#[derive(Debug, Clone)]
pub enum RefTarget {
    Type(TypeRef),
    Functions(FunctionsRef),
    /// A local value sharing its name with functions.
    FunctionsOrLocal { functions: FunctionsRef, local: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: Symbol,
    /// Written `Name!`: box without lifting into the union.
    pub force_exact: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionsRef {
    pub name: String,
    pub functions: Vec<FunctionSig>,
    /// A type of the same name, tried when no function accepts the call.
    pub type_fallback: Option<TypeRef>,
}

/// An overloaded call with several viable candidates.
#[derive(Debug, Clone)]
pub struct UndecidedCall {
    pub name: String,
    pub options: Vec<CallOption>,
}

#[derive(Debug, Clone)]
pub struct CallOption {
    pub expr: Expr,
    pub desc: String,
}

// ── Context ────────────────────────────────────────────────────────────

/// Everything an expression is checked against. Cloning is cheap apart
/// from the locals, which grow as patterns bind names.
#[derive(Debug, Clone)]
pub struct ExprContext<'a> {
    pub module: &'a str,
    pub registry: &'a TypeRegistry,
    pub scope: &'a ModuleScope,
    /// Parameters and bounds of the enclosing function.
    pub params: &'a [TypeParam],
    pub bounds: &'a TypeBounds,
    pub limits: &'a Limits,
    pub locals: FxHashMap<String, Type>,
}

impl<'a> ExprContext<'a> {
    pub fn types(&self) -> TypeCtx<'a> {
        TypeCtx {
            module: self.module,
            registry: self.registry,
            params: self.params,
            bounds: self.bounds,
        }
    }

    /// A context with more locals; later names shadow earlier ones.
    pub fn with_locals(&self, added: impl IntoIterator<Item = (String, Type)>) -> Self {
        let mut ctx = self.clone();
        ctx.locals.extend(added);
        ctx
    }

    pub fn with_pattern(&self, pattern: &CheckedPattern) -> Self {
        self.with_locals(pattern.bindings())
    }

    pub fn describe(&self, t: &Type) -> String {
        describe_type(t, self.module, self.params)
    }

    pub fn describe_inferred(&self, t: &Type, infer: &TypeArgsInferringContext) -> String {
        describe_in_ctx(t, &self.types(), infer)
    }

    /// Convert a type written inside an expression.
    pub fn resolve_type(&self, te: &TypeExpr) -> Result<Type, ExprError> {
        Ok(resolve_type(te, &self.types(), self.limits)?)
    }

    pub fn function_refs(&self, name: &str) -> Option<&'a [FunctionSig]> {
        self.scope.functions.get(name).map(|v| v.as_slice())
    }

    fn lookup_type(&self, symbol: &Symbol) -> Option<TypeRef> {
        if self.registry.contains(symbol) {
            return Some(TypeRef {
                name: symbol.clone(),
                force_exact: false,
            });
        }
        let stripped = symbol.name.strip_suffix('!').filter(|s| !s.is_empty())?;
        let exact = Symbol::new(symbol.module.as_str(), stripped);
        self.registry.contains(&exact).then_some(TypeRef {
            name: exact,
            force_exact: true,
        })
    }

    fn lookup_unqualified_type(&self, name: &str) -> Option<TypeRef> {
        self.lookup_type(&Symbol::new(self.module, name))
            .or_else(|| self.lookup_type(&Symbol::core(name)))
    }

    fn lookup_functions(&self, name: &str, module: Option<&str>) -> Option<Vec<FunctionSig>> {
        let found: Vec<FunctionSig> = self
            .function_refs(name)?
            .iter()
            .filter(|f| module.map_or(true, |m| f.symbol.module == m))
            .cloned()
            .collect();
        (!found.is_empty()).then_some(found)
    }

    /// Resolve a name used as a value.
    ///
    /// Unqualified names are looked up as a local, a type parameter, a
    /// function, a type, then a constant. Qualified names are looked up
    /// as a type, a constant, then a function of that module.
    pub fn lookup(&self, name: &RefName) -> Option<Sym> {
        if let Some(module) = &name.module {
            let symbol = Symbol::new(module.as_str(), name.name.as_str());
            if let Some(t) = self.lookup_type(&symbol) {
                return Some(Sym::Type(t));
            }
            if let Some(c) = self.scope.constants.get(&symbol) {
                return Some(Sym::Constant(c.symbol.clone(), c.ty.clone()));
            }
            let functions = self.lookup_functions(&name.name, Some(module))?;
            return Some(Sym::Functions(FunctionsRef {
                name: name.name.clone(),
                functions,
                type_fallback: None,
            }));
        }
        let raw = name.name.as_str();
        if raw == "_" {
            return None;
        }
        if let Some(local) = self.locals.get(raw) {
            return Some(match self.lookup_functions(raw, None) {
                Some(functions) => Sym::LocalAndFunctions(
                    local.clone(),
                    FunctionsRef {
                        name: raw.to_string(),
                        functions,
                        type_fallback: self.lookup_unqualified_type(raw),
                    },
                ),
                None => Sym::Local(local.clone()),
            });
        }
        if let Some(index) = self.params.iter().position(|p| p.name == raw) {
            return Some(Sym::TypeParam(index));
        }
        if let Some(functions) = self.lookup_functions(raw, None) {
            return Some(Sym::Functions(FunctionsRef {
                name: raw.to_string(),
                functions,
                type_fallback: self.lookup_unqualified_type(raw),
            }));
        }
        if let Some(t) = self.lookup_unqualified_type(raw) {
            return Some(Sym::Type(t));
        }
        [Symbol::new(self.module, raw), Symbol::core(raw)]
            .iter()
            .find_map(|s| self.scope.constants.get(s))
            .map(|c| Sym::Constant(c.symbol.clone(), c.ty.clone()))
    }
}

/// What a name refers to in an expression.
#[derive(Debug, Clone)]
pub enum Sym {
    Local(Type),
    LocalAndFunctions(Type, FunctionsRef),
    TypeParam(usize),
    Functions(FunctionsRef),
    Type(TypeRef),
    Constant(Symbol, Type),
}

// ── Dispatch ───────────────────────────────────────────────────────────

pub fn check(expr: &AstExpr, ctx: &ExprContext<'_>) -> Result<SemiExpr, ExprError> {
    let span = expr.span;
    match &expr.kind {
        ExprKind::Ref(r) => refs::check_ref(r, span, ctx),
        ExprKind::Call { callee, arg } => call::check_call(callee, arg, span, ctx),
        ExprKind::Infix { op, left, right } => call::check_infix(op, left, right, span, ctx),
        ExprKind::Cast { value, target } => call::check_cast(value, target, span, ctx),
        ExprKind::Get { base, field } => product::check_get(base, field, span, ctx),
        ExprKind::Lambda(l) => Ok(lambda::check_lambda(l, span, ctx)),
        ExprKind::Tuple(elements) => product::check_tuple(elements, span, ctx),
        ExprKind::Bundle(fields) => product::check_bundle(fields, span, ctx),
        ExprKind::Update { base, fields } => product::check_update(base, fields, span, ctx),
        ExprKind::Array(items) => array::check_array(items, span, ctx),
        ExprKind::Block(b) => block::check_block(b, span, ctx),
        ExprKind::Switch(sw) => sum::check_switch(sw, span, ctx),
        ExprKind::MultiSwitch(msw) => sum::check_multi_switch(msw, span, ctx),
        ExprKind::If(i) => sum::check_if(i, span, ctx),
        ExprKind::Int(digits) => literal::check_integer(digits, span),
        ExprKind::Float(value) => Ok(literal::check_float(*value, span)),
        ExprKind::Text(value) => Ok(literal::check_text(value, span)),
        ExprKind::Char(value) => Ok(literal::check_char(*value, span)),
    }
}

/// Check `expr` and assign it to `expected`.
pub fn check_and_assign(
    expected: Option<&Type>,
    expr: &AstExpr,
    ctx: &ExprContext<'_>,
    infer: &mut TypeArgsInferringContext,
) -> Result<Expr, ExprError> {
    let semi = check(expr, ctx)?;
    crate::assign::assign_to(expected, semi, ctx, infer)
}

/// Give `semi` the type it has on its own, without an expected type.
pub fn assign_untyped(semi: SemiExpr, ctx: &ExprContext<'_>) -> Result<Expr, ExprError> {
    crate::assign::assign_to(None, semi, ctx, &mut TypeArgsInferringContext::disabled())
}

pub(crate) fn internal(detail: impl Into<String>, span: TextRange) -> ExprError {
    ExprError::new(
        ExprErrorKind::Internal {
            detail: detail.into(),
        },
        span,
    )
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for expression-level tests.

    use fjord_ast::item::Module;

    use super::*;
    use crate::builtins::core_module;
    use crate::declare::declare_types;
    use crate::function::collect_scope;

    pub struct Fixture {
        pub module: String,
        pub registry: TypeRegistry,
        pub scope: ModuleScope,
        pub limits: Limits,
        pub bounds: TypeBounds,
    }

    impl Fixture {
        /// Declare `module` next to the core module.
        pub fn new(module: Module) -> Self {
            let limits = Limits::default();
            let core = core_module();
            let declared = declare_types(&[&core, &module], &limits);
            assert!(declared.errors.is_empty(), "{:?}", declared.errors);
            let registry = declared.registry;
            let (scope, errors) = collect_scope(&module, &[&core], &registry, &limits);
            assert!(errors.is_empty(), "{:?}", errors);
            Fixture {
                module: module.name.clone(),
                registry,
                scope,
                limits,
                bounds: TypeBounds::default(),
            }
        }

        pub fn ctx(&self) -> ExprContext<'_> {
            ExprContext {
                module: &self.module,
                registry: &self.registry,
                scope: &self.scope,
                params: &[],
                bounds: &self.bounds,
                limits: &self.limits,
                locals: FxHashMap::default(),
            }
        }

        pub fn named(&self, name: &str) -> Type {
            let local = Symbol::new(self.module.as_str(), name);
            if self.registry.contains(&local) {
                Type::named(local, vec![])
            } else {
                Type::named(Symbol::core(name), vec![])
            }
        }
    }
}
