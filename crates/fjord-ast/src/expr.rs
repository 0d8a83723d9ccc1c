//! Expressions.

use rowan::TextRange;

use crate::pat::Pattern;
use crate::ty::TypeExpr;
use crate::{Ident, RefName};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: TextRange,
}

impl Expr {
    pub fn with_span(mut self, span: TextRange) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ref(InlineRef),
    /// `f(arg)`; several arguments are passed as a tuple.
    Call {
        callee: Box<Expr>,
        arg: Box<Expr>,
    },
    /// `left op right`
    Infix {
        op: Box<Expr>,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `value as Type`
    Cast {
        value: Box<Expr>,
        target: TypeExpr,
    },
    /// `base.field`
    Get {
        base: Box<Expr>,
        field: Ident,
    },
    Lambda(Lambda),
    Tuple(Vec<Expr>),
    Bundle(Vec<FieldValue>),
    /// `base with { field: value, ... }`
    Update {
        base: Box<Expr>,
        fields: Vec<FieldValue>,
    },
    Array(Vec<Expr>),
    Block(Block),
    Switch(Switch),
    MultiSwitch(MultiSwitch),
    If(If),
    /// Decimal digits with an optional leading `-`.
    Int(String),
    Float(f64),
    Text(String),
    Char(char),
}

/// A reference with optional explicit type arguments, e.g. `map[Int, String]`.
/// A name ending in `!` asks for exact boxing.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRef {
    pub name: RefName,
    pub type_args: Vec<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub input: Pattern,
    pub output: Box<Expr>,
    pub span: TextRange,
}

/// `name: value`; the value may be omitted to mean `name: name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: Ident,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub bindings: Vec<Binding>,
    pub ret: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub pattern: Pattern,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub recursive: bool,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub arg: Box<Expr>,
    pub branches: Vec<Branch>,
}

/// `case A, B (pattern): value`; an empty type list is the default branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub types: Vec<InlineRef>,
    pub pattern: Option<Pattern>,
    pub value: Expr,
    pub span: TextRange,
}

impl Branch {
    pub fn is_default(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiSwitch {
    pub args: Vec<Expr>,
    pub branches: Vec<MultiBranch>,
}

/// One case per argument, `_` for "any case"; `None` is the default branch.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiBranch {
    pub types: Option<Vec<InlineRef>>,
    pub pattern: Option<Pattern>,
    pub value: Expr,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Box<Expr>,
    pub yes: Box<Expr>,
    pub elifs: Vec<ElIf>,
    pub no: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElIf {
    pub cond: Expr,
    pub yes: Expr,
    pub span: TextRange,
}
