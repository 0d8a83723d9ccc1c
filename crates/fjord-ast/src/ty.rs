//! Type expressions as written in declarations and annotations.

use rowan::TextRange;

use crate::{Ident, RefName};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `Name` or `Name[A, B]`. A reference to a type parameter is a
    /// `Ref` without arguments.
    Ref { name: RefName, args: Vec<TypeExpr> },
    /// `()` / `(A, B)`; a one-element tuple denotes its element.
    Tuple(Vec<TypeExpr>),
    /// `{ a: A, b: B }`; the empty bundle denotes unit.
    Bundle(Vec<FieldType>),
    /// `(λ In Out)`
    Func {
        input: Box<TypeExpr>,
        output: Box<TypeExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub name: Ident,
    pub ty: TypeExpr,
}

impl TypeExpr {
    pub fn with_span(mut self, span: TextRange) -> Self {
        self.span = span;
        self
    }
}
