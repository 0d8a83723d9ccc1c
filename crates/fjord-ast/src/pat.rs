//! Binding patterns used by lambdas, blocks and switch branches.

use rowan::TextRange;

use crate::Ident;

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `x`
    Trivial(Ident),
    /// `(a, _, c)`; `_` ignores the element.
    Tuple(Vec<Ident>),
    /// `{ field: name, ... }`
    Bundle(Vec<FieldBinding>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    pub field: Ident,
    pub binding: Ident,
}
