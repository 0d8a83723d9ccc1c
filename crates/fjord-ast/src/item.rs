//! Modules and top-level declarations.

use rowan::TextRange;

use crate::expr::{Expr, Lambda};
use crate::ty::TypeExpr;
use crate::Ident;

/// A whole program: every module reachable from the entry point.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub imports: Vec<Ident>,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<FunctionDecl>,
    pub constants: Vec<ConstDecl>,
    pub effects: Vec<DoStmt>,
}

/// A declared type parameter. The name may start with `+` (covariant) or
/// `-` (contravariant).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub name: Ident,
    pub bound: Option<TypeBound>,
    pub default: Option<TypeExpr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `T > B`: every argument must be a supertype of `B`.
    Sub,
    /// `T < B`: every argument must be a subtype of `B`.
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeBound {
    pub kind: BoundKind,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Ident,
    pub params: Vec<TypeParamDecl>,
    pub doc: String,
    /// Raw `# ...` tag lines attached to the declaration.
    pub tags: Vec<Tag>,
    pub def: TypeDefExpr,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub text: String,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefExpr {
    /// A union; its case types are declared in place.
    Union(Vec<TypeDecl>),
    Boxed(BoxedDecl),
    Native,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxedDecl {
    /// `None` boxes unit.
    pub inner: Option<TypeExpr>,
    pub protected: bool,
    pub opaque: bool,
    pub weak: bool,
    pub implicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub public: bool,
    pub doc: String,
    pub params: Vec<TypeParamDecl>,
    pub input: TypeExpr,
    pub output: TypeExpr,
    pub body: FunctionBody,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Lambda(Lambda),
    /// Implemented by the host runtime under the given id.
    Native(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: Ident,
    pub public: bool,
    pub doc: String,
    pub ty: TypeExpr,
    pub value: ConstValue,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Expr(Expr),
    Native(String),
}

/// `do <effect>`
#[derive(Debug, Clone, PartialEq)]
pub struct DoStmt {
    pub value: Expr,
    pub span: TextRange,
}
