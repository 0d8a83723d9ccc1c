//! Resolved syntax tree for the Fjord type checker.
//!
//! The loader hands the checker owned, already-resolved trees: module
//! qualifiers on references are module names (not import aliases), and
//! every node carries the [`TextRange`] of the source it came from.
//!
//! # Architecture
//!
//! - [`ty`]: type expressions (`Shape`, `(Int, String)`, `{ x: Float }`, ...)
//! - [`item`]: modules and declarations (types, functions, constants, `do`)
//! - [`expr`]: expressions
//! - [`pat`]: binding patterns
//! - [`build`]: span-less constructors for building trees by hand

pub mod build;
pub mod expr;
pub mod item;
pub mod pat;
pub mod ty;

pub use rowan::{TextRange, TextSize};

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: TextRange,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: TextRange) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A possibly module-qualified reference, e.g. `Shape` or `Geometry::Shape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefName {
    pub module: Option<String>,
    pub name: String,
    pub span: TextRange,
}

impl RefName {
    pub fn is_qualified(&self) -> bool {
        self.module.is_some()
    }
}

/// Build a range from raw offsets.
pub fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::from(start), TextSize::from(end))
}
