//! Fully qualified names.
//!
//! Every type, function and constant known to the checker is addressed by a
//! [`Symbol`]: the name of the module that declares it plus its local name.
//! Names declared by the core module print without their module prefix.

use std::fmt;

use serde::Serialize;

/// Name of the implicitly imported core module.
pub const CORE_MODULE: &str = "Core";

/// A module-qualified name, e.g. `Geometry::Shape`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol {
    pub module: String,
    pub name: String,
}

impl Symbol {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// A symbol declared by the core module.
    pub fn core(name: impl Into<String>) -> Self {
        Self::new(CORE_MODULE, name)
    }

    /// Whether this symbol lives in the core module.
    pub fn is_core(&self) -> bool {
        self.module == CORE_MODULE
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_core() || self.module.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.module, self.name)
        }
    }
}
