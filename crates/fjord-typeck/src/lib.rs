//! Fjord type checker: bidirectional checking with local inference.
//!
//! The checker takes resolved modules from the loader and produces typed
//! expression trees. Types are nominal (boxed types, unions and their
//! case types, natives) or structural (unit, tuples, bundles, functions),
//! with declaration-site variance and bounded type parameters.
//!
//! Expressions are checked in two steps. [`expr::check`] gives each
//! expression a partial form that may still depend on the expected type;
//! [`assign::assign_to`] completes it against that type, boxing values and
//! lifting case values into their union when a direct assignment fails.
//! Type arguments of generic calls are inferred per call.
//!
//! # Architecture
//!
//! - [`ty`], [`variance`], [`describe`]: the type model
//! - [`declare`], [`validate`], [`bounds`]: building and validating the type registry
//! - [`builtins`]: the `Core` module
//! - [`unbox`], [`boxing`]: moving between boxed types and their inner types
//! - [`infer`], [`assign`], [`generics`], [`overload`]: assignment and inference
//! - [`expr`] and its per-construct modules: expression checking
//! - [`function`], [`data`], [`module`]: declarations and whole programs
//! - [`error`], [`diagnostics`], [`config`]: errors, their rendering, settings

pub mod array;
pub mod assign;
pub mod block;
pub mod bounds;
pub mod boxing;
pub mod builtins;
pub mod call;
pub mod config;
pub mod data;
pub mod declare;
pub mod describe;
pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod function;
pub mod generics;
pub mod infer;
pub mod lambda;
pub mod literal;
pub mod module;
pub mod overload;
pub mod pattern;
pub mod product;
pub mod refs;
pub mod sum;
pub mod ty;
pub mod unbox;
pub mod validate;
pub mod variance;

pub use config::TypeckConfig;
pub use error::CheckError;
pub use module::{check_program, CheckResult, CheckedModule};
