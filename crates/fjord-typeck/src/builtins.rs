//! The core module.
//!
//! `Core` is declared with the same AST the loader produces for user
//! modules and registered alongside them, so its names resolve from every
//! module without an import.

use fjord_ast::build::{boxed, native, param, ty, union, unit_boxed};
use fjord_ast::item::Module;
use fjord_common::symbol::CORE_MODULE;
use fjord_common::Symbol;

use crate::config::Limits;
use crate::declare::declare_types;
use crate::ty::{Type, TypeRegistry};

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const NUMBER: &str = "Number";
pub const STRING: &str = "String";
pub const CHAR: &str = "Char";
pub const BYTES: &str = "Bytes";
pub const BOOL: &str = "Bool";
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const MAYBE: &str = "Maybe";
pub const LIST: &str = "List";
pub const ARRAY: &str = "Array";
pub const REACTIVE: &str = "Reactive";
pub const EFFECT: &str = "Effect";
pub const ERROR: &str = "Error";

/// Sized integer types, narrowest first.
pub const SIZED_INTEGERS: &[&str] = &["Byte", "Word", "Int32", "Uint32", "Int64", "Uint64"];

pub fn core_module() -> Module {
    let mut m = Module {
        name: CORE_MODULE.to_string(),
        ..Module::default()
    };
    for name in [INT, FLOAT, NUMBER, STRING, CHAR, BYTES, ERROR]
        .into_iter()
        .chain(SIZED_INTEGERS.iter().copied())
    {
        m.types.push(native(name, vec![]));
    }
    m.types.push(native(LIST, vec![param("+T")]));
    m.types.push(native(ARRAY, vec![param("T")]));
    m.types.push(native(REACTIVE, vec![param("T")]));
    m.types.push(native(EFFECT, vec![param("+T")]));
    m.types.push(union(BOOL, vec![], vec![unit_boxed(YES), unit_boxed(NO)]));
    m.types.push(union(
        MAYBE,
        vec![param("+T")],
        vec![boxed("Some", vec![param("+T")], ty("T")), unit_boxed("None")],
    ));
    m
}

/// A registry holding only the core types.
pub fn core_registry() -> TypeRegistry {
    declare_types(&[&core_module()], &Limits::default()).registry
}

/// A non-generic core type.
pub fn core_type(name: &str) -> Type {
    Type::named(Symbol::core(name), vec![])
}

pub fn bool_type() -> Type {
    core_type(BOOL)
}

pub fn array_of(element: Type) -> Type {
    Type::named(Symbol::core(ARRAY), vec![element])
}

pub fn effect_of(value: Type) -> Type {
    Type::named(Symbol::core(EFFECT), vec![value])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::Variance;

    #[test]
    fn core_declares_cleanly() {
        let declared = declare_types(&[&core_module()], &Limits::default());
        assert!(declared.errors.is_empty());
        let maybe = declared.registry.get(&Symbol::core(MAYBE)).unwrap();
        assert_eq!(maybe.params[0].variance, Variance::Covariant);
        assert_eq!(maybe.as_union().map(|c| c.len()), Some(2));
        let yes = declared.registry.get(&Symbol::core(YES)).unwrap();
        assert_eq!(yes.case_info.as_ref().map(|i| i.case_index), Some(0));
    }
}
