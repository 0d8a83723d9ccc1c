//! Looking through boxed types to their inner representation.
//!
//! Unboxing is subject to visibility: the inner type of an opaque boxed
//! type is only visible inside the module that declares it.

use std::collections::BTreeMap;

use fjord_common::Symbol;

use crate::ty::{fill_type_args_with_defaults, Field, Type, TypeRegistry, TypeRepr};

#[derive(Debug, Clone, PartialEq)]
pub enum Unboxed {
    Inner(Type),
    /// The type is boxed but its inner type is hidden from this module.
    Opaque,
    /// Not a boxed type.
    Failed,
}

/// The core wrapper for values that change over time.
pub fn reactive_symbol() -> Symbol {
    Symbol::core("Reactive")
}

pub fn is_reactive(t: &Type) -> bool {
    matches!(t, Type::Named { name, args } if *name == reactive_symbol() && args.len() == 1)
}

/// Unbox one level of `t` as seen from module `module`.
pub fn unbox(t: &Type, module: &str, registry: &TypeRegistry) -> Unboxed {
    let Type::Named { name, args } = t else {
        return Unboxed::Failed;
    };
    let Some(g) = registry.get(name) else {
        return Unboxed::Failed;
    };
    match g.as_boxed() {
        Some(boxed) if boxed.opaque && name.module != module => Unboxed::Opaque,
        Some(boxed) => Unboxed::Inner(fill_type_args_with_defaults(&boxed.inner, args, &g.defaults)),
        None => Unboxed::Failed,
    }
}

/// Strip every weak boxed layer of `t`.
pub fn unbox_weak(t: &Type, registry: &TypeRegistry) -> Type {
    if let Type::Named { name, args } = t {
        if let Some(g) = registry.get(name) {
            if let Some(boxed) = g.as_boxed().filter(|b| b.weak) {
                let inner = fill_type_args_with_defaults(&boxed.inner, args, &g.defaults);
                return unbox_weak(&inner, registry);
            }
        }
    }
    t.clone()
}

/// Outcome of looking for a structural shape behind a type.
#[derive(Debug, Clone, PartialEq)]
pub enum Repr<T> {
    /// Found; `across_reactive` is set when a `Reactive` layer was crossed.
    Found { repr: T, across_reactive: bool },
    NotFound,
    Opaque,
}

impl<T> Repr<T> {
    fn found(repr: T) -> Self {
        Repr::Found {
            repr,
            across_reactive: false,
        }
    }

    fn across_reactive(self) -> Self {
        match self {
            Repr::Found { repr, .. } => Repr::Found {
                repr,
                across_reactive: true,
            },
            other => other,
        }
    }
}

/// Find the tuple behind `t`, following chains of boxed types.
pub fn unbox_tuple(t: &Type, module: &str, registry: &TypeRegistry, cross_reactive: bool) -> Repr<Vec<Type>> {
    unbox_shape(t, module, registry, cross_reactive, &|repr| match repr {
        TypeRepr::Tuple(elements) => Some(elements.clone()),
        _ => None,
    })
}

/// Find the bundle behind `t`, following chains of boxed types.
pub fn unbox_bundle(
    t: &Type,
    module: &str,
    registry: &TypeRegistry,
    cross_reactive: bool,
) -> Repr<BTreeMap<String, Field>> {
    unbox_shape(t, module, registry, cross_reactive, &|repr| match repr {
        TypeRepr::Bundle(fields) => Some(fields.clone()),
        _ => None,
    })
}

/// Find the function type behind `t` as `(input, output)`.
pub fn unbox_func(t: &Type, module: &str, registry: &TypeRegistry) -> Repr<(Type, Type)> {
    unbox_shape(t, module, registry, false, &|repr| match repr {
        TypeRepr::Func { input, output } => Some(((**input).clone(), (**output).clone())),
        _ => None,
    })
}

fn unbox_shape<T>(
    t: &Type,
    module: &str,
    registry: &TypeRegistry,
    cross_reactive: bool,
    pick: &dyn Fn(&TypeRepr) -> Option<T>,
) -> Repr<T> {
    match t {
        Type::Named { name, args } => {
            if cross_reactive && is_reactive(t) {
                return unbox_shape(&args[0], module, registry, false, pick).across_reactive();
            }
            let Some(g) = registry.get(name) else {
                return Repr::NotFound;
            };
            let Some(boxed) = g.as_boxed() else {
                return Repr::NotFound;
            };
            // A chain stops at the first layer hidden from `module`.
            if boxed.opaque && name.module != module {
                return Repr::Opaque;
            }
            let inner = fill_type_args_with_defaults(&boxed.inner, args, &g.defaults);
            match &inner {
                Type::Anonymous(repr) => pick(repr).map_or(Repr::NotFound, Repr::found),
                Type::Named { .. } => unbox_shape(&inner, module, registry, cross_reactive, pick),
                _ => Repr::NotFound,
            }
        }
        Type::Anonymous(repr) => pick(repr).map_or(Repr::NotFound, Repr::found),
        _ => Repr::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::ty::{Boxed, GenericType, TypeBounds, TypeDef, TypeParam, TypeTags};
    use crate::variance::Variance;
    use rowan::TextRange;
    use rustc_hash::FxHashMap;

    fn boxed_decl(inner: Type, arity: usize, opaque: bool, weak: bool) -> GenericType {
        GenericType {
            doc: String::new(),
            tags: TypeTags::default(),
            params: (0..arity)
                .map(|i| TypeParam {
                    name: format!("T{}", i),
                    variance: Variance::Invariant,
                })
                .collect(),
            bounds: TypeBounds::default(),
            defaults: FxHashMap::default(),
            def: TypeDef::Boxed(Boxed {
                inner,
                implicit: false,
                weak,
                protected: false,
                opaque,
            }),
            case_info: None,
            span: TextRange::default(),
        }
    }

    fn registry() -> TypeRegistry {
        let mut reg = builtins::core_registry();
        let point = Type::tuple(vec![Type::param(0), Type::param(0)]);
        reg.insert(Symbol::new("Geo", "Point"), boxed_decl(point, 1, false, false));
        reg.insert(
            Symbol::new("Geo", "Secret"),
            boxed_decl(Type::tuple(vec![Type::unit()]), 0, true, false),
        );
        reg.insert(
            Symbol::new("Geo", "Pos"),
            boxed_decl(Type::named(Symbol::new("Geo", "Point"), vec![Type::Any]), 0, false, true),
        );
        reg.insert(
            Symbol::new("Geo", "Sealed"),
            boxed_decl(Type::named(Symbol::new("Geo", "Point"), vec![Type::unit()]), 0, true, false),
        );
        reg
    }

    #[test]
    fn unbox_substitutes_arguments() {
        let reg = registry();
        let t = Type::named(Symbol::new("Geo", "Point"), vec![Type::unit()]);
        assert_eq!(
            unbox(&t, "Main", &reg),
            Unboxed::Inner(Type::tuple(vec![Type::unit(), Type::unit()]))
        );
        assert_eq!(unbox(&Type::unit(), "Main", &reg), Unboxed::Failed);
    }

    #[test]
    fn opaque_types_hide_their_inner_type() {
        let reg = registry();
        let t = Type::named(Symbol::new("Geo", "Secret"), vec![]);
        assert_eq!(unbox(&t, "Main", &reg), Unboxed::Opaque);
        assert!(matches!(unbox(&t, "Geo", &reg), Unboxed::Inner(_)));
        assert_eq!(unbox_tuple(&t, "Main", &reg, false), Repr::Opaque);
    }

    #[test]
    fn opaque_layer_hides_the_rest_of_the_chain() {
        let reg = registry();
        let t = Type::named(Symbol::new("Geo", "Sealed"), vec![]);
        assert_eq!(unbox_tuple(&t, "Main", &reg, false), Repr::Opaque);
        assert_eq!(unbox_bundle(&t, "Main", &reg, false), Repr::Opaque);
        assert_eq!(
            unbox_tuple(&t, "Geo", &reg, false),
            Repr::Found {
                repr: vec![Type::unit(), Type::unit()],
                across_reactive: false,
            }
        );
    }

    #[test]
    fn weak_layers_are_stripped() {
        let reg = registry();
        let t = Type::named(Symbol::new("Geo", "Pos"), vec![]);
        assert_eq!(
            unbox_weak(&t, &reg),
            Type::named(Symbol::new("Geo", "Point"), vec![Type::Any])
        );
    }

    #[test]
    fn tuple_behind_chain_and_reactive() {
        let reg = registry();
        let pos = Type::named(Symbol::new("Geo", "Pos"), vec![]);
        let reactive = Type::named(reactive_symbol(), vec![pos.clone()]);
        assert_eq!(
            unbox_tuple(&reactive, "Main", &reg, true),
            Repr::Found {
                repr: vec![Type::Any, Type::Any],
                across_reactive: true,
            }
        );
        assert_eq!(unbox_tuple(&reactive, "Main", &reg, false), Repr::NotFound);
        assert_eq!(unbox_bundle(&pos, "Main", &reg, false), Repr::NotFound);
    }
}
