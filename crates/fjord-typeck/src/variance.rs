//! Variance of type parameters.
//!
//! A declared parameter is invariant, covariant (`+T`) or contravariant
//! (`-T`). Bivariance only arises while computing how a parameter is used
//! inside a type (e.g. it does not occur at all) and cannot be declared.

use serde::Serialize;

use crate::ty::{Type, TypeParam, TypeRegistry, TypeRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
    Bivariant,
}

impl Variance {
    pub fn inverse(self) -> Variance {
        match self {
            Variance::Covariant => Variance::Contravariant,
            Variance::Contravariant => Variance::Covariant,
            other => other,
        }
    }
}

/// Variance of a parameter occurring with variance `arg` inside a position
/// of variance `param`.
pub fn apply_variance(param: Variance, arg: Variance) -> Variance {
    match arg {
        Variance::Covariant | Variance::Contravariant => {
            if param == Variance::Bivariant {
                arg
            } else if arg == param {
                Variance::Covariant
            } else if arg == param.inverse() {
                Variance::Contravariant
            } else {
                Variance::Invariant
            }
        }
        // A parameter that does not occur stays unconstrained in any position.
        Variance::Bivariant => Variance::Bivariant,
        Variance::Invariant => Variance::Invariant,
    }
}

/// Variance of a parameter used at two different places.
pub fn combine_variance(a: Variance, b: Variance) -> Variance {
    use Variance::*;
    match (a, b) {
        (Invariant, _) | (_, Invariant) => Invariant,
        (Bivariant, other) | (other, Bivariant) => other,
        (Covariant, Covariant) => Covariant,
        (Contravariant, Contravariant) => Contravariant,
        _ => Invariant,
    }
}

/// Fold the variance vectors of the components of a composite type, each
/// component sitting at a position with variance `positions[j]`.
pub fn deduce_variance(arity: usize, positions: &[Variance], components: &[Vec<Variance>]) -> Vec<Variance> {
    (0..arity)
        .map(|i| {
            positions
                .iter()
                .zip(components)
                .fold(Variance::Bivariant, |v, (pos, comp)| {
                    combine_variance(v, apply_variance(*pos, comp[i]))
                })
        })
        .collect()
}

pub fn params_variance(params: &[TypeParam]) -> Vec<Variance> {
    params.iter().map(|p| p.variance).collect()
}

/// Check the usage variance of each parameter against its declaration,
/// returning the names of the parameters that are used incorrectly.
pub fn match_variance(declared: &[TypeParam], deduced: &[Variance]) -> Result<(), Vec<String>> {
    let bad: Vec<String> = declared
        .iter()
        .zip(deduced)
        .filter(|(param, v)| match param.variance {
            Variance::Covariant => !matches!(v, Variance::Covariant | Variance::Bivariant),
            Variance::Contravariant => !matches!(v, Variance::Contravariant | Variance::Bivariant),
            Variance::Bivariant => **v != Variance::Bivariant,
            Variance::Invariant => false,
        })
        .map(|(param, _)| param.name.clone())
        .collect();
    if bad.is_empty() {
        Ok(())
    } else {
        Err(bad)
    }
}

/// How each of the `arity` parameters in scope is used by `t`.
pub fn get_variance(t: &Type, arity: usize, registry: &TypeRegistry) -> Vec<Variance> {
    match t {
        Type::Never | Type::Any => vec![Variance::Bivariant; arity],
        Type::Parameter { index, .. } => {
            let mut v = vec![Variance::Bivariant; arity];
            if let Some(slot) = v.get_mut(*index) {
                *slot = Variance::Covariant;
            }
            v
        }
        Type::Named { name, args } => {
            let Some(g) = registry.get(name) else {
                return vec![Variance::Invariant; arity];
            };
            let positions = params_variance(&g.params);
            let components: Vec<Vec<Variance>> = args
                .iter()
                .map(|arg| get_variance(arg, arity, registry))
                .collect();
            deduce_variance(arity, &positions, &components)
        }
        Type::Anonymous(repr) => match repr {
            TypeRepr::Unit => vec![Variance::Bivariant; arity],
            TypeRepr::Tuple(elements) => {
                let components: Vec<Vec<Variance>> = elements
                    .iter()
                    .map(|el| get_variance(el, arity, registry))
                    .collect();
                deduce_variance(arity, &vec![Variance::Covariant; elements.len()], &components)
            }
            TypeRepr::Bundle(fields) => {
                let components: Vec<Vec<Variance>> = fields
                    .values()
                    .map(|f| get_variance(&f.ty, arity, registry))
                    .collect();
                deduce_variance(arity, &vec![Variance::Covariant; fields.len()], &components)
            }
            TypeRepr::Func { input, output } => {
                let components = vec![
                    get_variance(input, arity, registry),
                    get_variance(output, arity, registry),
                ];
                deduce_variance(
                    arity,
                    &[Variance::Contravariant, Variance::Covariant],
                    &components,
                )
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use fjord_common::Symbol;

    fn params(vs: &[(&str, Variance)]) -> Vec<TypeParam> {
        vs.iter()
            .map(|(n, v)| TypeParam {
                name: n.to_string(),
                variance: *v,
            })
            .collect()
    }

    #[test]
    fn function_input_is_contravariant() {
        let reg = builtins::core_registry();
        let f = Type::func(Type::param(0), Type::param(1));
        assert_eq!(
            get_variance(&f, 2, &reg),
            vec![Variance::Contravariant, Variance::Covariant]
        );
    }

    #[test]
    fn double_negation_is_covariant() {
        let reg = builtins::core_registry();
        // (λ (λ T ()) ())
        let f = Type::func(Type::func(Type::param(0), Type::unit()), Type::unit());
        assert_eq!(get_variance(&f, 1, &reg), vec![Variance::Covariant]);
    }

    #[test]
    fn mixed_use_is_invariant() {
        let reg = builtins::core_registry();
        let f = Type::func(Type::param(0), Type::param(0));
        assert_eq!(get_variance(&f, 1, &reg), vec![Variance::Invariant]);
        let unused = Type::tuple(vec![Type::unit(), Type::Never]);
        assert_eq!(get_variance(&unused, 1, &reg), vec![Variance::Bivariant]);
    }

    #[test]
    fn named_arguments_follow_declared_variance() {
        let reg = builtins::core_registry();
        // List[+T] keeps covariance, Array[T] forces invariance.
        let list = Type::named(Symbol::core("List"), vec![Type::param(0)]);
        assert_eq!(get_variance(&list, 1, &reg), vec![Variance::Covariant]);
        let array = Type::named(Symbol::core("Array"), vec![Type::param(0)]);
        assert_eq!(get_variance(&array, 1, &reg), vec![Variance::Invariant]);
    }

    #[test]
    fn match_variance_reports_bad_params() {
        let declared = params(&[
            ("A", Variance::Covariant),
            ("B", Variance::Contravariant),
            ("C", Variance::Invariant),
        ]);
        let deduced = vec![
            Variance::Contravariant,
            Variance::Bivariant,
            Variance::Contravariant,
        ];
        assert_eq!(match_variance(&declared, &deduced), Err(vec!["A".to_string()]));
    }

    #[test]
    fn combine_is_symmetric() {
        use Variance::*;
        for a in [Invariant, Covariant, Contravariant, Bivariant] {
            for b in [Invariant, Covariant, Contravariant, Bivariant] {
                assert_eq!(combine_variance(a, b), combine_variance(b, a));
            }
        }
    }
}
