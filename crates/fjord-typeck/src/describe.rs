//! Human-readable rendering of types for error messages.

use fjord_common::Symbol;

use crate::ty::{ordered_fields, Type, TypeCtx, TypeParam, TypeRepr};

/// Render `t` as seen from `module`, naming parameters after `params`.
///
/// Names declared in `module` or in the core module are shown bare, all
/// others as `Module::Name`.
pub fn describe_type(t: &Type, module: &str, params: &[TypeParam]) -> String {
    let mut out = String::new();
    write_type(&mut out, t, module, params);
    out
}

/// Render `t` within a checking context.
pub fn describe_type_in_ctx(t: &Type, ctx: &TypeCtx<'_>) -> String {
    describe_type(t, ctx.module, ctx.params)
}

pub fn describe_symbol(name: &Symbol, module: &str) -> String {
    if name.module == module {
        name.name.clone()
    } else {
        name.to_string()
    }
}

fn write_type(out: &mut String, t: &Type, module: &str, params: &[TypeParam]) {
    match t {
        Type::Never => out.push_str("never"),
        Type::Any => out.push_str("any"),
        Type::Parameter {
            index,
            being_inferred,
        } => {
            match params.get(*index) {
                Some(p) => out.push_str(&p.name),
                None => out.push_str(&format!("#{}", index)),
            }
            if *being_inferred {
                out.push('?');
            }
        }
        Type::Named { name, args } => {
            out.push_str(&describe_symbol(name, module));
            if !args.is_empty() {
                out.push('[');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, arg, module, params);
                }
                out.push(']');
            }
        }
        Type::Anonymous(repr) => match repr {
            TypeRepr::Unit => out.push_str("()"),
            TypeRepr::Tuple(elements) => {
                out.push('(');
                for (i, el) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, el, module, params);
                }
                out.push(')');
            }
            TypeRepr::Bundle(fields) => {
                out.push_str("{ ");
                for (i, (name, field)) in ordered_fields(fields).into_iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(name);
                    out.push_str(": ");
                    write_type(out, &field.ty, module, params);
                }
                out.push_str(" }");
            }
            TypeRepr::Func { input, output } => {
                out.push_str("(λ ");
                write_type(out, input, module, params);
                out.push(' ');
                write_type(out, output, module, params);
                out.push(')');
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variance::Variance;

    fn params() -> Vec<TypeParam> {
        vec![TypeParam {
            name: "T".into(),
            variance: Variance::Covariant,
        }]
    }

    #[test]
    fn core_and_local_names_are_bare() {
        let t = Type::named(
            Symbol::core("Maybe"),
            vec![Type::named(Symbol::new("Geometry", "Shape"), vec![])],
        );
        assert_eq!(describe_type(&t, "Geometry", &[]), "Maybe[Shape]");
        assert_eq!(describe_type(&t, "Main", &[]), "Maybe[Geometry::Shape]");
    }

    #[test]
    fn structural_forms() {
        let t = Type::func(
            Type::tuple(vec![Type::param(0), Type::Never]),
            Type::bundle(vec![("b", Type::Any), ("a", Type::unit())]),
        );
        insta::assert_snapshot!(
            describe_type(&t, "Main", &params()),
            @"(λ (T, never) { b: any, a: () })"
        );
    }

    #[test]
    fn inferred_parameters_are_marked() {
        assert_eq!(describe_type(&Type::inferred_param(0), "Main", &params()), "T?");
        assert_eq!(describe_type(&Type::param(3), "Main", &params()), "#3");
    }
}
