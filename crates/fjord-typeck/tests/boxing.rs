//! Integration tests for boxed types across module boundaries.

use fjord_ast::build::*;
use fjord_ast::item::{BoxedDecl, Module, Program};
use fjord_typeck::error::{CheckError, ExprErrorKind};
use fjord_typeck::{check_program, CheckResult, TypeckConfig};

fn check(modules: Vec<Module>) -> CheckResult {
    check_program(&Program { modules }, &TypeckConfig::default())
}

fn messages(result: &CheckResult) -> Vec<String> {
    result.errors.iter().map(|e| format!("{}: {}", e.module, e.error)).collect()
}

fn units() -> Module {
    module("Units")
        .with_type(boxed("Meters", vec![], ty("Float")))
        .with_type(boxed_with(
            "Token",
            vec![],
            BoxedDecl {
                inner: Some(ty("String")),
                protected: true,
                ..BoxedDecl::default()
            },
        ))
        .with_type(boxed_with(
            "Secret",
            vec![],
            BoxedDecl {
                inner: Some(ty("String")),
                opaque: true,
                ..BoxedDecl::default()
            },
        ))
        .with_type(boxed("Pair", vec![param("T")], tuple_ty(vec![ty("T"), ty("T")])))
}

#[test]
fn values_box_and_unbox_implicitly() {
    let m = units()
        .with_constant(constant("m", ty("Meters"), float(2.0)))
        .with_constant(constant("raw", ty("Float"), var("m")))
        .with_constant(constant("t", ty("Token"), call(var("Token"), text("abc"))));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn boxing_infers_type_arguments() {
    let m = units().with_constant(constant(
        "p",
        ty_args("Pair", vec![ty("String")]),
        call(var("Pair"), tuple(vec![text("a"), text("b")])),
    ));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn protected_types_only_box_in_their_module() {
    let app = module("App").import("Units").with_constant(constant(
        "t",
        ty_in("Units", "Token", vec![]),
        call(var_in("Units", "Token"), text("forged")),
    ));
    let result = check(vec![units(), app]);
    insta::assert_snapshot!(
        messages(&result).join("\n"),
        @"App: cannot box a value into protected type Units::Token"
    );
}

#[test]
fn protected_types_unbox_anywhere() {
    let units = units().with_constant(constant("t", ty("Token"), call(var("Token"), text("abc"))));
    let app = module("App").import("Units").with_constant(constant(
        "s",
        ty("String"),
        var_in("Units", "t"),
    ));
    let result = check(vec![units, app]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn opaque_types_hide_their_inner_type() {
    let units = units().with_constant(constant("k", ty("Secret"), call(var("Secret"), text("key"))));
    let app = module("App").import("Units").with_constant(constant(
        "s",
        ty("String"),
        var_in("Units", "k"),
    ));
    let result = check(vec![units, app]);
    assert!(result.modules.contains_key("Units"));
    assert!(!result.modules.contains_key("App"));
    let kinds: Vec<&ExprErrorKind> = result
        .errors
        .iter()
        .filter_map(|e| match &e.error {
            CheckError::Expr(e) => Some(&e.kind),
            _ => None,
        })
        .collect();
    assert!(matches!(kinds[..], [ExprErrorKind::NotAssignable { .. }]), "{:?}", messages(&result));
}

#[test]
fn opaque_layer_hides_a_boxed_chain() {
    let units = units()
        .with_type(boxed("Point", vec![], tuple_ty(vec![ty("Int"), ty("Int")])))
        .with_type(boxed_with(
            "Sealed",
            vec![],
            BoxedDecl {
                inner: Some(ty("Point")),
                opaque: true,
                ..BoxedDecl::default()
            },
        ))
        .with_constant(constant("p", ty("Point"), tuple(vec![int("1"), int("2")])))
        .with_constant(constant("s", ty("Sealed"), call(var("Sealed"), var("p"))));
    let app = module("App").import("Units").with_constant(constant(
        "x",
        ty("Int"),
        block(vec![binding(pat_tuple(&["a", "b"]), var_in("Units", "s"))], var("a")),
    ));
    let result = check(vec![units, app]);
    assert!(result.modules.contains_key("Units"), "{:?}", messages(&result));
    let opaque_match = result.errors.iter().any(|e| {
        matches!(&e.error, CheckError::Expr(e) if e.kind == ExprErrorKind::MatchingOpaqueTupleType)
    });
    assert!(opaque_match, "{:?}", messages(&result));
}
