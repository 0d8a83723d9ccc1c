//! Integration tests for overload resolution and type argument inference.

use fjord_ast::build::*;
use fjord_ast::item::{Module, Program};
use fjord_common::Symbol;
use fjord_typeck::error::{CheckError, ExprErrorKind};
use fjord_typeck::expr::ExprVal;
use fjord_typeck::function::CheckedBody;
use fjord_typeck::ty::Type;
use fjord_typeck::{check_program, CheckResult, TypeckConfig};

// ── Helpers ────────────────────────────────────────────────────────────

fn check(modules: Vec<Module>) -> CheckResult {
    check_program(&Program { modules }, &TypeckConfig::default())
}

fn messages(result: &CheckResult) -> Vec<String> {
    result.errors.iter().map(|e| e.error.to_string()).collect()
}

fn expr_kinds(result: &CheckResult) -> Vec<&ExprErrorKind> {
    result
        .errors
        .iter()
        .filter_map(|e| match &e.error {
            CheckError::Expr(e) => Some(&e.kind),
            _ => None,
        })
        .collect()
}

fn int_ty() -> Type {
    Type::named(Symbol::core("Int"), vec![])
}

/// A library of overloaded natives.
fn library() -> Module {
    module("Text")
        .with_function(native_function("show", vec![], ty("Int"), ty("String")))
        .with_function(native_function("show", vec![], ty("Float"), ty("String")))
        .with_function(native_function(
            "wrap",
            vec![],
            ty("Int"),
            ty_args("List", vec![ty("Int")]),
        ))
        .with_function(native_function(
            "wrap",
            vec![],
            ty("Int"),
            ty_args("List", vec![ty("any")]),
        ))
        .with_function(native_function("pick", vec![], ty("Int"), ty("Int")))
        .with_function(native_function("pick", vec![], ty("Int"), ty("Float")))
        .with_function(native_function("id", vec![param("T")], ty("T"), ty("T")))
        .with_function(native_function(
            "first",
            vec![param("A"), param("B")],
            tuple_ty(vec![ty("A"), ty("B")]),
            ty("A"),
        ))
}

fn one() -> fjord_ast::expr::Expr {
    cast(int("1"), ty("Int"))
}

// ── Overloads ──────────────────────────────────────────────────────────

#[test]
fn argument_type_selects_overload() {
    let m = library().with_constant(constant("s", ty("String"), call(var("show"), float(1.5))));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
    let checked = &result.modules["Text"].constants[0];
    let CheckedBody::Expr(expr) = &checked.value else {
        panic!("native constant");
    };
    let ExprVal::Call { callee, .. } = &expr.value else {
        panic!("not a call: {:?}", expr.value);
    };
    assert!(matches!(callee.value, ExprVal::RefFunction { index: 1, .. }));
}

#[test]
fn narrowest_result_wins_without_expected_type() {
    // The binding has no annotation, so the overload is picked by its
    // result alone: `List[Int]` is assignable to `List[any]`.
    let body = block(vec![binding(pat("l"), call(var("wrap"), one()))], var("l"));
    let m = library().with_constant(constant("l", ty_args("List", vec![ty("Int")]), body));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn narrowest_result_wins_against_a_wider_expected_type() {
    let wide = ty_args("List", vec![ty("any")]);
    let m = library().with_constant(constant("l", wide, call(var("wrap"), one())));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
    let CheckedBody::Expr(expr) = &result.modules["Text"].constants[0].value else {
        panic!("native constant");
    };
    let ExprVal::Call { callee, .. } = &expr.value else {
        panic!("not a call: {:?}", expr.value);
    };
    assert!(matches!(callee.value, ExprVal::RefFunction { index: 0, .. }));
}

#[test]
fn unrelated_results_are_ambiguous() {
    let body = block(vec![binding(pat("p"), call(var("pick"), one()))], var("p"));
    let m = library().with_constant(constant("p", ty("Int"), body));
    let result = check(vec![m]);
    let kinds = expr_kinds(&result);
    assert!(matches!(kinds[..], [ExprErrorKind::AmbiguousCall { .. }]), "{:?}", messages(&result));
}

#[test]
fn expected_type_breaks_ties() {
    let m = library().with_constant(constant("p", ty("Float"), call(var("pick"), one())));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn resolution_is_deterministic() {
    let build = || {
        library()
            .with_constant(constant("a", ty("String"), call(var("show"), one())))
            .with_constant(constant("b", ty("Float"), call(var("pick"), one())))
    };
    let first = check(vec![build()]);
    let second = check(vec![build()]);
    assert!(first.is_ok(), "{:?}", messages(&first));
    assert_eq!(first.modules, second.modules);
}

#[test]
fn no_overload_accepts_argument() {
    let m = library().with_constant(constant("s", ty("String"), call(var("show"), text("x"))));
    let result = check(vec![m]);
    insta::assert_snapshot!(messages(&result).join("\n"), @r###"
    none of the functions are callable
      show[]: (λ Int String): value of type String cannot be assigned to type Int
      show[]: (λ Float String): value of type String cannot be assigned to type Float
    "###);
}

// ── Type Arguments ─────────────────────────────────────────────────────

#[test]
fn type_arguments_follow_the_argument() {
    let m = library().with_constant(constant("x", ty("String"), call(var("id"), text("a"))));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn inferred_result_is_checked_against_expected_type() {
    let m = library().with_constant(constant("x", ty("Int"), call(var("id"), text("a"))));
    let result = check(vec![m]);
    let kinds = expr_kinds(&result);
    assert!(
        matches!(
            kinds[..],
            [ExprErrorKind::NoneOfFunctionsCallable { .. }] | [ExprErrorKind::NotAssignable { .. }]
        ),
        "{:?}",
        messages(&result)
    );
}

#[test]
fn explicit_type_arguments() {
    let m = library().with_constant(constant(
        "x",
        ty("Int"),
        call(var_args("first", vec![ty("Int"), ty("String")]), tuple(vec![one(), text("b")])),
    ));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
    let CheckedBody::Expr(expr) = &result.modules["Text"].constants[0].value else {
        panic!("native constant");
    };
    let ExprVal::Call { callee, .. } = &expr.value else {
        panic!("not a call: {:?}", expr.value);
    };
    let ExprVal::RefFunction { type_args, .. } = &callee.value else {
        panic!("not a function reference: {:?}", callee.value);
    };
    assert_eq!(type_args[0], int_ty());
}

#[test]
fn generic_lambdas_in_user_functions() {
    let twice = function(
        "twice",
        vec![param("T")],
        func_ty(ty("T"), ty("T")),
        func_ty(ty("T"), ty("T")),
        lambda(pat("f"), lambda_expr(pat("x"), call(var("f"), call(var("f"), var("x"))))),
    );
    let m = library().with_function(twice);
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}
