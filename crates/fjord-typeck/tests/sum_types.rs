//! Integration tests for unions, case values and switches.
//!
//! These tests exercise:
//! - Lifting a case value into its union on assignment
//! - Exhaustive and incomplete switches inside function bodies
//! - Agreement between the index a value is lifted with and the index a
//!   switch branch matches
//! - Multi-switches and `if` over `Bool`

use fjord_ast::build::*;
use fjord_ast::item::{Module, Program};
use fjord_typeck::expr::{Expr, ExprVal};
use fjord_typeck::function::CheckedBody;
use fjord_typeck::{check_program, CheckResult, TypeckConfig};

// ── Helpers ────────────────────────────────────────────────────────────

fn geometry() -> Module {
    module("Geometry").with_type(union(
        "Shape",
        vec![],
        vec![
            boxed("Circle", vec![], ty("Float")),
            boxed("Square", vec![], ty("Float")),
            unit_boxed("Dot"),
        ],
    ))
}

fn check(modules: Vec<Module>) -> CheckResult {
    check_program(&Program { modules }, &TypeckConfig::default())
}

fn messages(result: &CheckResult) -> Vec<String> {
    result.errors.iter().map(|e| e.error.to_string()).collect()
}

fn constant_value<'a>(result: &'a CheckResult, module: &str, name: &str) -> &'a Expr {
    let checked = result.modules[module]
        .constants
        .iter()
        .find(|c| c.sig.symbol.name == name)
        .expect("constant not found");
    match &checked.value {
        CheckedBody::Expr(expr) => expr,
        CheckedBody::Native(id) => panic!("native constant {}", id),
    }
}

fn function_body<'a>(result: &'a CheckResult, module: &str, name: &str) -> &'a Expr {
    let checked = result.modules[module]
        .functions
        .iter()
        .find(|f| f.sig.symbol.name == name)
        .expect("function not found");
    match &checked.body {
        CheckedBody::Expr(expr) => expr,
        CheckedBody::Native(id) => panic!("native function {}", id),
    }
}

fn area(branches: Vec<fjord_ast::expr::Branch>) -> fjord_ast::item::FunctionDecl {
    function(
        "area",
        vec![],
        ty("Shape"),
        ty("Float"),
        lambda(pat("s"), switch(var("s"), branches)),
    )
}

// ── Case Values ────────────────────────────────────────────────────────

#[test]
fn case_values_are_lifted_into_their_union() {
    let m = geometry()
        .with_constant(constant("c", ty("Shape"), call(var("Circle"), float(1.0))))
        .with_constant(constant("d", ty("Shape"), var("Dot")));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));

    let c = constant_value(&result, "Geometry", "c");
    assert!(matches!(c.value, ExprVal::Sum { index: 0, .. }), "{:?}", c.value);
    let d = constant_value(&result, "Geometry", "d");
    assert!(matches!(d.value, ExprVal::Sum { index: 2, .. }), "{:?}", d.value);
}

#[test]
fn exact_boxing_keeps_the_case_type() {
    let m = geometry().with_constant(constant("c", ty("Circle"), call(var("Circle!"), float(1.0))));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
    let c = constant_value(&result, "Geometry", "c");
    assert!(!matches!(c.value, ExprVal::Sum { .. }), "{:?}", c.value);
}

// ── Switches ───────────────────────────────────────────────────────────

#[test]
fn exhaustive_switch_checks() {
    let m = geometry().with_function(area(vec![
        branch(&["Circle"], Some(pat("r")), float(3.0)),
        branch(&["Square"], Some(pat("a")), float(1.0)),
        branch(&["Dot"], None, float(0.0)),
    ]));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn missing_case_is_reported() {
    let m = geometry().with_function(area(vec![
        branch(&["Circle"], Some(pat("r")), float(3.0)),
        branch(&["Dot"], None, float(0.0)),
    ]));
    let result = check(vec![m]);
    assert_eq!(messages(&result), vec!["incomplete match: missing Square"]);
    assert!(!result.modules.contains_key("Geometry"));
}

#[test]
fn lifted_index_matches_branch_index() {
    let m = geometry()
        .with_constant(constant("c", ty("Shape"), call(var("Square"), float(2.0))))
        .with_function(area(vec![
            branch(&["Square"], None, float(1.0)),
            default_branch(float(0.0)),
        ]));
    let result = check(vec![m]);
    assert!(result.is_ok(), "{:?}", messages(&result));

    let ExprVal::Sum { index: lifted, .. } = constant_value(&result, "Geometry", "c").value else {
        panic!("constant is not a lifted case value");
    };
    let ExprVal::Lambda { output, .. } = &function_body(&result, "Geometry", "area").value else {
        panic!("body is not a lambda");
    };
    let ExprVal::Switch { branches, .. } = &output.value else {
        panic!("lambda output is not a switch");
    };
    assert_eq!(branches[0].case, Some(lifted));
}

#[test]
fn lifted_values_do_not_fit_the_case_type() {
    let m = geometry().with_constant(constant("c", ty("Circle"), call(var("Circle"), float(1.0))));
    let result = check(vec![m]);
    let errors = messages(&result);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].starts_with("value of type Shape cannot be assigned"), "{:?}", errors);
}

#[test]
fn switch_through_an_imported_union() {
    let mut dot = branch(&["Dot"], None, var("Yes"));
    dot.types[0].name = ref_name_in("Geometry", "Dot");
    let app = module("App").import("Geometry").with_function(function(
        "is_dot",
        vec![],
        ty_in("Geometry", "Shape", vec![]),
        ty("Bool"),
        lambda(
            pat("s"),
            switch(var("s"), vec![dot, default_branch(var("No"))]),
        ),
    ));
    let result = check(vec![geometry(), app]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn multi_switch_over_two_shapes() {
    let pair = tuple_ty(vec![ty("Shape"), ty("Shape")]);
    let both_dots = function(
        "both_dots",
        vec![],
        pair,
        ty("Bool"),
        lambda(
            pat_tuple(&["a", "b"]),
            multi_switch(
                vec![var("a"), var("b")],
                vec![
                    multi_branch(&["Dot", "Dot"], None, var("Yes")),
                    multi_default(var("No")),
                ],
            ),
        ),
    );
    let result = check(vec![geometry().with_function(both_dots)]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}

#[test]
fn if_chains_become_nested_switches() {
    let sign = function(
        "sign",
        vec![],
        tuple_ty(vec![ty("Bool"), ty("Bool")]),
        ty("Int"),
        lambda(
            pat_tuple(&["neg", "zero"]),
            if_chain(var("neg"), int("-1"), vec![(var("zero"), int("0"))], int("1")),
        ),
    );
    let result = check(vec![module("Main").with_function(sign)]);
    assert!(result.is_ok(), "{:?}", messages(&result));
}
