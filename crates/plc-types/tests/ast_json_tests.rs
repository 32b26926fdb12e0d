//! JSON interchange tests for the syntax tree.
//!
//! The external parser hands trees over as JSON; these tests pin the
//! shape hosts rely on.

use plc_types::ast::*;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn from_json(json: &str) -> Source {
    serde_json::from_str(json).expect("valid source json")
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn let_statement_from_json() {
    let source = from_json(
        r#"{ "statements": [
            { "Let": { "name": "name", "type_name": "String", "value": { "Literal": { "String": "value" } } } }
        ] }"#,
    );
    assert_eq!(
        source,
        Source::new(vec![Let::new("name")
            .typed("String")
            .value(Expr::string("value"))
            .into()])
    );
}

#[test]
fn missing_optionals_default_to_none() {
    let source = from_json(r#"{ "statements": [ { "Let": { "name": "x" } } ] }"#);
    assert_eq!(source, Source::new(vec![Let::new("x").into()]));
}

#[test]
fn binary_operator_uses_source_spelling() {
    let source = from_json(
        r#"{ "statements": [ { "Expression": { "Binary": {
            "op": "AND",
            "left": { "Literal": { "Boolean": true } },
            "right": { "Variable": { "name": "flag" } }
        } } } ] }"#,
    );
    assert_eq!(
        source.statements,
        vec![Stmt::expression(Expr::binary(
            BinaryOp::And,
            Expr::boolean(true),
            Expr::variable("flag"),
        ))]
    );
}

#[test]
fn decimal_literal_from_string() {
    let source = from_json(
        r#"{ "statements": [ { "Expression": { "Literal": { "Decimal": "2.30" } } } ] }"#,
    );
    let expected: bigdecimal::BigDecimal = "2.30".parse().unwrap();
    assert_eq!(source.statements, vec![Stmt::expression(Expr::decimal(expected))]);
}

#[test]
fn unknown_operator_is_rejected() {
    let result: Result<Source, _> = serde_json::from_str(
        r#"{ "statements": [ { "Expression": { "Binary": {
            "op": "%",
            "left": { "Literal": "Nil" },
            "right": { "Literal": "Nil" }
        } } } ] }"#,
    );
    assert!(result.is_err());
}

#[test]
fn tree_survives_serialization() {
    let source = Source::new(vec![
        Def::new("f")
            .typed_param("x", "Integer")
            .returns("Integer")
            .body(vec![Stmt::ret(Some(Expr::variable("x")))])
            .into(),
        Stmt::expression(Expr::object(
            ObjectExpr::named("Point")
                .field(Let::new("x").value(Expr::integer(1)))
                .method(Def::new("get").body(vec![Stmt::ret(Some(Expr::property(
                    Expr::variable("this"),
                    "x",
                )))])),
        )),
    ]);
    let json = serde_json::to_string(&source).unwrap();
    assert_eq!(from_json(&json), source);
}
