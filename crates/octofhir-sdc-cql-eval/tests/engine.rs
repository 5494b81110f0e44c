//! Evaluation tests over translator-shaped ELM

use octofhir_sdc_cql_eval::{CqlValue, ElmEngine, ElmLibrary, EvalError};
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;

const MAIN: &str = "__lforms__main__";

fn lit(value_type: &str, value: &str) -> Value {
    json!({ "type": "Literal", "valueType": format!("{{urn:hl7-org:elm-types:r1}}{value_type}"), "value": value })
}

fn int(v: i32) -> Value {
    lit("Integer", &v.to_string())
}

fn dec(v: &str) -> Value {
    lit("Decimal", v)
}

fn string(v: &str) -> Value {
    lit("String", v)
}

fn boolean(v: bool) -> Value {
    lit("Boolean", &v.to_string())
}

fn null() -> Value {
    json!({ "type": "Null" })
}

fn binary(op: &str, left: Value, right: Value) -> Value {
    json!({ "type": op, "operand": [left, right] })
}

fn unary(op: &str, operand: Value) -> Value {
    json!({ "type": op, "operand": operand })
}

/// Build a library with a single unfiltered main definition
fn main_library(expression: Value) -> Arc<ElmLibrary> {
    library(json!([{ "name": MAIN, "context": "Unfiltered", "accessLevel": "Public", "expression": expression }]))
}

fn library(defs: Value) -> Arc<ElmLibrary> {
    let elm = json!({
        "library": {
            "identifier": {},
            "schemaIdentifier": { "id": "urn:hl7-org:elm", "version": "r1" },
            "usings": { "def": [{ "localIdentifier": "System", "uri": "urn:hl7-org:elm-types:r1" }] },
            "statements": { "def": defs }
        }
    });
    Arc::new(ElmLibrary::from_json(&elm).unwrap())
}

fn eval_main(expression: Value) -> Result<CqlValue, EvalError> {
    let results = ElmEngine::new().evaluate_library(&main_library(expression), &[])?;
    Ok(results.unfiltered.get(MAIN).cloned().unwrap_or_default())
}

fn decimal(v: &str) -> CqlValue {
    CqlValue::Decimal(Decimal::from_str(v).unwrap())
}

#[test]
fn wrapped_multiplication_yields_six() {
    let value = eval_main(binary("Multiply", int(2), int(3))).unwrap();
    assert_eq!(value, CqlValue::Integer(6));
    assert_eq!(value.to_json(), json!(6));
}

#[rstest]
#[case::add(binary("Add", int(1), int(2)), CqlValue::Integer(3))]
#[case::subtract(binary("Subtract", int(1), int(2)), CqlValue::Integer(-1))]
#[case::mixed_add(binary("Add", int(1), dec("0.5")), decimal("1.5"))]
#[case::divide(binary("Divide", int(7), int(2)), decimal("3.5"))]
#[case::divide_by_zero(binary("Divide", int(7), int(0)), CqlValue::Null)]
#[case::truncated_divide(binary("TruncatedDivide", int(7), int(2)), CqlValue::Integer(3))]
#[case::modulo(binary("Modulo", int(7), int(2)), CqlValue::Integer(1))]
#[case::modulo_zero(binary("Modulo", int(7), int(0)), CqlValue::Null)]
#[case::power(binary("Power", int(2), int(10)), CqlValue::Integer(1024))]
#[case::power_of_one_huge_exponent(binary("Power", dec("1.0"), dec("100000000000")), decimal("1"))]
#[case::power_underflows_to_zero(binary("Power", dec("0.5"), dec("1000000000000")), decimal("0"))]
#[case::power_of_minus_one_negative(binary("Power", int(-1), int(-2000000001)), decimal("-1"))]
#[case::power_negative_huge_exponent(binary("Power", int(2), int(-2000000000)), decimal("0"))]
#[case::power_of_zero(binary("Power", int(0), int(2000000000)), CqlValue::Integer(0))]
#[case::negate(unary("Negate", int(4)), CqlValue::Integer(-4))]
#[case::abs(unary("Abs", dec("-2.5")), decimal("2.5"))]
#[case::null_propagation(binary("Add", int(1), null()), CqlValue::Null)]
fn arithmetic(#[case] expression: Value, #[case] expected: CqlValue) {
    assert_eq!(eval_main(expression).unwrap(), expected);
}

#[rstest]
#[case::equal(binary("Equal", int(2), dec("2.0")), CqlValue::Boolean(true))]
#[case::not_equal(binary("NotEqual", string("a"), string("b")), CqlValue::Boolean(true))]
#[case::equal_null(binary("Equal", int(2), null()), CqlValue::Null)]
#[case::less(binary("Less", int(1), int(2)), CqlValue::Boolean(true))]
#[case::greater_or_equal(binary("GreaterOrEqual", dec("1.5"), int(2)), CqlValue::Boolean(false))]
#[case::and_false_null(binary("And", boolean(false), null()), CqlValue::Boolean(false))]
#[case::and_true_null(binary("And", boolean(true), null()), CqlValue::Null)]
#[case::or_true_null(binary("Or", null(), boolean(true)), CqlValue::Boolean(true))]
#[case::xor(binary("Xor", boolean(true), boolean(false)), CqlValue::Boolean(true))]
#[case::implies_false(binary("Implies", boolean(false), null()), CqlValue::Boolean(true))]
#[case::not(unary("Not", boolean(true)), CqlValue::Boolean(false))]
#[case::not_null(unary("Not", null()), CqlValue::Null)]
fn comparison_and_logic(#[case] expression: Value, #[case] expected: CqlValue) {
    assert_eq!(eval_main(expression).unwrap(), expected);
}

#[test]
fn conditional_and_nullological() {
    let if_expr = json!({
        "type": "If",
        "condition": binary("Greater", int(5), int(3)),
        "then": string("high"),
        "else": string("low")
    });
    assert_eq!(eval_main(if_expr).unwrap(), CqlValue::String("high".into()));

    let coalesce = json!({ "type": "Coalesce", "operand": [(null()), int(9), int(1)] });
    assert_eq!(eval_main(coalesce).unwrap(), CqlValue::Integer(9));

    assert_eq!(eval_main(unary("IsNull", null())).unwrap(), CqlValue::Boolean(true));
}

#[test]
fn strings_lists_and_conversions() {
    let concat = json!({ "type": "Concatenate", "operand": [string("a"), string("b")] });
    assert_eq!(eval_main(concat).unwrap(), CqlValue::String("ab".into()));

    let list = json!({ "type": "List", "element": [int(1), (null()), int(3)] });
    assert_eq!(eval_main(json!({ "type": "Count", "source": list.clone() })).unwrap(), CqlValue::Integer(2));
    assert_eq!(eval_main(unary("Exists", list.clone())).unwrap(), CqlValue::Boolean(true));
    assert_eq!(eval_main(list).unwrap().to_json(), json!([1, null, 3]));

    assert_eq!(eval_main(unary("ToDecimal", string("4.25"))).unwrap(), decimal("4.25"));
    assert_eq!(eval_main(unary("ToDecimal", string("abc"))).unwrap(), CqlValue::Null);
    assert_eq!(eval_main(unary("ToString", int(12))).unwrap(), CqlValue::String("12".into()));

    let cast = json!({ "type": "As", "operand": int(3), "asType": "{urn:hl7-org:elm-types:r1}String" });
    assert_eq!(eval_main(cast).unwrap(), CqlValue::Null);
}

#[test]
fn definitions_reference_each_other_in_declaration_order() {
    let lib = library(json!([
        { "name": "Base", "context": "Unfiltered", "expression": int(10) },
        {
            "name": "Score",
            "context": "Unfiltered",
            "expression": binary("Add", json!({ "type": "ExpressionRef", "name": "Base" }), int(5))
        },
        { "name": "Label", "expression": string("done") }
    ]));

    let results = ElmEngine::new().evaluate_library(&lib, &[]).unwrap();
    assert_eq!(
        results.unfiltered.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["Base", "Score", "Label"]
    );
    assert_eq!(results.unfiltered["Score"], CqlValue::Integer(15));
}

#[test]
fn patient_definitions_without_patients_produce_no_patient_results() {
    let lib = library(json!([
        { "name": "Patient", "context": "Patient", "expression": (null()) },
        { "name": "Shared", "context": "Unfiltered", "expression": int(1) }
    ]));

    let results = ElmEngine::new().evaluate_library(&lib, &[]).unwrap();
    assert!(results.patients.is_empty());
    assert_eq!(results.unfiltered.len(), 1);
}

#[rstest]
#[case::overflow(binary("Multiply", int(i32::MAX), int(2)))]
#[case::bad_operand(binary("And", int(1), boolean(true)))]
#[case::cross_library(json!({ "type": "ExpressionRef", "libraryName": "Other", "name": "X" }))]
#[case::unknown_function(json!({ "type": "FunctionRef", "name": "Missing", "operand": [] }))]
#[case::retrieve(json!({ "type": "Retrieve", "dataType": "{http://hl7.org/fhir}Observation" }))]
fn evaluation_errors(#[case] expression: Value) {
    assert!(eval_main(expression).is_err());
}
