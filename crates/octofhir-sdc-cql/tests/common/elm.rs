//! ELM builders

use serde_json::{Value, json};

pub fn integer(value: i64) -> Value {
    json!({
        "type": "Literal",
        "valueType": "{urn:hl7-org:elm-types:r1}Integer",
        "value": value.to_string()
    })
}

pub fn expression_ref(name: &str) -> Value {
    json!({ "type": "ExpressionRef", "name": name })
}

pub fn binary(op: &str, left: Value, right: Value) -> Value {
    json!({ "type": op, "operand": [left, right] })
}

/// An ELM library with unfiltered-context definitions
pub fn library(id: &str, defs: &[(&str, Value)]) -> Value {
    let defs: Vec<Value> = defs
        .iter()
        .map(|(name, expression)| {
            json!({
                "name": name,
                "context": "Unfiltered",
                "accessLevel": "Public",
                "expression": expression
            })
        })
        .collect();

    json!({
        "library": {
            "identifier": { "id": id, "version": "1.0.0" },
            "schemaIdentifier": { "id": "urn:hl7-org:elm", "version": "r1" },
            "statements": { "def": defs }
        }
    })
}

/// `MyLib` with `Score: 42` and `Total: Score + 1`
pub fn my_lib_elm() -> Value {
    library(
        "MyLib",
        &[
            ("Score", integer(42)),
            ("Total", binary("Add", expression_ref("Score"), integer(1))),
        ],
    )
}

/// Translation of the wrapped `2*3` expression
pub fn wrapped_product_elm() -> Value {
    library(
        "",
        &[("__lforms__main__", binary("Multiply", integer(2), integer(3)))],
    )
}

pub const MY_LIB_CQL: &str = "library MyLib version '1.0.0'\n\ndefine Score: 42\ndefine Total: Score + 1\n";
pub const BROKEN_CQL: &str = "library Broken version '1.0.0'\n\ndefine Value: 2 *\n";
pub const WRAPPED_PRODUCT_CQL: &str = "define __lforms__main__:\n  2*3";

/// `Obs` whose `Score` needs a data retrieve the embedded engine cannot run
pub fn retrieve_lib_elm() -> Value {
    library(
        "Obs",
        &[(
            "Score",
            json!({ "type": "Retrieve", "dataType": "{http://hl7.org/fhir}Observation" }),
        )],
    )
}

pub const OBS_CQL: &str = "library Obs version '1.0.0'\n\ndefine Score: [Observation]\n";
