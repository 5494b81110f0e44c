//! Common test utilities for questionnaire CQL runs
//!
//! - Recording fakes of the translator, fetcher and engine
//! - ELM builders
//! - Fixture loading

#![allow(dead_code)]

pub mod elm;
pub mod mocks;

pub use elm::*;
pub use mocks::*;

use serde_json::Value;

pub const SCORE_QUESTIONNAIRE: &str = include_str!("../fixtures/score_questionnaire.json");
pub const MIXED_QUESTIONNAIRE: &str = include_str!("../fixtures/mixed_questionnaire.json");

pub fn fixture(raw: &str) -> Value {
    serde_json::from_str(raw).expect("fixture is valid JSON")
}
