//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::classifier::{FixedClassifier, ModelRegistry};
use crate::schema::{DIABETES_FEMALE, HEART};
use crate::submission::Submission;

pub const ALEX_FORM: [(&str, &str); 14] = [
    ("age", "45"),
    ("sex", "1"),
    ("cp", "2"),
    ("trestbps", "130"),
    ("chol", "250"),
    ("fbs", "0"),
    ("restecg", "1"),
    ("thalach", "170"),
    ("exang", "0"),
    ("oldpeak", "1.2"),
    ("slope", "2"),
    ("ca", "0"),
    ("thal", "2"),
    ("name", "Alex"),
];

pub fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn alex_submission() -> Submission {
    Submission::from_form(&HEART, &form(&ALEX_FORM))
}

pub fn diabetes_submission() -> Submission {
    Submission::new()
        .with_number("pregnancies", 2.0)
        .with_number("glucose", 138.0)
        .with_number("bloodpressure", 62.0)
        .with_number("skinthickness", 35.0)
        .with_number("insulin", 0.0)
        .with_number("bmi", 33.6)
        .with_number("dpf", 0.127)
        .with_number("age", 47.0)
}

/// Registry whose classifiers always return `label`.
pub fn fixed_registry(label: i64) -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry
        .insert(&HEART, Arc::new(FixedClassifier::new(13, label)))
        .unwrap();
    registry
        .insert(&DIABETES_FEMALE, Arc::new(FixedClassifier::new(8, label)))
        .unwrap();
    registry
}
