//! Submitted form values and feature-vector assembly.
//!
//! A `Submission` lives for a single request: it is parsed from the posted
//! form, read by the prediction and report steps, and dropped. Nothing is
//! persisted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::schema::{FeatureSchema, FieldSpec, ValueKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// Ordered numeric input for a classifier, one row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields: {}", .fields.join(", "))]
pub struct MissingInput {
    pub fields: Vec<&'static str>,
}

/// Field values keyed by field id. Absent keys are "unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    values: BTreeMap<String, FieldValue>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(mut self, id: &str, value: f64) -> Self {
        self.set(id, FieldValue::Number(value));
        self
    }

    pub fn with_text(mut self, id: &str, value: &str) -> Self {
        self.set(id, FieldValue::Text(value.to_string()));
        self
    }

    pub fn set(&mut self, id: &str, value: FieldValue) {
        self.values.insert(id.to_string(), value);
    }

    pub fn unset(&mut self, id: &str) {
        self.values.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Parse posted form fields against a schema.
    ///
    /// Blank inputs and numbers that do not parse are left unset, the same
    /// way a browser number input reports an invalid entry as empty. Keys
    /// the schema does not declare are ignored.
    pub fn from_form(schema: &FeatureSchema, form: &HashMap<String, String>) -> Self {
        let mut submission = Self::new();
        for field in schema.fields {
            let Some(raw) = form.get(field.id).map(|v| v.trim()) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            match field.kind {
                ValueKind::Text => submission.set(field.id, FieldValue::Text(raw.to_string())),
                ValueKind::Numeric { .. } | ValueKind::Categorical { .. } => {
                    if let Ok(n) = raw.parse::<f64>() {
                        if n.is_finite() {
                            submission.set(field.id, FieldValue::Number(n));
                        }
                    }
                }
            }
        }
        submission
    }

    /// The value for `field` if it is set and usable for that field's kind.
    ///
    /// A categorical code outside the declared options, a non-finite number
    /// or blank text counts as unset.
    pub fn resolve(&self, field: &FieldSpec) -> Option<&FieldValue> {
        let value = self.values.get(field.id)?;
        let usable = match (&field.kind, value) {
            (ValueKind::Numeric { .. }, FieldValue::Number(n)) => n.is_finite(),
            (ValueKind::Categorical { .. }, FieldValue::Number(n)) => {
                field.option_label(*n).is_some()
            }
            (ValueKind::Text, FieldValue::Text(s)) => !s.trim().is_empty(),
            _ => false,
        };
        usable.then_some(value)
    }

    /// Required fields that are unset, in schema order.
    pub fn missing_fields(&self, schema: &FeatureSchema) -> Vec<&'static str> {
        schema
            .fields
            .iter()
            .filter(|f| f.required && self.resolve(f).is_none())
            .map(|f| f.id)
            .collect()
    }

    pub fn is_complete(&self, schema: &FeatureSchema) -> bool {
        self.missing_fields(schema).is_empty()
    }

    pub fn filled_count(&self, schema: &FeatureSchema) -> usize {
        schema.fields.iter().filter(|f| self.resolve(f).is_some()).count()
    }

    /// Assemble the feature vector in the schema's model-field order.
    pub fn feature_vector(&self, schema: &FeatureSchema) -> Result<FeatureVector, MissingInput> {
        let missing = self.missing_fields(schema);
        if !missing.is_empty() {
            return Err(MissingInput { fields: missing });
        }

        let values = schema
            .model_fields()
            .map(|field| match self.resolve(field) {
                Some(FieldValue::Number(n)) => Ok(*n),
                _ => Err(MissingInput {
                    fields: vec![field.id],
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureVector(values))
    }

    /// Human-readable value for reports: option labels for categorical
    /// codes, plain numbers otherwise.
    pub fn display_value(&self, field: &FieldSpec) -> Option<String> {
        match self.resolve(field)? {
            FieldValue::Number(n) => Some(
                field
                    .option_label(*n)
                    .map(str::to_string)
                    .unwrap_or_else(|| display_number(*n)),
            ),
            FieldValue::Text(s) => Some(s.trim().to_string()),
        }
    }

    /// Raw value written back into a form control; empty when unset.
    pub fn form_value(&self, field: &FieldSpec) -> String {
        match self.resolve(field) {
            Some(FieldValue::Number(n)) => n.to_string(),
            Some(FieldValue::Text(s)) => s.trim().to_string(),
            None => String::new(),
        }
    }
}

/// Very large or very small magnitudes switch to exponent form so a report
/// line stays on the page.
fn display_number(n: f64) -> String {
    let magnitude = n.abs();
    if n != 0.0 && !(1e-6..1e15).contains(&magnitude) {
        format!("{n:e}")
    } else {
        n.to_string()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
