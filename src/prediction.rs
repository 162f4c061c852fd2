//! Prediction handler: validate, assemble, classify, phrase the verdict.

use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, Label};
use crate::schema::FeatureSchema;
use crate::submission::{FieldValue, Submission};

pub const MISSING_INPUT_MESSAGE: &str = "Please fill all fields before predicting.";
pub const PREDICTION_FAILED_MESSAGE: &str = "Prediction could not be computed.";
/// Shown in reports when a verdict carries no usable text.
pub const VERDICT_PLACEHOLDER: &str = "Prediction not available";

const DEFAULT_SUBJECT: &str = "The person";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Positive,
    Negative,
    Unavailable,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Classifier outcome plus the sentence shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub message: String,
}

impl Verdict {
    pub fn missing_input() -> Self {
        Self {
            kind: VerdictKind::Unavailable,
            message: MISSING_INPUT_MESSAGE.to_string(),
        }
    }

    pub fn failed() -> Self {
        Self {
            kind: VerdictKind::Unavailable,
            message: PREDICTION_FAILED_MESSAGE.to_string(),
        }
    }

    /// Phrase a label with the schema's disease name and the subject's name
    /// (or "The person" when the schema has no subject field).
    pub fn from_label(schema: &FeatureSchema, submission: &Submission, label: Label) -> Self {
        let subject = schema
            .subject_field()
            .and_then(|f| match submission.resolve(f) {
                Some(FieldValue::Text(name)) => Some(name.trim().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

        match label {
            Label::Positive => Self {
                kind: VerdictKind::Positive,
                message: format!("{subject} HAS {}!", schema.disease_name),
            },
            Label::Negative => Self {
                kind: VerdictKind::Negative,
                message: format!("{subject} does NOT have {}.", schema.disease_name),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        self.kind != VerdictKind::Unavailable
    }

    /// Text for the report's result line.
    pub fn display_text(&self) -> &str {
        let text = self.message.trim();
        if text.is_empty() {
            VERDICT_PLACEHOLDER
        } else {
            text
        }
    }
}

/// Run one prediction.
///
/// Missing input is a soft failure: the classifier is not called and the
/// verdict is `Unavailable` with the fill-all-fields message.
pub fn predict(
    schema: &FeatureSchema,
    classifier: &dyn Classifier,
    submission: &Submission,
) -> Verdict {
    let features = match submission.feature_vector(schema) {
        Ok(features) => features,
        Err(missing) => {
            tracing::debug!(
                disease = %schema.disease,
                missing = missing.fields.len(),
                "Prediction skipped: incomplete submission"
            );
            return Verdict::missing_input();
        }
    };

    match classifier.predict(&features) {
        Ok(label) => {
            let verdict = Verdict::from_label(schema, submission, label);
            tracing::info!(
                disease = %schema.disease,
                verdict = verdict.kind.as_str(),
                "Prediction computed"
            );
            verdict
        }
        Err(e) => {
            tracing::error!(disease = %schema.disease, "Classifier failed: {e}");
            Verdict::failed()
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
