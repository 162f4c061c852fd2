//! Verdict tokens and per-page form state.
//!
//! The verdict computed by the predict action reaches the download action
//! only through a sealed token that the form page echoes back. The token
//! binds the verdict to the exact submission it was computed for: editing
//! any field after predicting makes the token stale, and the report is
//! withheld until the user predicts again.
//!
//! Nothing is stored server-side; each browser tab carries its own token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::prediction::Verdict;
use crate::schema::{DiseaseKind, FeatureSchema};
use crate::submission::Submission;

/// Hidden form field carrying the sealed verdict.
pub const VERDICT_TOKEN_FIELD: &str = "verdict_token";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Verdict token is malformed")]
    Malformed,
    #[error("Verdict token was issued for {0}")]
    WrongDisease(DiseaseKind),
    #[error("Verdict token does not match the current submission")]
    Stale,
    #[error("Verdict token carries no prediction")]
    Unavailable,
}

#[derive(Serialize, Deserialize)]
struct SealedVerdict {
    disease: DiseaseKind,
    verdict: Verdict,
    fingerprint: String,
}

/// SHA-256 over the disease and every field's normalized value, in schema
/// order.
pub fn fingerprint(schema: &FeatureSchema, submission: &Submission) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schema.disease.slug().as_bytes());
    hasher.update([0u8]);
    for field in schema.fields {
        hasher.update(field.id.as_bytes());
        hasher.update(b"=");
        hasher.update(submission.form_value(field).as_bytes());
        hasher.update(b"\n");
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Seal a verdict for the page. `Unavailable` verdicts and incomplete
/// submissions get no token.
pub fn seal(schema: &FeatureSchema, submission: &Submission, verdict: &Verdict) -> Option<String> {
    if !verdict.is_available() || !submission.is_complete(schema) {
        return None;
    }

    let sealed = SealedVerdict {
        disease: schema.disease,
        verdict: verdict.clone(),
        fingerprint: fingerprint(schema, submission),
    };

    match serde_json::to_vec(&sealed) {
        Ok(json) => Some(URL_SAFE_NO_PAD.encode(json)),
        Err(e) => {
            tracing::error!("Failed to seal verdict: {e}");
            None
        }
    }
}

/// Open a token against the submission it is presented with.
pub fn open(
    schema: &FeatureSchema,
    submission: &Submission,
    token: &str,
) -> Result<Verdict, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| TokenError::Malformed)?;
    let sealed: SealedVerdict =
        serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    if sealed.disease != schema.disease {
        return Err(TokenError::WrongDisease(sealed.disease));
    }
    if !sealed.verdict.is_available() {
        return Err(TokenError::Unavailable);
    }
    if sealed.fingerprint != fingerprint(schema, submission) {
        return Err(TokenError::Stale);
    }

    Ok(sealed.verdict)
}

// ═══════════════════════════════════════════════════════════
// Form state
// ═══════════════════════════════════════════════════════════

/// Lifecycle of one form page visit.
///
/// Editing a field at any point drops the page back to `Empty`,
/// `PartiallyFilled` or `Ready`, because the carried token goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Empty,
    PartiallyFilled,
    Ready,
    Predicted,
    ReportIssued,
}

impl FormState {
    /// State of a page given its submission and a verdict that has already
    /// been opened against that submission.
    pub fn of(schema: &FeatureSchema, submission: &Submission, verdict: Option<&Verdict>) -> Self {
        let filled = submission.filled_count(schema);
        if filled == 0 {
            return Self::Empty;
        }
        if !submission.is_complete(schema) {
            return Self::PartiallyFilled;
        }
        match verdict {
            Some(v) if v.is_available() => Self::Predicted,
            _ => Self::Ready,
        }
    }

    /// State after the download action ran. Only a predicted page issues a
    /// report; every other state is unchanged.
    pub fn after_download(self) -> Self {
        match self {
            Self::Predicted | Self::ReportIssued => Self::ReportIssued,
            other => other,
        }
    }

    pub fn can_download(&self) -> bool {
        matches!(self, Self::Predicted | Self::ReportIssued)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::PartiallyFilled => "partially_filled",
            Self::Ready => "ready",
            Self::Predicted => "predicted",
            Self::ReportIssued => "report_issued",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::VerdictKind;
    use crate::schema::{DIABETES_FEMALE, HEART};
    use crate::submission::FieldValue;
    use crate::test_support::{alex_submission, diabetes_submission};

    fn negative() -> Verdict {
        Verdict {
            kind: VerdictKind::Negative,
            message: "Alex does NOT have heart disease.".into(),
        }
    }

    #[test]
    fn sealed_token_opens_for_same_submission() {
        let submission = alex_submission();
        let token = seal(&HEART, &submission, &negative()).unwrap();
        assert_eq!(open(&HEART, &submission, &token).unwrap(), negative());
    }

    #[test]
    fn edited_field_makes_token_stale() {
        let submission = alex_submission();
        let token = seal(&HEART, &submission, &negative()).unwrap();

        let mut edited = submission.clone();
        edited.set("chol", FieldValue::Number(300.0));
        assert_eq!(open(&HEART, &edited, &token), Err(TokenError::Stale));

        let renamed = submission.with_text("name", "Sam");
        assert_eq!(open(&HEART, &renamed, &token), Err(TokenError::Stale));
    }

    #[test]
    fn equivalent_numeric_spellings_share_a_fingerprint() {
        let a = alex_submission();
        let b = alex_submission().with_number("age", 45.000);
        assert_eq!(fingerprint(&HEART, &a), fingerprint(&HEART, &b));
    }

    #[test]
    fn token_is_bound_to_disease() {
        let token = seal(&HEART, &alex_submission(), &negative()).unwrap();
        assert_eq!(
            open(&DIABETES_FEMALE, &diabetes_submission(), &token),
            Err(TokenError::WrongDisease(DiseaseKind::Heart))
        );
    }

    #[test]
    fn unavailable_verdicts_are_not_sealed() {
        assert!(seal(&HEART, &alex_submission(), &Verdict::missing_input()).is_none());
        assert!(seal(&HEART, &alex_submission(), &Verdict::failed()).is_none());

        let mut incomplete = alex_submission();
        incomplete.unset("age");
        assert!(seal(&HEART, &incomplete, &negative()).is_none());
    }

    #[test]
    fn forged_unavailable_token_is_rejected() {
        let sealed = SealedVerdict {
            disease: DiseaseKind::Heart,
            verdict: Verdict::missing_input(),
            fingerprint: fingerprint(&HEART, &alex_submission()),
        };
        let token = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&sealed).unwrap());
        assert_eq!(
            open(&HEART, &alex_submission(), &token),
            Err(TokenError::Unavailable)
        );
    }

    #[test]
    fn garbage_tokens_are_malformed() {
        for token in ["", "!!!", "bm90IGpzb24"] {
            assert_eq!(
                open(&HEART, &alex_submission(), token),
                Err(TokenError::Malformed),
                "{token}"
            );
        }
    }

    #[test]
    fn form_state_follows_submission_and_verdict() {
        let empty = Submission::new();
        assert_eq!(FormState::of(&HEART, &empty, None), FormState::Empty);

        let partial = Submission::new().with_number("age", 45.0);
        assert_eq!(FormState::of(&HEART, &partial, None), FormState::PartiallyFilled);

        let full = alex_submission();
        assert_eq!(FormState::of(&HEART, &full, None), FormState::Ready);
        assert_eq!(
            FormState::of(&HEART, &full, Some(&Verdict::missing_input())),
            FormState::Ready
        );

        let state = FormState::of(&HEART, &full, Some(&negative()));
        assert_eq!(state, FormState::Predicted);
        assert!(state.can_download());
        assert!(!FormState::Ready.can_download());
        assert!(FormState::ReportIssued.can_download());
    }

    #[test]
    fn download_moves_only_predicted_pages_forward() {
        assert_eq!(FormState::Predicted.after_download(), FormState::ReportIssued);
        assert_eq!(FormState::ReportIssued.after_download(), FormState::ReportIssued);
        assert_eq!(FormState::Ready.after_download(), FormState::Ready);
        assert_eq!(FormState::Empty.after_download(), FormState::Empty);
    }
}
