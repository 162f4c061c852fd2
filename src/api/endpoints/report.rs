//! Report download action.

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;

use crate::api::endpoints::form_fields;
use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::report::{generate, Report};
use crate::session::{self, FormState, VERDICT_TOKEN_FIELD};
use crate::submission::Submission;

/// Response header carrying the form state after the request.
pub const FORM_STATE_HEADER: &str = "x-form-state";

/// `POST /:disease/report`: the PDF for the posted fields and verdict token.
///
/// A missing, malformed or stale token means no verdict, and no verdict
/// means `204 No Content`.
pub async fn download(
    State(ctx): State<AppContext>,
    Path(slug): Path<String>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Response, ApiError> {
    let schema = ctx.schema(&slug)?;
    let fields = form_fields(form)?;
    let submission = Submission::from_form(schema, &fields);

    let verdict = fields
        .get(VERDICT_TOKEN_FIELD)
        .filter(|t| !t.trim().is_empty())
        .and_then(|token| match session::open(schema, &submission, token) {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::debug!(disease = %schema.disease, "Verdict token ignored: {e}");
                None
            }
        });

    let state = FormState::of(schema, &submission, verdict.as_ref());
    let Some(report) = generate(schema, &submission, verdict.as_ref())? else {
        tracing::debug!(disease = %schema.disease, state = state.as_str(), "No report issued");
        let header = [(HeaderName::from_static(FORM_STATE_HEADER), state.as_str())];
        return Ok((StatusCode::NO_CONTENT, header).into_response());
    };
    let state = state.after_download();
    tracing::debug!(disease = %schema.disease, state = state.as_str(), "Report issued");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, Report::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ),
            (
                HeaderName::from_static(FORM_STATE_HEADER),
                state.as_str().to_string(),
            ),
        ],
        report.bytes,
    )
        .into_response())
}
