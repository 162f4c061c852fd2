//! Predict action.

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::Form;

use crate::api::endpoints::form_fields;
use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::page::{render_form, FormView};
use crate::prediction::predict;
use crate::session;
use crate::submission::Submission;

/// `POST /:disease/predict`: score the submission and re-render the form
/// with the verdict and, when it is available, a sealed verdict token.
pub async fn submit(
    State(ctx): State<AppContext>,
    Path(slug): Path<String>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Html<String>, ApiError> {
    let schema = ctx.schema(&slug)?;
    let fields = form_fields(form)?;
    let classifier = ctx.classifier(schema.disease)?;

    let submission = Submission::from_form(schema, &fields);
    let verdict = predict(schema, classifier.as_ref(), &submission);
    let token = session::seal(schema, &submission, &verdict);

    let view = FormView::build(schema, &submission, Some(&verdict), token);
    Ok(Html(render_form(&view)))
}
