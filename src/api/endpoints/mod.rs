//! Endpoint handlers. One module per action on a form page.

pub mod pages;
pub mod predict;
pub mod report;

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::Form;

use crate::api::error::ApiError;

/// Posted form fields, with a body that fails to decode mapped to 400.
pub(crate) fn form_fields(
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<HashMap<String, String>, ApiError> {
    form.map(|Form(fields)| fields)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}
