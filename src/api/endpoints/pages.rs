//! Page rendering for any GET path.

use axum::extract::State;
use axum::http::Uri;
use axum::response::Html;

use crate::api::types::AppContext;
use crate::page::{render_form, render_landing, FormView};
use crate::routing::{route, PageDescriptor};
use crate::submission::Submission;

/// `GET <any path>`: landing page or an empty disease form.
pub async fn page(State(ctx): State<AppContext>, uri: Uri) -> Html<String> {
    let descriptor = route(uri.path());
    tracing::debug!(path = uri.path(), ?descriptor, "Page requested");

    match descriptor {
        PageDescriptor::Landing => Html(render_landing(&ctx.registry.diseases())),
        PageDescriptor::Form(disease) => {
            let view = FormView::build(disease.schema(), &Submission::new(), None, None);
            Html(render_form(&view))
        }
    }
}
