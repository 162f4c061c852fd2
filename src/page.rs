//! Form renderer: schema → page description → HTML.
//!
//! `FormView` is the page description (one control per schema field, the
//! predict and download actions, a result slot and a download slot). The
//! HTML functions only format it; no validation happens here and nothing on
//! the page blocks submission.

use crate::config;
use crate::prediction::{Verdict, VerdictKind};
use crate::schema::{CategoryOption, DiseaseKind, FeatureSchema, ValueKind};
use crate::session::{FormState, VERDICT_TOKEN_FIELD};
use crate::submission::Submission;

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Number { step: Option<f64> },
    Select { options: &'static [CategoryOption] },
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputControl {
    pub id: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub control: Control,
    /// Previously entered value, empty when unset.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct FormView {
    pub disease: DiseaseKind,
    pub title: &'static str,
    pub controls: Vec<InputControl>,
    pub predict_action: String,
    pub download_action: String,
    pub result: Option<Verdict>,
    pub token: Option<String>,
    pub state: FormState,
}

impl FormView {
    /// Describe the form page for `schema`.
    ///
    /// `verdict` is shown in the result slot; `token` is only carried when
    /// the verdict was sealed for this exact submission.
    pub fn build(
        schema: &FeatureSchema,
        submission: &Submission,
        verdict: Option<&Verdict>,
        token: Option<String>,
    ) -> Self {
        let controls = schema
            .fields
            .iter()
            .map(|field| InputControl {
                id: field.id,
                label: field.label,
                placeholder: field.placeholder,
                control: match field.kind {
                    ValueKind::Numeric { step } => Control::Number { step },
                    ValueKind::Categorical { options } => Control::Select { options },
                    ValueKind::Text => Control::Text,
                },
                value: submission.form_value(field),
            })
            .collect();

        let sealed = verdict.filter(|_| token.is_some());
        let slug = schema.disease.slug();

        Self {
            disease: schema.disease,
            title: schema.title,
            controls,
            predict_action: format!("/{slug}/predict"),
            download_action: format!("/{slug}/report"),
            result: verdict.cloned(),
            state: FormState::of(schema, submission, sealed),
            token,
        }
    }

    pub fn can_download(&self) -> bool {
        self.state.can_download() && self.token.is_some()
    }
}

// ═══════════════════════════════════════════════════════════
// HTML
// ═══════════════════════════════════════════════════════════

/// Clears the carried verdict as soon as any field is edited.
const INVALIDATE_ON_EDIT_JS: &str = r#"<script>
document.getElementById('prediction-form').addEventListener('input', function () {
    document.getElementById('verdict_token').value = '';
    document.getElementById('download-btn').disabled = true;
});
</script>"#;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav_html() -> String {
    format!(
        r#"<nav class="navbar navbar-light bg-light fixed-top shadow">
    <div class="container">
        <a class="navbar-brand" href="/">{}</a>
        <a class="nav-link" href="/">Home</a>
    </div>
</nav>"#,
        config::APP_NAME
    )
}

fn page_shell(heading: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{} | {}</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css">
</head>
<body>
{}
<main class="pt-5 mt-5">
{}
</main>
</body>
</html>"#,
        escape_html(heading),
        config::APP_TITLE,
        nav_html(),
        body
    )
}

fn control_html(input: &InputControl) -> String {
    let id = input.id;
    let placeholder = escape_html(input.placeholder);
    let value = escape_html(&input.value);

    let widget = match &input.control {
        Control::Number { step } => {
            let step_attr = step.map(|s| format!(r#" step="{s}""#)).unwrap_or_default();
            format!(
                r#"<input id="{id}" name="{id}" type="number"{step_attr} placeholder="{placeholder}" value="{value}" class="form-control">"#
            )
        }
        Control::Select { options } => {
            let unset_selected = if input.value.is_empty() { " selected" } else { "" };
            let choices: String = options
                .iter()
                .map(|o| {
                    let selected = if input.value == o.code.to_string() { " selected" } else { "" };
                    format!(
                        r#"<option value="{}"{selected}>{}</option>"#,
                        o.code,
                        escape_html(o.label)
                    )
                })
                .collect();
            format!(
                r#"<select id="{id}" name="{id}" class="form-select"><option value=""{unset_selected}>{placeholder}</option>{choices}</select>"#
            )
        }
        Control::Text => format!(
            r#"<input id="{id}" name="{id}" type="text" placeholder="{placeholder}" value="{value}" class="form-control">"#
        ),
    };

    format!(
        r#"<div class="col-md-4 mb-3"><label for="{id}" class="form-label">{}</label>{widget}</div>"#,
        escape_html(input.label)
    )
}

fn result_html(result: Option<&Verdict>) -> String {
    let Some(verdict) = result else {
        return String::new();
    };
    let class = match verdict.kind {
        VerdictKind::Positive => "alert-danger",
        VerdictKind::Negative => "alert-success",
        VerdictKind::Unavailable => "alert-warning",
    };
    format!(
        r#"<div class="alert {class}" data-verdict="{}">{}</div>"#,
        verdict.kind.as_str(),
        escape_html(&verdict.message)
    )
}

/// Render a disease form page.
pub fn render_form(view: &FormView) -> String {
    let controls: String = view.controls.iter().map(control_html).collect();
    let token = view.token.as_deref().map(escape_html).unwrap_or_default();
    let disabled = if view.can_download() { "" } else { " disabled" };

    let body = format!(
        r#"<div class="container d-flex flex-column align-items-center">
    <div class="card shadow p-4" style="border-radius: 15px; max-width: 800px;">
        <div class="card-body">
            <h2 class="text-center mt-4 mb-4 fw-bold">{title}</h2>
            <form id="prediction-form" method="post" action="{predict}" data-state="{state}">
                <div class="row">{controls}</div>
                <input type="hidden" id="{token_field}" name="{token_field}" value="{token}">
                <div class="row mb-3">
                    <div class="col-md-6"><button type="submit" id="predict-btn" formaction="{predict}" class="btn btn-primary mt-3">Get Prediction</button></div>
                    <div class="col-md-6"><button type="submit" id="download-btn" formaction="{download}" class="btn btn-success mt-3"{disabled}>Download Report</button></div>
                </div>
            </form>
            <div id="prediction-result" class="mt-4 text-center">{result}</div>
        </div>
    </div>
</div>
{script}"#,
        title = escape_html(view.title),
        predict = view.predict_action,
        download = view.download_action,
        state = view.state.as_str(),
        controls = controls,
        token_field = VERDICT_TOKEN_FIELD,
        token = token,
        disabled = disabled,
        result = result_html(view.result.as_ref()),
        script = INVALIDATE_ON_EDIT_JS,
    );

    page_shell(view.title, &body)
}

/// Render the landing page: one card per available disease form.
pub fn render_landing(diseases: &[DiseaseKind]) -> String {
    let cards: String = diseases
        .iter()
        .map(|d| {
            format!(
                r#"<div class="col-12 col-sm-6 col-md-4 d-flex justify-content-center">
            <a href="{}" class="nav card shadow text-decoration-none">
                <div class="card-body"><h4 class="card-title text-center">{}</h4></div>
            </a>
        </div>"#,
                d.path(),
                escape_html(d.schema().title)
            )
        })
        .collect();

    let body = format!(
        r#"<div class="container-fluid">
    <div class="row justify-content-center align-items-center g-4">
        {cards}
    </div>
</div>"#
    );

    page_shell(config::APP_NAME, &body)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
