//! Prediction report: a fixed-layout, single-page PDF.
//!
//! Layout is computed first as a list of draw commands (points, origin at the
//! bottom-left of a US Letter page), then handed to `printpdf`. Output is
//! byte-for-byte reproducible: the document id and every PDF date are pinned,
//! and no XMP packet (which carries a random instance id) is written.

use std::io::BufWriter;

use printpdf::*;
use sha2::{Digest, Sha256};

use crate::prediction::Verdict;
use crate::schema::FeatureSchema;
use crate::submission::Submission;

pub const PAGE_WIDTH_PT: f32 = 612.0;
pub const PAGE_HEIGHT_PT: f32 = 792.0;
pub const FONT_SIZE: f32 = 12.0;

const MARGIN_X: f32 = 100.0;
const TITLE_Y: f32 = 750.0;
const RULE_Y: f32 = 745.0;
const RULE_END_X: f32 = 500.0;
const FIRST_LINE_Y: f32 = 720.0;
const LINE_SPACING: f32 = 20.0;

/// Fixed id so identical inputs serialize identically.
const DOCUMENT_ID: &str = "disease-prediction-report-v1";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF font error: {0}")]
    Font(String),
    #[error("PDF save error: {0}")]
    Save(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: f32,
        y: f32,
        text: String,
        weight: FontWeight,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
    },
}

/// Page layout before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub filename: &'static str,
    /// `"<label>: <value>"`, one per schema field, in schema order.
    pub field_lines: Vec<String>,
    pub verdict_line: String,
    pub bytes: Vec<u8>,
}

impl Report {
    pub const CONTENT_TYPE: &'static str = "application/pdf";
}

/// Lay out the report page. Unset fields render with an empty value; callers
/// that need a complete report go through [`generate`].
pub fn layout(schema: &FeatureSchema, submission: &Submission, verdict: &Verdict) -> ReportLayout {
    let mut commands = vec![
        DrawCommand::Text {
            x: MARGIN_X,
            y: TITLE_Y,
            text: schema.report_title.to_string(),
            weight: FontWeight::Regular,
        },
        DrawCommand::Rule {
            x1: MARGIN_X,
            x2: RULE_END_X,
            y: RULE_Y,
        },
    ];

    let mut y = FIRST_LINE_Y;
    for field in schema.fields {
        let value = submission.display_value(field).unwrap_or_default();
        commands.push(DrawCommand::Text {
            x: MARGIN_X,
            y,
            text: format!("{}: {}", field.label, value),
            weight: FontWeight::Regular,
        });
        y -= LINE_SPACING;
    }

    commands.push(DrawCommand::Text {
        x: MARGIN_X,
        y: y - LINE_SPACING,
        text: format!("Prediction Result: {}", verdict.display_text()),
        weight: FontWeight::Bold,
    });

    ReportLayout {
        title: schema.report_title.to_string(),
        commands,
    }
}

/// Build the report for a completed prediction.
///
/// Returns `Ok(None)` (no artifact) when a required field is unset or the
/// verdict is absent or `Unavailable`.
pub fn generate(
    schema: &FeatureSchema,
    submission: &Submission,
    verdict: Option<&Verdict>,
) -> Result<Option<Report>, ReportError> {
    let Some(verdict) = verdict.filter(|v| v.is_available()) else {
        tracing::debug!(disease = %schema.disease, "Report skipped: no verdict");
        return Ok(None);
    };
    if !submission.is_complete(schema) {
        tracing::debug!(disease = %schema.disease, "Report skipped: incomplete submission");
        return Ok(None);
    }

    let page = layout(schema, submission, verdict);
    let bytes = render_pdf(&page)?;

    let mut lines: Vec<String> = page
        .commands
        .iter()
        .skip(1) // title
        .filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.clone()),
            DrawCommand::Rule { .. } => None,
        })
        .collect();
    let verdict_line = lines.pop().unwrap_or_default();

    tracing::info!(
        disease = %schema.disease,
        size = bytes.len(),
        "Report generated"
    );

    Ok(Some(Report {
        filename: schema.report_filename,
        field_lines: lines,
        verdict_line,
        bytes,
    }))
}

/// Serialize a layout to PDF bytes.
///
/// Text is set in the builtin Helvetica faces (WinAnsi), so only Latin-1
/// characters render faithfully.
pub fn render_pdf(page: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let epoch = ::time::OffsetDateTime::UNIX_EPOCH;
    let (doc, page1, layer1) = PdfDocument::new(
        &page.title,
        Mm::from(Pt(PAGE_WIDTH_PT)),
        Mm::from(Pt(PAGE_HEIGHT_PT)),
        "Layer 1",
    );
    let doc = doc
        .with_document_id(DOCUMENT_ID.to_string())
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_xmp_metadata: false,
            allows_default_fonts: true,
            ..Default::default()
        }))
        .with_creation_date(epoch)
        .with_mod_date(epoch);

    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Font(e.to_string()))?;

    for command in &page.commands {
        match command {
            DrawCommand::Text { x, y, text, weight } => {
                let face = match weight {
                    FontWeight::Regular => &font,
                    FontWeight::Bold => &bold,
                };
                layer.use_text(text.as_str(), FONT_SIZE, Mm::from(Pt(*x)), Mm::from(Pt(*y)), face);
            }
            DrawCommand::Rule { x1, x2, y } => {
                layer.add_line(Line {
                    points: vec![
                        (Point::new(Mm::from(Pt(*x1)), Mm::from(Pt(*y))), false),
                        (Point::new(Mm::from(Pt(*x2)), Mm::from(Pt(*y))), false),
                    ],
                    is_closed: false,
                });
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Save(e.to_string()))?;
    let mut bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Save(format!("PDF buffer error: {e}")))?;
    pin_trailer_id(&mut bytes)?;
    Ok(bytes)
}

/// Replace the random trailer `/ID` pair written by `save` with digits
/// derived from the rest of the document. Lengths are kept, so the xref
/// offsets stay valid.
fn pin_trailer_id(bytes: &mut [u8]) -> Result<(), ReportError> {
    let missing = || ReportError::Save("PDF trailer has no /ID entry".into());

    let trailer = find(bytes, b"trailer", 0).ok_or_else(missing)?;
    let id = find(bytes, b"/ID", trailer).ok_or_else(missing)?;

    let mut spans = Vec::with_capacity(2);
    let mut pos = id + 3;
    while spans.len() < 2 {
        let open = bytes[pos..]
            .iter()
            .position(|b| *b == b'(' || *b == b'<')
            .map(|i| pos + i)
            .ok_or_else(missing)?;
        let close_byte = if bytes[open] == b'(' { b')' } else { b'>' };
        let close = bytes[open + 1..]
            .iter()
            .position(|b| *b == close_byte)
            .map(|i| open + 1 + i)
            .ok_or_else(missing)?;
        spans.push((open + 1, close));
        pos = close + 1;
    }

    let (start, end) = (spans[0].0, spans[1].1);
    let mut hasher = Sha256::new();
    hasher.update(&bytes[..start]);
    hasher.update(&bytes[end..]);
    let digest: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect();

    for (from, to) in spans {
        for (i, slot) in bytes[from..to].iter_mut().enumerate() {
            *slot = digest.as_bytes()[i % digest.len()];
        }
    }
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .rposition(|w| w == needle)
        .map(|i| from + i)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::VerdictKind;
    use crate::schema::{DIABETES_FEMALE, HEART};
    use crate::test_support::{alex_submission, diabetes_submission};

    fn negative() -> Verdict {
        Verdict {
            kind: VerdictKind::Negative,
            message: "Alex does NOT have heart disease.".into(),
        }
    }

    #[test]
    fn heart_report_has_fourteen_lines_in_schema_order() {
        let report = generate(&HEART, &alex_submission(), Some(&negative()))
            .unwrap()
            .unwrap();

        assert_eq!(report.filename, "Heart_Disease_Report.pdf");
        assert_eq!(
            report.field_lines,
            vec![
                "Name: Alex",
                "Age: 45",
                "Sex: Male",
                "Chest Pain Type: 2",
                "Resting Blood Pressure: 130",
                "Cholesterol: 250",
                "Fasting Blood Sugar: Normal",
                "Resting ECG: 1",
                "Max Heart Rate: 170",
                "Exercise Induced Angina: No",
                "ST Depression: 1.2",
                "Slope: 2",
                "Major Vessels: 0",
                "Thalassemia Type: 2",
            ]
        );
        assert_eq!(
            report.verdict_line,
            "Prediction Result: Alex does NOT have heart disease."
        );
        assert_eq!(&report.bytes[0..4], b"%PDF");
    }

    #[test]
    fn layout_uses_fixed_positions() {
        let page = layout(&HEART, &alex_submission(), &negative());
        assert_eq!(page.commands.len(), 2 + 14 + 1);

        assert!(matches!(
            &page.commands[0],
            DrawCommand::Text { x, y, text, weight: FontWeight::Regular }
                if *x == 100.0 && *y == 750.0 && text == "Heart Disease Prediction Report"
        ));
        assert_eq!(
            page.commands[1],
            DrawCommand::Rule { x1: 100.0, x2: 500.0, y: 745.0 }
        );
        assert!(matches!(&page.commands[2], DrawCommand::Text { y, .. } if *y == 720.0));
        assert!(matches!(&page.commands[15], DrawCommand::Text { y, .. } if *y == 460.0));
        // Last field at 460, verdict one blank slot below the next line.
        assert!(matches!(
            &page.commands[16],
            DrawCommand::Text { y, weight: FontWeight::Bold, .. } if *y == 420.0
        ));
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let a = generate(&HEART, &alex_submission(), Some(&negative()))
            .unwrap()
            .unwrap();
        let b = generate(&HEART, &alex_submission(), Some(&negative()))
            .unwrap()
            .unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn trailer_id_is_derived_from_content() {
        let bytes = generate(&HEART, &alex_submission(), Some(&negative()))
            .unwrap()
            .unwrap()
            .bytes;
        let text = String::from_utf8_lossy(&bytes);
        let trailer = &text[text.rfind("trailer").unwrap()..];
        assert!(trailer.contains("/ID"));

        let positive = Verdict {
            kind: VerdictKind::Positive,
            message: "Alex HAS heart disease!".into(),
        };
        let other = generate(&HEART, &alex_submission(), Some(&positive))
            .unwrap()
            .unwrap()
            .bytes;
        assert_ne!(bytes, other);
    }

    #[test]
    fn pin_trailer_id_rewrites_both_strings_in_place() {
        let raw = b"%PDF-1.3\n1 0 obj\n(/ID)\nendobj\ntrailer\n<</Root 1 0 R/ID[(ABCDEFGH)(IJKLMNOP)]>>\n%%EOF";
        let mut a = raw.to_vec();
        let mut b = raw.to_vec();
        b[raw.len() - 14] = b'Z'; // second ID string only
        pin_trailer_id(&mut a).unwrap();
        pin_trailer_id(&mut b).unwrap();

        assert_eq!(a.len(), raw.len());
        assert_eq!(a, b);
        let text = String::from_utf8(a).unwrap();
        assert!(text.contains("(/ID)"));
        assert!(!text.contains("ABCDEFGH"));
        assert!(!text.contains("IJKLMNOP"));
    }

    #[test]
    fn pin_trailer_id_requires_an_id() {
        let mut raw = b"%PDF-1.3\ntrailer\n<</Root 1 0 R>>\n%%EOF".to_vec();
        assert!(matches!(pin_trailer_id(&mut raw), Err(ReportError::Save(_))));
    }

    #[test]
    fn absent_verdict_produces_no_artifact() {
        assert!(generate(&HEART, &alex_submission(), None).unwrap().is_none());
        assert!(generate(&DIABETES_FEMALE, &diabetes_submission(), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unavailable_verdict_produces_no_artifact() {
        let verdict = Verdict::missing_input();
        assert!(generate(&HEART, &alex_submission(), Some(&verdict))
            .unwrap()
            .is_none());
    }

    #[test]
    fn incomplete_submission_produces_no_artifact() {
        let mut submission = alex_submission();
        submission.unset("thal");
        assert!(generate(&HEART, &submission, Some(&negative()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn blank_verdict_text_uses_placeholder() {
        let verdict = Verdict {
            kind: VerdictKind::Positive,
            message: String::new(),
        };
        let report = generate(&HEART, &alex_submission(), Some(&verdict))
            .unwrap()
            .unwrap();
        assert_eq!(report.verdict_line, "Prediction Result: Prediction not available");
    }

    #[test]
    fn diabetes_report_uses_its_own_title_and_filename() {
        let verdict = Verdict {
            kind: VerdictKind::Negative,
            message: "The person does NOT have diabetes.".into(),
        };
        let report = generate(&DIABETES_FEMALE, &diabetes_submission(), Some(&verdict))
            .unwrap()
            .unwrap();
        assert_eq!(report.filename, "Diabetes_Report.pdf");
        assert_eq!(report.field_lines.len(), 8);
        assert_eq!(report.field_lines[0], "Pregnancies: 2");
        assert_eq!(report.field_lines[5], "BMI: 33.6");
        assert_eq!(report.field_lines[6], "Diabetes Pedigree Function: 0.127");
    }
}
