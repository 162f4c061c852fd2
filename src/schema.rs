//! Feature schemas: one declarative table per disease type.
//!
//! A schema is the single ordering shared by the form widgets, the report
//! lines and the classifier's feature vector. Model fields enter the vector
//! in declared order; a free-text subject field is rendered, validated and
//! reported but never sent to the model.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Disease types
// ═══════════════════════════════════════════════════════════

/// Disease types with a mounted form page and a loaded classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseKind {
    Heart,
    DiabetesFemale,
}

impl DiseaseKind {
    pub const ALL: [DiseaseKind; 2] = [DiseaseKind::Heart, DiseaseKind::DiabetesFemale];

    /// URL segment for this disease (`/heart`, `/heart/predict`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::DiabetesFemale => "diabetes_female",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Heart => "/heart",
            Self::DiabetesFemale => "/diabetes_female",
        }
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        match self {
            Self::Heart => &HEART,
            Self::DiabetesFemale => &DIABETES_FEMALE,
        }
    }
}

impl std::fmt::Display for DiseaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown disease type: {0}")]
pub struct UnknownDisease(pub String);

impl std::str::FromStr for DiseaseKind {
    type Err = UnknownDisease;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiseaseKind::ALL
            .into_iter()
            .find(|d| d.slug() == s)
            .ok_or_else(|| UnknownDisease(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// Field definitions
// ═══════════════════════════════════════════════════════════

/// One choice of a categorical field: the numeric code the model sees and
/// the label shown in the dropdown and the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryOption {
    pub code: i64,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Numeric { step: Option<f64> },
    Categorical { options: &'static [CategoryOption] },
    /// Free text (subject name). Not a model feature.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub kind: ValueKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn numeric(id: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            id,
            label,
            placeholder,
            kind: ValueKind::Numeric { step: None },
            required: true,
        }
    }

    pub const fn stepped(
        id: &'static str,
        label: &'static str,
        placeholder: &'static str,
        step: f64,
    ) -> Self {
        Self {
            id,
            label,
            placeholder,
            kind: ValueKind::Numeric { step: Some(step) },
            required: true,
        }
    }

    pub const fn categorical(
        id: &'static str,
        label: &'static str,
        placeholder: &'static str,
        options: &'static [CategoryOption],
    ) -> Self {
        Self {
            id,
            label,
            placeholder,
            kind: ValueKind::Categorical { options },
            required: true,
        }
    }

    pub const fn text(id: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            id,
            label,
            placeholder,
            kind: ValueKind::Text,
            required: true,
        }
    }

    /// Whether this field occupies a position in the feature vector.
    pub fn feeds_model(&self) -> bool {
        !matches!(self.kind, ValueKind::Text)
    }

    /// Option label for a categorical code, if the code is declared.
    pub fn option_label(&self, code: f64) -> Option<&'static str> {
        match self.kind {
            ValueKind::Categorical { options } => options
                .iter()
                .find(|o| o.code as f64 == code)
                .map(|o| o.label),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Schema
// ═══════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct FeatureSchema {
    pub disease: DiseaseKind,
    /// Form heading and landing-card title.
    pub title: &'static str,
    /// Lower-case name used in verdict messages ("heart disease").
    pub disease_name: &'static str,
    pub report_title: &'static str,
    pub report_filename: &'static str,
    /// Artifact file stem under the models directory.
    pub model_stem: &'static str,
    pub fields: &'static [FieldSpec],
}

impl FeatureSchema {
    pub fn field(&self, id: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Model fields in vector order.
    pub fn model_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.feeds_model())
    }

    pub fn feature_count(&self) -> usize {
        self.model_fields().count()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.model_fields().map(|f| f.id).collect()
    }

    /// Free-text field naming the person the prediction is about.
    pub fn subject_field(&self) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| matches!(f.kind, ValueKind::Text))
    }
}

const SEX_OPTIONS: &[CategoryOption] = &[
    CategoryOption { code: 1, label: "Male" },
    CategoryOption { code: 0, label: "Female" },
];

const FASTING_SUGAR_OPTIONS: &[CategoryOption] = &[
    CategoryOption { code: 1, label: "High" },
    CategoryOption { code: 0, label: "Normal" },
];

const YES_NO_OPTIONS: &[CategoryOption] = &[
    CategoryOption { code: 1, label: "Yes" },
    CategoryOption { code: 0, label: "No" },
];

// Model order: age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang,
// oldpeak, slope, ca, thal. `name` is display-only.
static HEART_FIELDS: [FieldSpec; 14] = [
    FieldSpec::text("name", "Name", "Name"),
    FieldSpec::numeric("age", "Age", "Age"),
    FieldSpec::categorical("sex", "Sex", "Sex", SEX_OPTIONS),
    FieldSpec::numeric("cp", "Chest Pain Type", "Chest Pain Type"),
    FieldSpec::numeric("trestbps", "Resting Blood Pressure", "Resting Blood Pressure"),
    FieldSpec::numeric("chol", "Cholesterol", "Cholesterol"),
    FieldSpec::categorical(
        "fbs",
        "Fasting Blood Sugar",
        "Fasting Blood Sugar > 120 mg/dl",
        FASTING_SUGAR_OPTIONS,
    ),
    FieldSpec::numeric("restecg", "Resting ECG", "Resting ECG"),
    FieldSpec::numeric("thalach", "Max Heart Rate", "Max Heart Rate"),
    FieldSpec::categorical(
        "exang",
        "Exercise Induced Angina",
        "Exercise Induced Angina",
        YES_NO_OPTIONS,
    ),
    FieldSpec::stepped("oldpeak", "ST Depression", "ST Depression", 0.1),
    FieldSpec::numeric("slope", "Slope", "Slope"),
    FieldSpec::numeric("ca", "Major Vessels", "Number of Major Vessels"),
    FieldSpec::numeric("thal", "Thalassemia Type", "Thalassemia Type"),
];

pub static HEART: FeatureSchema = FeatureSchema {
    disease: DiseaseKind::Heart,
    title: "Heart Disease Prediction",
    disease_name: "heart disease",
    report_title: "Heart Disease Prediction Report",
    report_filename: "Heart_Disease_Report.pdf",
    model_stem: "heart_disease_model",
    fields: &HEART_FIELDS,
};

static DIABETES_FEMALE_FIELDS: [FieldSpec; 8] = [
    FieldSpec::numeric("pregnancies", "Pregnancies", "Number of Pregnancies"),
    FieldSpec::numeric("glucose", "Glucose Level", "Glucose Level"),
    FieldSpec::numeric("bloodpressure", "Blood Pressure", "Blood Pressure"),
    FieldSpec::numeric("skinthickness", "Skin Thickness", "Skin Thickness"),
    FieldSpec::numeric("insulin", "Insulin Level", "Insulin Level"),
    FieldSpec::stepped("bmi", "BMI", "BMI", 0.1),
    FieldSpec::stepped("dpf", "Diabetes Pedigree Function", "Diabetes Pedigree Function", 0.01),
    FieldSpec::numeric("age", "Age", "Age"),
];

pub static DIABETES_FEMALE: FeatureSchema = FeatureSchema {
    disease: DiseaseKind::DiabetesFemale,
    title: "Diabetes Prediction (Female)",
    disease_name: "diabetes",
    report_title: "Diabetes Prediction Report",
    report_filename: "Diabetes_Report.pdf",
    model_stem: "diabetes_model",
    fields: &DIABETES_FEMALE_FIELDS,
};

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
