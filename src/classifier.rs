//! Classifier artifacts and the per-disease model registry.
//!
//! Every model is a black box behind the `Classifier` trait: one ordered
//! feature vector in, one binary label out. Two artifact formats load from
//! the models directory:
//! - `<stem>.json`: logistic regression coefficients with optional
//!   standardization (always available)
//! - `<stem>.onnx`: any ONNX binary classifier, behind the `onnx` feature
//!
//! Artifacts are loaded once at startup. A missing or malformed artifact is
//! fatal; the server never starts with a partial registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use crate::schema::{DiseaseKind, FeatureSchema};
use crate::submission::FeatureVector;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model artifact not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Model artifact is malformed: {0}")]
    Malformed(String),

    #[error("Model initialization: {0}")]
    ModelInit(String),

    #[error("Feature count mismatch: model expects {expected}, schema provides {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Feature order mismatch at position {position}: model has '{model}', schema has '{schema}'")]
    FeatureOrder {
        position: usize,
        model: String,
        schema: String,
    },

    #[error("Classifier returned a non-binary label: {0}")]
    InvalidLabel(i64),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Binary classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Negative,
    Positive,
}

impl TryFrom<i64> for Label {
    type Error = ClassifierError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(ClassifierError::InvalidLabel(other)),
        }
    }
}

/// A pre-trained binary classifier. Called with exactly one row.
pub trait Classifier: Send + Sync {
    /// Length of the vector the model was trained on.
    fn feature_count(&self) -> usize;

    /// Feature names in training order, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn predict(&self, features: &FeatureVector) -> Result<Label, ClassifierError>;
}

fn check_width(expected: usize, features: &FeatureVector) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::FeatureCount {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Logistic regression artifact (JSON)
// ═══════════════════════════════════════════════════════════

fn default_threshold() -> f64 {
    0.5
}

/// Logistic regression exported as JSON.
///
/// `p = sigmoid(intercept + Σ coef_i · (x_i − mean_i) / scale_i)`; the label
/// is positive when `p >= threshold`. Scaler arrays are optional and default
/// to the identity transform.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler_mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scaler_scale: Option<Vec<f64>>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let model = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            features = model.coefficients.len(),
            "Logistic model loaded"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let model: Self =
            serde_json::from_str(raw).map_err(|e| ClassifierError::Malformed(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        let n = self.coefficients.len();
        if n == 0 {
            return Err(ClassifierError::Malformed("no coefficients".into()));
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != n {
            return Err(ClassifierError::Malformed(format!(
                "{} feature names for {n} coefficients",
                self.feature_names.len()
            )));
        }
        for (name, arr) in [("scaler_mean", &self.scaler_mean), ("scaler_scale", &self.scaler_scale)] {
            if let Some(values) = arr {
                if values.len() != n {
                    return Err(ClassifierError::Malformed(format!(
                        "{name} has {} entries, expected {n}",
                        values.len()
                    )));
                }
            }
        }
        if let Some(scale) = &self.scaler_scale {
            if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ClassifierError::Malformed(
                    "scaler_scale entries must be finite and non-zero".into(),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ClassifierError::Malformed(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Positive-class probability for one row.
    pub fn probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        check_width(self.coefficients.len(), features)?;

        let z = features
            .as_slice()
            .iter()
            .enumerate()
            .fold(self.intercept, |acc, (i, x)| {
                let mean = self.scaler_mean.as_ref().map_or(0.0, |m| m[i]);
                let scale = self.scaler_scale.as_ref().map_or(1.0, |s| s[i]);
                acc + self.coefficients[i] * (x - mean) / scale
            });

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LogisticModel {
    fn feature_count(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        (!self.feature_names.is_empty()).then_some(self.feature_names.as_slice())
    }

    fn predict(&self, features: &FeatureVector) -> Result<Label, ClassifierError> {
        let p = self.probability(features)?;
        Ok(if p >= self.threshold {
            Label::Positive
        } else {
            Label::Negative
        })
    }
}

// ═══════════════════════════════════════════════════════════
// ONNX classifier (`onnx` feature)
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx")]
mod onnx {
    use super::{check_width, Classifier, ClassifierError, FeatureVector, Label};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// ONNX binary classifier (e.g. an sklearn pipeline exported with
    /// skl2onnx). Input `[1, F]` float32; first output is the int64 label.
    ///
    /// `ort::Session::run` takes `&mut self`, hence the Mutex.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
        feature_count: usize,
    }

    impl OnnxClassifier {
        pub fn load(path: &Path, feature_count: usize) -> Result<Self, ClassifierError> {
            if !path.exists() {
                return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .with_intra_threads(1)
                .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
                .commit_from_file(path)
                .map_err(|e: ort::Error| ClassifierError::ModelInit(format!("ONNX load failed: {e}")))?;

            tracing::info!(path = %path.display(), "ONNX classifier loaded");

            Ok(Self {
                session: Mutex::new(session),
                feature_count,
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn feature_count(&self) -> usize {
            self.feature_count
        }

        fn predict(&self, features: &FeatureVector) -> Result<Label, ClassifierError> {
            use ort::value::TensorRef;

            check_width(self.feature_count, features)?;

            let row: Vec<f32> = features.as_slice().iter().map(|&x| x as f32).collect();
            let input = ndarray::Array2::from_shape_vec((1, self.feature_count), row)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            let tensor = TensorRef::from_array_view(&input)
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

            let (_shape, labels) = outputs[0]
                .try_extract_tensor::<i64>()
                .map_err(|e| ClassifierError::Inference(format!("Output extraction: {e}")))?;

            let label = labels
                .first()
                .copied()
                .ok_or_else(|| ClassifierError::Inference("empty label output".into()))?;

            Label::try_from(label)
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

// ═══════════════════════════════════════════════════════════
// Fixed classifier
// ═══════════════════════════════════════════════════════════

/// Always returns the same raw label and records every call.
pub struct FixedClassifier {
    feature_count: usize,
    label: i64,
    calls: AtomicUsize,
    last_input: Mutex<Option<Vec<f64>>>,
}

impl FixedClassifier {
    pub fn new(feature_count: usize, label: i64) -> Self {
        Self {
            feature_count,
            label,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<Vec<f64>> {
        self.last_input.lock().ok().and_then(|g| g.clone())
    }
}

impl Classifier for FixedClassifier {
    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict(&self, features: &FeatureVector) -> Result<Label, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = Some(features.as_slice().to_vec());
        }
        check_width(self.feature_count, features)?;
        Label::try_from(self.label)
    }
}

// ═══════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════

/// One loaded classifier per disease type. Read-only after startup.
#[derive(Default, Clone)]
pub struct ModelRegistry {
    classifiers: HashMap<DiseaseKind, Arc<dyn Classifier>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the artifact for every disease type from `models_dir`.
    pub fn load_all(models_dir: &Path) -> Result<Self, ClassifierError> {
        let mut registry = Self::new();
        for disease in DiseaseKind::ALL {
            let schema = disease.schema();
            let classifier = load_classifier(models_dir, schema)?;
            registry.insert(schema, classifier)?;
        }
        tracing::info!(
            models = registry.classifiers.len(),
            dir = %models_dir.display(),
            "Model registry ready"
        );
        Ok(registry)
    }

    /// Register a classifier after checking it against the schema's vector.
    pub fn insert(
        &mut self,
        schema: &FeatureSchema,
        classifier: Arc<dyn Classifier>,
    ) -> Result<(), ClassifierError> {
        check_against_schema(schema, classifier.as_ref())?;
        self.classifiers.insert(schema.disease, classifier);
        Ok(())
    }

    pub fn get(&self, disease: DiseaseKind) -> Option<Arc<dyn Classifier>> {
        self.classifiers.get(&disease).cloned()
    }

    /// Registered disease types in declaration order.
    pub fn diseases(&self) -> Vec<DiseaseKind> {
        DiseaseKind::ALL
            .into_iter()
            .filter(|d| self.classifiers.contains_key(d))
            .collect()
    }
}

fn check_against_schema(
    schema: &FeatureSchema,
    classifier: &dyn Classifier,
) -> Result<(), ClassifierError> {
    let expected = classifier.feature_count();
    let actual = schema.feature_count();
    if expected != actual {
        return Err(ClassifierError::FeatureCount { expected, actual });
    }
    if let Some(names) = classifier.feature_names() {
        for (position, (model, field)) in names.iter().zip(schema.model_fields()).enumerate() {
            if model != field.id {
                return Err(ClassifierError::FeatureOrder {
                    position,
                    model: model.clone(),
                    schema: field.id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Resolve and load the artifact for one schema.
///
/// With the `onnx` feature, `<stem>.onnx` wins when present; otherwise
/// `<stem>.json` is required.
pub fn load_classifier(
    models_dir: &Path,
    schema: &FeatureSchema,
) -> Result<Arc<dyn Classifier>, ClassifierError> {
    #[cfg(feature = "onnx")]
    {
        let onnx_path = models_dir.join(format!("{}.onnx", schema.model_stem));
        if onnx_path.exists() {
            let model = OnnxClassifier::load(&onnx_path, schema.feature_count())?;
            return Ok(Arc::new(model));
        }
    }

    let json_path = models_dir.join(format!("{}.json", schema.model_stem));
    let model = LogisticModel::load(&json_path)?;
    Ok(Arc::new(model))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
