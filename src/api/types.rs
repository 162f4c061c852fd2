//! Shared state for the HTTP layer.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::classifier::{Classifier, ModelRegistry};
use crate::schema::{DiseaseKind, FeatureSchema};

/// Shared context for all routes. Read-only after startup.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<ModelRegistry>,
    pub debug: bool,
}

impl AppContext {
    pub fn new(registry: ModelRegistry, debug: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            debug,
        }
    }

    /// Resolve a disease slug from the URL to its schema.
    pub fn schema(&self, slug: &str) -> Result<&'static FeatureSchema, ApiError> {
        slug.parse::<DiseaseKind>()
            .map(|d| d.schema())
            .map_err(|e| ApiError::NotFound(e.to_string()))
    }

    pub fn classifier(&self, disease: DiseaseKind) -> Result<Arc<dyn Classifier>, ApiError> {
        self.registry
            .get(disease)
            .ok_or_else(|| ApiError::Internal(format!("No classifier loaded for {disease}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixed_registry;

    #[test]
    fn schema_resolves_known_slugs() {
        let ctx = AppContext::new(fixed_registry(0), false);
        assert_eq!(ctx.schema("heart").unwrap().disease, DiseaseKind::Heart);
        assert_eq!(
            ctx.schema("diabetes_female").unwrap().report_filename,
            "Diabetes_Report.pdf"
        );
        assert!(matches!(ctx.schema("parkinsons"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn missing_classifier_is_internal() {
        let ctx = AppContext::new(ModelRegistry::new(), false);
        assert!(matches!(
            ctx.classifier(DiseaseKind::Heart),
            Err(ApiError::Internal(_))
        ));
        let ctx = AppContext::new(fixed_registry(1), false);
        assert_eq!(ctx.classifier(DiseaseKind::Heart).unwrap().feature_count(), 13);
    }
}
