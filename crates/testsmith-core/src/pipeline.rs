//! One-call generation: policy snapshot, synthesis, optional augmentation, report.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::augmenter::{AugmentReport, Augmenter};
use crate::catalog::{load_catalog, Catalog, CatalogError};
use crate::plan::PlanInsights;
use crate::policy::{PolicyError, PolicyStore, TestPolicy};
use crate::reporter::{summarize, CoverageStats};
use crate::synthesizer::{GenerationResult, Synthesizer};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything produced by one generation call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRun {
    /// Policy the run was generated under. Later profile switches do not affect it.
    #[serde(skip)]
    pub policy: Arc<TestPolicy>,
    pub profile: Option<String>,
    pub result: GenerationResult,
    pub stats: CoverageStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub augmentation: Option<AugmentReport>,
}

/// Entry point that ties the pieces together around a shared [`PolicyStore`].
#[derive(Debug, Clone)]
pub struct TestGenerator {
    store: Arc<PolicyStore>,
    augmenter: Option<Augmenter>,
    insights: Option<PlanInsights>,
    workers: usize,
}

impl TestGenerator {
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self {
            store,
            augmenter: None,
            insights: None,
            workers: 1,
        }
    }

    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    pub fn with_insights(mut self, insights: PlanInsights) -> Self {
        self.insights = Some(insights);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    /// Generate under the store's current policy.
    pub async fn generate(&self, catalog: &Catalog) -> GenerationRun {
        let policy = self.store.snapshot().await;
        self.run(policy, catalog).await
    }

    /// Generate under `profile` applied to the current policy, without
    /// switching the store.
    pub async fn generate_with_profile(
        &self,
        catalog: &Catalog,
        profile: &str,
    ) -> Result<GenerationRun, GenerateError> {
        let policy = Arc::new(self.store.snapshot().await.apply_profile(profile)?);
        Ok(self.run(policy, catalog).await)
    }

    /// Load an OpenAPI document and generate under the current policy.
    pub async fn generate_from_file(&self, path: &Path) -> Result<GenerationRun, GenerateError> {
        let catalog = load_catalog(path)?;
        Ok(self.generate(&catalog).await)
    }

    async fn run(&self, policy: Arc<TestPolicy>, catalog: &Catalog) -> GenerationRun {
        info!(
            title = catalog.info.title.as_deref().unwrap_or("untitled"),
            operations = catalog.len(),
            profile = policy.current_profile.as_deref().unwrap_or("individual"),
            "Generating test cases"
        );

        let mut synthesizer = Synthesizer::new(&catalog.operations, &policy).workers(self.workers);
        if let Some(insights) = &self.insights {
            synthesizer = synthesizer.with_insights(insights);
        }
        let mut result: GenerationResult = synthesizer.run();

        let mut augmentation = None;
        if let Some(augmenter) = &self.augmenter {
            let (augmented, report) = augmenter.augment_all(result, catalog).await;
            result = augmented;
            augmentation = Some(report);
        }

        let stats = summarize(&result);
        GenerationRun {
            profile: policy.current_profile.clone(),
            policy,
            result,
            stats,
            augmentation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_catalog_str;
    use crate::policy::Category;

    const SPEC: &str = r#"
openapi: 3.0.0
info: {title: Orders, version: "1.0"}
paths:
  /orders:
    get:
      responses: {"200": {description: ok}}
    post:
      responses: {"201": {description: created}}
  /orders/{id}:
    delete:
      parameters:
        - {name: id, in: path, required: true, schema: {type: integer}}
      responses: {"204": {description: gone}}
"#;

    #[tokio::test]
    async fn test_generate_uses_snapshot() {
        let catalog = parse_catalog_str(SPEC).unwrap();
        let generator = TestGenerator::new(Arc::new(PolicyStore::default()));

        let run = generator.generate(&catalog).await;
        assert_eq!(run.profile.as_deref(), Some("standard"));
        assert_eq!(run.stats.total, run.result.len());
        assert_eq!(run.stats.operations_covered, 3);
        assert!(run.augmentation.is_none());

        generator.store().switch_profile("quick").await.unwrap();
        assert!(run.policy.enabled_categories().contains(&Category::ErrorHandling));
        let quick = generator.generate(&catalog).await;
        assert!(quick.result.len() < run.result.len());
    }

    #[tokio::test]
    async fn test_generate_with_profile_leaves_store() {
        let catalog = parse_catalog_str(SPEC).unwrap();
        let generator = TestGenerator::new(Arc::new(PolicyStore::default())).workers(4);

        let run = generator
            .generate_with_profile(&catalog, "security")
            .await
            .unwrap();
        assert!(run
            .result
            .test_cases
            .iter()
            .all(|c| c.category != Category::Functional));
        assert_eq!(
            generator.store().snapshot().await.current_profile.as_deref(),
            Some("standard")
        );

        let err = generator
            .generate_with_profile(&catalog, "nope")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Policy(PolicyError::ProfileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_disabled_augmenter_reports_fallbacks() {
        let catalog = parse_catalog_str(SPEC).unwrap();
        let store = Arc::new(PolicyStore::default());
        let plain = TestGenerator::new(Arc::clone(&store)).generate(&catalog).await;
        let run = TestGenerator::new(store)
            .with_augmenter(Augmenter::disabled())
            .generate(&catalog)
            .await;

        let report = run.augmentation.unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.fallbacks, run.result.len());
        assert_eq!(run.result, plain.result);
    }
}
