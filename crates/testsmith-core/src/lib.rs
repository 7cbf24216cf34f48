//! Deterministic API test-case generation.
//!
//! Turns an OpenAPI description into an ordered list of structured test-case
//! records, grouped by component and test category. The rule-based engine is
//! the source of truth; an optional AI pass may enrich individual records but
//! can never change their identity or shape.
//!
//! # Modules
//!
//! ## Generation core
//! - [`catalog`]: Loads an OpenAPI document into a normalized, ordered operation catalog
//! - [`classifier`]: Path-segment heuristics assigning operations to components
//! - [`policy`]: Test categories, sub-tests, priorities, profiles, and the shared policy store
//! - [`synthesizer`]: Rule-based test-case synthesis per (operation, category, sub-test)
//! - [`augmenter`]: Optional AI enrichment through the [`augmenter::TextGenerator`] capability
//! - [`reporter`]: Coverage statistics over a generation result
//!
//! ## Supporting analysis
//! - [`relationships`]: CRUD groups and resource-family sequences for workflow tests
//! - [`plan`]: Shape validation and insight extraction for externally written test plans
//! - [`pipeline`]: Policy snapshot, then synthesis, then augmentation, then report, in one call

pub mod augmenter;
pub mod catalog;
pub mod classifier;
pub mod pipeline;
pub mod plan;
pub mod policy;
pub mod relationships;
pub mod reporter;
pub mod synthesizer;
pub mod testcase;

pub use catalog::{Catalog, CatalogError, HttpMethod, Operation, Parameter};
pub use classifier::{classify, Component};
pub use pipeline::{GenerateError, GenerationRun, TestGenerator};
pub use policy::{Category, PolicyError, PolicyStore, Priority, SubTestId, TestPolicy};
pub use reporter::{summarize, CoverageStats};
pub use synthesizer::{synthesize, synthesize_parallel, GenerationResult, SkipReason};
pub use testcase::{Origin, TestCase};
