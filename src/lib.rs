//! Core library entry point.
//!
//! Classifies brain MRI scans and explains each prediction with a class
//! activation map blended over the scan. The stages are exposed separately
//! ([`normalize`], [`cam`], [`overlay`]) and chained by [`pipeline::scan`].

pub mod api;
pub mod cam;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod normalize;
pub mod overlay;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod store;
#[cfg(feature = "cli")]
pub mod telemetry;

pub use api::{Diagnosis, TumorClass};
pub use cam::{CamError, RelevanceMap, class_activation_map};
#[cfg(feature = "cli")]
pub use cli::TumorcamArgs;
pub use config::{InputSize, OverlayConfig};
pub use normalize::{NormalizedImage, normalize};
pub use overlay::compose_overlay;
pub use pipeline::{ScanError, ScanReport, scan};
pub use providers::{Extraction, FeatureExtractor, InferenceError, ModelHandle};
pub use store::{NewResult, ResultStore, StoreError, StoredResult};

pub mod tests;
