pub mod classifier;
pub mod config;
pub mod explain;
pub mod features;
pub mod intent;
pub mod pipeline;
pub mod trust;

pub use classifier::{Classifier, ClassifierResult, ModelArtifact, ModelHandle};
pub use config::Config;
pub use features::{FeatureExtractor, FeatureVector};
pub use pipeline::{Pipeline, Verdict};
pub use trust::TrustGate;
