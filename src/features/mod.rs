pub mod extractor;
pub mod feature_set;
pub mod length;
pub mod readability;
pub mod registry;
pub mod stats;
pub mod syntactic;
pub mod tokenize;
pub mod word;

pub use extractor::{FeatureCategory, FeatureColumn, FeatureExtractor};
pub use feature_set::{Feature, FeatureSet};
pub use registry::ExtractorRegistry;
pub use stats::{Bin, Describe};
