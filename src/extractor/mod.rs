//! Metadata retrieval, format normalization and selection

pub mod catalog;
pub mod innertube;
pub mod models;
pub mod selector;
pub mod traits;

pub use catalog::build_catalog;
pub use innertube::{FetcherConfig, InnertubeClient};
pub use models::{FormatDescriptor, SelectionCriteria, VideoMetadata};
pub use selector::FormatSelector;
pub use traits::MetadataSource;
