//! Publish metadata generation.
//!
//! [`MetadataGenerator`] never fails: every piece of text it produces has a
//! canned fallback used when the [`TextGenerator`] errors or returns
//! nothing.

pub mod error;
pub mod generator;
pub mod ollama;
pub mod track;

pub use error::{MetadataError, MetadataResult};
pub use generator::{MetadataGenerator, TextGenerator, DEFAULT_COLLECTION_DESCRIPTION};
pub use ollama::{OllamaClient, OllamaConfig};
pub use track::TrackTitle;
