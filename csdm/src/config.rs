//! Options for reading and writing documents.
//!
//! Both option sets can be deserialized, so a host application can keep them in its own
//! configuration file. Missing fields take their default values.
//!
use std::sync::Arc;

use serde::Deserialize;

use crate::resolver::Resolver;

/// How a document is read.
///
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Keep application metadata. When false, the `application` objects of the dataset, its
    /// dimensions and its dependent variables are dropped.
    pub application: bool,

    /// Reorder linear dimensions stored in FFT output order (`complex_fft`) so their
    /// coordinates ascend, rolling the components to match.
    pub sort_fft_order: bool,

    /// Fetches external components
    #[serde(skip)]
    pub resolver: Arc<Resolver>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            application: false,
            sort_fft_order: false,
            resolver: Arc::new(Resolver::new()),
        }
    }
}

impl LoadOptions {
    pub fn with_resolver(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }
}

/// How a document is written.
///
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Mark the document read only
    pub read_only: bool,

    /// Format version written to the document
    pub version: String,

    /// Stamp the document with the current UTC time
    pub timestamp: bool,

    /// Pretty print with two space indentation
    pub indent: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            version: "1.0".to_string(),
            timestamp: true,
            indent: true,
        }
    }
}
