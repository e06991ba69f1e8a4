use std::io;
use std::result;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required key is missing, a value has the wrong JSON type, or a `type` discriminator is
    /// unknown.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("missing required key `{key}` in {context}")]
    MissingKey { key: String, context: String },

    /// Component length disagrees with the product of dimension counts, or a component count
    /// disagrees with the quantity type.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("incompatible units: `{left}` and `{right}`")]
    UnitIncompatibility { left: String, right: String },

    #[error("unable to parse unit or quantity: {0}")]
    UnitParse(String),

    /// Fetching an external payload failed. The dependent variable is left unloaded and a
    /// later access will try again.
    #[error("unable to read external resource `{url}`: {source}")]
    ExternalResource {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("invalid value: {0}")]
    Value(String),

    #[error("index error: {0}")]
    Index(String),

    #[error(transparent)]
    IO(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing(key: &str, context: &str) -> Self {
        Self::MissingKey {
            key: key.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

pub type Result<T> = result::Result<T, Error>;
