use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Structured error kinds a caller can match on. The CLI wraps these in
/// `anyhow::Error` with additional context at the file/asset boundary.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene validation failed: {0}")]
    InvalidScene(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("asset '{name}' could not be loaded: {source}")]
    AssetLoad {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("render document references unknown node '{0}'")]
    UnknownNode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
