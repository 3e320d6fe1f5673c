use nba_api::client::ApiError;
use nba_api::pbp::PayloadError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Every failure the pipeline can hit, split by [`PipelineError::is_transient`]
/// into "skip this item" and "stop the run".
#[derive(Debug)]
pub enum PipelineError {
    // Expected-transient: one item contributes nothing, the batch continues.
    Api(ApiError),
    Payload(PayloadError),
    Decode(serde_json::Error, String),
    Deadline(Duration),
    MissingArtifact(PathBuf),
    /// A transient failure while normalizing an already cached raw payload.
    PostProcessing(Box<PipelineError>),
    // Unclassified: these end the run.
    Io(std::io::Error, PathBuf),
    Table(String),
    Config(String),
    Aborted {
        key: String,
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Api(_)
                | PipelineError::Payload(_)
                | PipelineError::Decode(_, _)
                | PipelineError::Deadline(_)
                | PipelineError::MissingArtifact(_)
                | PipelineError::PostProcessing(_)
        )
    }

    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |e| PipelineError::Io(e, path)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Api(_) => f.write_str("request failed"),
            PipelineError::Payload(_) => f.write_str("malformed payload"),
            PipelineError::Decode(_, what) => write!(f, "could not decode {what}"),
            PipelineError::Deadline(d) => write!(f, "item exceeded deadline of {d:?}"),
            PipelineError::MissingArtifact(path) => {
                write!(f, "cached artifact not found: {}", path.display())
            }
            PipelineError::PostProcessing(_) => f.write_str("post-processing failed"),
            PipelineError::Io(_, path) => write!(f, "I/O error at {}", path.display()),
            PipelineError::Table(msg) => write!(f, "table error: {msg}"),
            PipelineError::Config(msg) => write!(f, "configuration error: {msg}"),
            PipelineError::Aborted { key, .. } => write!(f, "batch aborted at {key}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Api(e) => Some(e),
            PipelineError::Payload(e) => Some(e),
            PipelineError::Decode(e, _) => Some(e),
            PipelineError::Io(e, _) => Some(e),
            PipelineError::PostProcessing(inner) => Some(inner.as_ref()),
            PipelineError::Aborted { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<ApiError> for PipelineError {
    fn from(e: ApiError) -> Self {
        PipelineError::Api(e)
    }
}

impl From<PayloadError> for PipelineError {
    fn from(e: PayloadError) -> Self {
        PipelineError::Payload(e)
    }
}

impl From<parquet::errors::ParquetError> for PipelineError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        PipelineError::Table(e.to_string())
    }
}

impl From<arrow_schema::ArrowError> for PipelineError {
    fn from(e: arrow_schema::ArrowError) -> Self {
        PipelineError::Table(e.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Table(e.to_string())
    }
}

/// Render an error with its whole `source()` chain, for per-item log lines.
/// Each `Display` names only its own layer, so every cause appears once.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}
