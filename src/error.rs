pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("engine {operation} failed")]
    Engine {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to decode artifact")]
    Artifact(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("invalid rotation {0}, must be a multiple of 90 degrees")]
    InvalidRotation(i32),
    #[error("invalid pixel per pt {0}, should be a positive number")]
    InvalidPixelPerPt(f64),
    #[error("invalid background color {0:?}, expected ^#[0-9a-f]{{6}}$")]
    InvalidBackgroundColor(String),
    #[error("no page found in session")]
    NoPageFound,
    #[error("deprecated format {0}, please use vector format")]
    DeprecatedFormat(String),
    #[error("use of moved value: render session was already freed")]
    SessionReleased,
    #[error("canvas context is unavailable for page {page}")]
    MissingCanvasContext { page: usize },
    #[error("canvas wrapper is missing for page {page}, canvas list length {canvas_count}")]
    LayoutDesync { page: usize, canvas_count: usize },
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl AppError {
    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn engine(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Engine {
            operation,
            source: Box::new(source),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// True for errors raised before the pipeline touches the host or the engine.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRotation(_)
                | Self::InvalidPixelPerPt(_)
                | Self::InvalidBackgroundColor(_)
                | Self::NoPageFound
                | Self::DeprecatedFormat(_)
        )
    }
}
