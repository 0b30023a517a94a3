pub type MockweaveResult<T> = Result<T, MockweaveError>;

#[derive(thiserror::Error, Debug)]
pub enum MockweaveError {
    #[error("load error: {0}")]
    Load(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MockweaveError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
