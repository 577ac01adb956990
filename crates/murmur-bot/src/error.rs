use thiserror::Error;

/// Structured failure kinds, so handlers can tell a storage failure from a
/// Telegram API failure before both collapse into the generic user notice.
/// Domain-rule rejections (self-message, blocked sender, missing pending
/// target) are not errors; they are ordinary outcomes with specific notices.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("telegram api: {0}")]
    Platform(#[from] teloxide::RequestError),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Runs blocking SQLite work off the async runtime.
pub async fn blocking<T, F>(f: F) -> RelayResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RelayError::Store(anyhow::anyhow!("blocking task join: {e}")))?
        .map_err(RelayError::Store)
}
