use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tavla_core::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No account named '{0}'. Run `tavla account add` first.")]
    AccountNotFound(String),
    #[error("No user matching '{0}' for this account. Sync first to pull users.")]
    UserNotFound(String),
    #[error("No label matching '{0}' on this board.")]
    LabelNotFound(String),
    #[error("Invalid due date '{0}'. Use RFC 3339, e.g. 2026-03-01T12:00:00+00:00")]
    InvalidDueDate(String),
    #[error("Could not determine a data directory for the local database")]
    NoDataDir,
}
