/// Errors surfaced to whoever drives the store (the CLI, or a UI layer).
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Please enter the quote text.")]
    MissingText,

    #[error("Please enter a category for the quote.")]
    MissingCategory,

    #[error("Import file is not a JSON array of quotes: {0}")]
    InvalidImport(#[from] serde_json::Error),

    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}
