// Application error type and result alias, built on thiserror.
use thiserror::Error;

pub mod response;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    // The #[from] attribute converts sqlx errors automatically at the `?` sites.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
