use confess_types::models::VoteKind;
use thiserror::Error;

/// Failure taxonomy for every store operation. Handlers map these to
/// HTTP statuses in one place; nothing is retried or swallowed here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("already submitted a confession today")]
    AlreadySubmittedToday,

    #[error("you have already {}d this confession", .0.as_str())]
    DuplicateVote(VoteKind),

    #[error("only the admin may perform this action")]
    Unauthorized,

    #[error("confession not found")]
    NotFound,

    #[error("{0}")]
    InvalidInput(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            // A vote referencing a confession that does not exist trips
            // the foreign key; surface it as the missing-row case.
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                return StoreError::NotFound;
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}

/// True when the error is a unique-index violation. The vote ledger's
/// partial unique index turns a lost race into this instead of a
/// second row.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
