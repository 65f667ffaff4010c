use sea_orm::DbErr;

/// Error type returned by every repository operation.
///
/// Store failures pass through verbatim in `Db`; the remaining variants
/// are fail-fast guards this layer adds on top of the store. A
/// single-row lookup that matches nothing is `Ok(None)`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("invalid association payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("no association named `{field}` on `{table}`")]
    UnknownAssociation { table: String, field: String },

    #[error("primary key not set on the given row")]
    PrimaryKeyNotSet,

    #[error("refusing an unfiltered mass write against `{0}`")]
    UnfilteredWrite(String),
}

/// Result type alias for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
