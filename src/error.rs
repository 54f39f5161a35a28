use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not found")]
    NotFound,

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("status '{status}' does not apply to {domain}")]
    StatusNotApplicable { status: String, domain: String },

    #[error("status {0} is still referenced")]
    StatusInUse(i64),

    #[error("translation already exists for this status and language")]
    DuplicateTranslation,

    #[error("status name '{0}' is already used in this language")]
    DuplicateStatusName(String),

    #[error("package '{0}' already exists")]
    DuplicateName(String),

    #[error("collection '{name}' version '{version}' already exists")]
    DuplicateNameVersion { name: String, version: String },

    #[error("branch '{0}' already exists")]
    DuplicateBranch(String),

    #[error("dist tag '{0}' already exists")]
    DuplicateDistTag(String),

    #[error("package '{package}' is already listed on '{collection}'")]
    DuplicateListing { package: String, collection: String },

    #[error("subject already has a grant set on this listing")]
    DuplicateGrantSet,

    #[error("package '{0}' still has listings")]
    PackageInUse(String),

    #[error("'{0}' matches more than one collection")]
    AmbiguousToken(String),

    #[error("branch '{0}' matches more than one collection")]
    AmbiguousBranch(String),

    #[error("invalid acl: {0}")]
    InvalidAclKind(String),

    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("unsupported representation version {0}")]
    UnsupportedVersion(u32),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns the engine message when `err` is a constraint failure.
pub(crate) fn constraint_message(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(code, msg)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(msg.clone().unwrap_or_else(|| code.to_string()))
        }
        _ => None,
    }
}

/// Maps a constraint failure to the typed error `known` picks for its
/// message, or to `ConstraintViolation` when it picks none.
pub(crate) fn map_constraint<F>(err: rusqlite::Error, known: F) -> Error
where
    F: FnOnce(&str) -> Option<Error>,
{
    match constraint_message(&err) {
        Some(msg) => known(&msg).unwrap_or(Error::ConstraintViolation(msg)),
        None => Error::Database(err),
    }
}

/// Surfaces unclassified constraint failures as `ConstraintViolation`
/// instead of a raw database error.
pub(crate) fn classify(err: rusqlite::Error) -> Error {
    map_constraint(err, |_| None)
}
