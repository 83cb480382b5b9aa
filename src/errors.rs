/// Errors returned by tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The job identifier did not resolve.
    #[error("job {0} not found")]
    JobNotFound(i64),

    /// The asset identifier did not resolve.
    #[error("asset {0} not found")]
    AssetNotFound(i64),

    /// The customer identifier did not resolve.
    #[error("customer {0} not found")]
    CustomerNotFound(i64),

    /// The asset still has jobs at it and cannot be deleted.
    #[error("asset {0} has jobs currently at it")]
    AssetOccupied(i64),

    /// The job has no open location record, so it cannot be marked
    /// in-progress directly. Moving the job onto an asset is the way to
    /// start progress.
    #[error("job {0} is not at any asset; move it onto one to start progress")]
    NotAtAsset(i64),

    /// An underlying database failure. Transient errors (lock timeouts,
    /// connection loss) surface here; the whole operation rolled back and
    /// can be retried from the beginning.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Coarse error category, for mapping to a response class at the transport
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An identifier did not resolve.
    NotFound,
    /// The operation conflicts with current occupancy.
    Conflict,
    /// The requested transition is not valid.
    Validation,
    /// A store failure unrelated to the request itself.
    Database,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::JobNotFound(_) | Error::AssetNotFound(_) | Error::CustomerNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::AssetOccupied(_) => ErrorKind::Conflict,
            Error::NotAtAsset(_) => ErrorKind::Validation,
            Error::Database(_) => ErrorKind::Database,
        }
    }
}
