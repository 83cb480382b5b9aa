#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod errors;
/// Database schema definitions.
pub mod schema;
mod storage;
mod tracker;

/// Injectable time source for tracker operations.
pub use self::clock::{Clock, SystemClock};
/// Error types for tracker operations.
pub use self::errors::{Error, ErrorKind};
/// Commonly used row types.
pub use self::schema::{Job, JobLocation, JobStatus, Principal};
/// The job location tracker.
pub use self::tracker::Tracker;

/// Run the database migrations, creating the tracker's tables and indexes
/// if they do not exist yet.
pub async fn setup_database(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
