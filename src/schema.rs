//! Database schema definitions for SQLx.
//!
//! This module contains the row types and payloads for the job location
//! tracking system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a job.
///
/// A job is `InProgress` exactly while it has an open location record; the
/// other two statuses imply the job is not at any asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Not yet started, or reset; the job is not at any asset.
    Pending,
    /// Currently at an asset.
    InProgress,
    /// Finished; the job is not at any asset.
    Complete,
}

/// A customer job moving through the shop.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    /// Unique identifier for the job
    pub id: i64,
    /// Human-readable job name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Current lifecycle status
    pub status: JobStatus,
    /// The customer this job belongs to (immutable after creation)
    pub customer_id: i64,
    /// Timestamp when the job was created
    pub created_at: DateTime<Utc>,
    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// One stay of a job at an asset.
///
/// Records are append-only: a record is created when the job arrives, and its
/// `departure_time` is set exactly once when the job leaves. A record with no
/// departure time is *open* and represents the job's current location.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobLocation {
    /// Unique identifier for the location record
    pub id: i64,
    /// The job this stay belongs to
    pub job_id: i64,
    /// The asset the job was at
    pub asset_id: i64,
    /// When the job arrived at the asset
    pub arrival_time: DateTime<Utc>,
    /// When the job left; `None` while the job is still there
    pub departure_time: Option<DateTime<Utc>>,
}

impl JobLocation {
    /// Whether this record represents the job's current presence.
    pub fn is_open(&self) -> bool {
        self.departure_time.is_none()
    }
}

/// A physical asset jobs move between (machine, bench, bay).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    /// Unique identifier for the asset
    pub id: i64,
    /// Human-readable asset name
    pub name: String,
    /// Manufacturer, if known
    pub manufacturer: Option<String>,
    /// Model, if known
    pub model: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Timestamp when the asset was created
    pub created_at: DateTime<Utc>,
}

/// A customer that jobs are performed for.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    /// Unique identifier for the customer
    pub id: i64,
    /// Customer name
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Timestamp when the customer was created
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Human-readable job name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// The customer the job belongs to; must exist
    pub customer_id: i64,
    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Payload for creating an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAsset {
    /// Human-readable asset name
    pub name: String,
    /// Manufacturer, if known
    pub manufacturer: Option<String>,
    /// Model, if known
    pub model: Option<String>,
    /// Free-form description
    pub description: Option<String>,
}

/// Payload for creating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Customer name
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

/// The authenticated caller of an operation.
///
/// Authentication itself happens upstream; the tracker only uses this for
/// attribution in its instrumentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Unique identifier of the user
    pub id: i64,
    /// Username, recorded on every mutating operation
    pub username: String,
}
