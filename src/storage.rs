use crate::schema::{Asset, Customer, Job, JobLocation, JobStatus, NewAsset, NewCustomer, NewJob};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

/// Fetches the job row and locks it for the duration of the transaction.
///
/// The lock serializes concurrent movers and status changes of the same job,
/// so every mutation sees the open-location state left by the previous
/// committed one.
pub(crate) async fn lock_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT id, name, description, status, customer_id, created_at, due_date
        FROM jobs
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(job_id)
    .fetch_optional(&mut **tx)
    .await
}

pub(crate) async fn job_exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
) -> Result<bool, sqlx::Error> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT id FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await?
        .is_some())
}

pub(crate) async fn asset_exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: i64,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT id FROM assets WHERE id = $1")
            .bind(asset_id)
            .fetch_optional(&mut **tx)
            .await?
            .is_some(),
    )
}

/// Locks the asset row, returning whether it exists.
///
/// Used by asset deletion so the occupancy check and the delete see the same
/// row.
pub(crate) async fn lock_asset_tx(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: i64,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT id FROM assets WHERE id = $1 FOR UPDATE")
            .bind(asset_id)
            .fetch_optional(&mut **tx)
            .await?
            .is_some(),
    )
}

pub(crate) async fn customer_exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: i64,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT id FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await?
            .is_some(),
    )
}

/// Finds the job's open location record, if any.
pub(crate) async fn find_open_location_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
) -> Result<Option<JobLocation>, sqlx::Error> {
    sqlx::query_as::<_, JobLocation>(
        r"
        SELECT id, job_id, asset_id, arrival_time, departure_time
        FROM job_locations
        WHERE job_id = $1 AND departure_time IS NULL
        ",
    )
    .bind(job_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Closes the job's open location record, if any, by setting its departure
/// time. This is the only mutation location records ever receive.
pub(crate) async fn close_open_location_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
    departed_at: DateTime<Utc>,
) -> Result<Option<JobLocation>, sqlx::Error> {
    sqlx::query_as::<_, JobLocation>(
        r"
        UPDATE job_locations
        SET departure_time = $2
        WHERE job_id = $1 AND departure_time IS NULL
        RETURNING id, job_id, asset_id, arrival_time, departure_time
        ",
    )
    .bind(job_id)
    .bind(departed_at)
    .fetch_optional(&mut **tx)
    .await
}

/// Opens a new location record for the job at the given asset.
pub(crate) async fn insert_location_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
    asset_id: i64,
    arrived_at: DateTime<Utc>,
) -> Result<JobLocation, sqlx::Error> {
    sqlx::query_as::<_, JobLocation>(
        r"
        INSERT INTO job_locations (job_id, asset_id, arrival_time)
        VALUES ($1, $2, $3)
        RETURNING id, job_id, asset_id, arrival_time, departure_time
        ",
    )
    .bind(job_id)
    .bind(asset_id)
    .bind(arrived_at)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn set_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
    status: JobStatus,
) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        UPDATE jobs
        SET status = $2
        WHERE id = $1
        RETURNING id, name, description, status, customer_id, created_at, due_date
        ",
    )
    .bind(job_id)
    .bind(status)
    .fetch_one(&mut **tx)
    .await
}

/// The job's full location history, oldest stay first.
///
/// Arrival times have no sub-second ordering guarantee under rapid moves, so
/// the record id breaks ties in insertion order.
pub(crate) async fn location_history_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
) -> Result<Vec<JobLocation>, sqlx::Error> {
    sqlx::query_as::<_, JobLocation>(
        r"
        SELECT id, job_id, asset_id, arrival_time, departure_time
        FROM job_locations
        WHERE job_id = $1
        ORDER BY arrival_time ASC, id ASC
        ",
    )
    .bind(job_id)
    .fetch_all(&mut **tx)
    .await
}

/// Jobs with an open location record at the given asset.
pub(crate) async fn current_occupants_tx(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: i64,
) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT j.id, j.name, j.description, j.status, j.customer_id, j.created_at, j.due_date
        FROM jobs j
        JOIN job_locations l ON l.job_id = j.id
        WHERE l.asset_id = $1 AND l.departure_time IS NULL
        ORDER BY l.arrival_time ASC, l.id ASC
        ",
    )
    .bind(asset_id)
    .fetch_all(&mut **tx)
    .await
}

pub(crate) async fn open_location_count_tx(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM job_locations WHERE asset_id = $1 AND departure_time IS NULL",
    )
    .bind(asset_id)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn delete_asset_tx(
    tx: &mut Transaction<'_, Postgres>,
    asset_id: i64,
) -> Result<u64, sqlx::Error> {
    Ok(sqlx::query("DELETE FROM assets WHERE id = $1")
        .bind(asset_id)
        .execute(&mut **tx)
        .await?
        .rows_affected())
}

pub(crate) async fn insert_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    new_job: &NewJob,
    created_at: DateTime<Utc>,
) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        INSERT INTO jobs (name, description, customer_id, created_at, due_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, description, status, customer_id, created_at, due_date
        ",
    )
    .bind(&new_job.name)
    .bind(&new_job.description)
    .bind(new_job.customer_id)
    .bind(created_at)
    .bind(new_job.due_date)
    .fetch_one(&mut **tx)
    .await
}

pub(crate) async fn find_job(pool: &PgPool, job_id: i64) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        SELECT id, name, description, status, customer_id, created_at, due_date
        FROM jobs
        WHERE id = $1
        ",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn insert_customer(
    pool: &PgPool,
    new_customer: &NewCustomer,
    created_at: DateTime<Utc>,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r"
        INSERT INTO customers (name, email, phone, address, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, phone, address, created_at
        ",
    )
    .bind(&new_customer.name)
    .bind(&new_customer.email)
    .bind(&new_customer.phone)
    .bind(&new_customer.address)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn insert_asset(
    pool: &PgPool,
    new_asset: &NewAsset,
    created_at: DateTime<Utc>,
) -> Result<Asset, sqlx::Error> {
    sqlx::query_as::<_, Asset>(
        r"
        INSERT INTO assets (name, manufacturer, model, description, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, manufacturer, model, description, created_at
        ",
    )
    .bind(&new_asset.name)
    .bind(&new_asset.manufacturer)
    .bind(&new_asset.model)
    .bind(&new_asset.description)
    .bind(created_at)
    .fetch_one(pool)
    .await
}
