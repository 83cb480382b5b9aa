use crate::clock::{Clock, SystemClock};
use crate::errors::Error;
use crate::schema::{
    Asset, Customer, Job, JobLocation, JobStatus, NewAsset, NewCustomer, NewJob, Principal,
};
use crate::storage;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A state change applied to a job's status and its location records
/// together.
#[derive(Debug, Clone, Copy)]
enum Transition {
    /// Close the current stay (if any), open a new one at the asset, and set
    /// the job in progress.
    MoveTo(i64),
    /// Set the status, closing the current stay when leaving `InProgress`.
    Status(JobStatus),
}

/// The job location tracker.
///
/// Derives each job's current whereabouts from an append-only log of
/// arrival/departure records and keeps job status consistent with that log.
/// Mutations run in a single database transaction, with the job row locked
/// so concurrent operations on the same job serialize; a failure anywhere
/// rolls the whole transaction back.
#[derive(Clone)]
pub struct Tracker {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker").field("pool", &self.pool).finish()
    }
}

impl Tracker {
    /// Create a tracker using the system clock.
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Create a tracker with an explicit clock, for deterministic timestamps
    /// in tests.
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Move a job onto an asset.
    ///
    /// Closes the job's open location record if it has one, opens a new
    /// record at the target asset, and sets the job in progress, all
    /// atomically. The close and the open carry the same timestamp. Moving a
    /// job onto the asset it is already at records a fresh stay rather than
    /// short-circuiting, so dwell time stays granular per move.
    #[instrument(
        name = "floortrack.move_job",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn move_job(
        &self,
        principal: &Principal,
        job_id: i64,
        asset_id: i64,
    ) -> Result<Job, Error> {
        let mut tx = self.pool.begin().await?;

        let Some(job) = storage::lock_job_tx(&mut tx, job_id).await? else {
            warn!("Job not found for move");
            tx.rollback().await?;
            return Err(Error::JobNotFound(job_id));
        };
        if !storage::asset_exists_tx(&mut tx, asset_id).await? {
            warn!("Asset not found for move");
            tx.rollback().await?;
            return Err(Error::AssetNotFound(asset_id));
        }

        let job = self
            .apply_transition(&mut tx, job, Transition::MoveTo(asset_id))
            .await?;
        tx.commit().await?;

        info!("Job moved");
        Ok(job)
    }

    /// Update a job's status.
    ///
    /// Setting `Complete` or `Pending` closes the job's open location record
    /// if it has one. Setting `InProgress` directly is only accepted while
    /// the job already has an open location record; otherwise the call fails
    /// with [`Error::NotAtAsset`], since [`Tracker::move_job`] is the way to
    /// start progress.
    #[instrument(
        name = "floortrack.update_status",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn update_status(
        &self,
        principal: &Principal,
        job_id: i64,
        status: JobStatus,
    ) -> Result<Job, Error> {
        let mut tx = self.pool.begin().await?;

        let Some(job) = storage::lock_job_tx(&mut tx, job_id).await? else {
            warn!("Job not found for status update");
            tx.rollback().await?;
            return Err(Error::JobNotFound(job_id));
        };
        let old_status = job.status;

        let job = self
            .apply_transition(&mut tx, job, Transition::Status(status))
            .await?;
        tx.commit().await?;

        info!(?old_status, new_status = ?status, "Job status updated");
        Ok(job)
    }

    /// The only path that mutates a job's status and location records.
    ///
    /// Runs inside the caller's transaction; the caller must already hold
    /// the job row lock. Reads the clock once so every record touched by one
    /// transition carries the same timestamp.
    async fn apply_transition(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job: Job,
        transition: Transition,
    ) -> Result<Job, Error> {
        let now = self.clock.now();

        match transition {
            Transition::MoveTo(asset_id) => {
                if let Some(closed) = storage::close_open_location_tx(tx, job.id, now).await? {
                    debug!(from_asset = closed.asset_id, "Closed previous stay");
                }
                storage::insert_location_tx(tx, job.id, asset_id, now).await?;
                Ok(storage::set_status_tx(tx, job.id, JobStatus::InProgress).await?)
            }
            Transition::Status(JobStatus::InProgress) => {
                if storage::find_open_location_tx(tx, job.id).await?.is_none() {
                    warn!("Rejected in_progress status for a job that is not at any asset");
                    return Err(Error::NotAtAsset(job.id));
                }
                Ok(storage::set_status_tx(tx, job.id, JobStatus::InProgress).await?)
            }
            Transition::Status(status) => {
                if let Some(closed) = storage::close_open_location_tx(tx, job.id, now).await? {
                    debug!(from_asset = closed.asset_id, "Closed open stay");
                }
                Ok(storage::set_status_tx(tx, job.id, status).await?)
            }
        }
    }

    /// The job's complete location history, oldest stay first.
    ///
    /// Read-only; runs in a single read transaction so the existence check
    /// and the history reflect one snapshot.
    #[instrument(
        name = "floortrack.location_history",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn location_history(
        &self,
        principal: &Principal,
        job_id: i64,
    ) -> Result<Vec<JobLocation>, Error> {
        let mut tx = self.pool.begin().await?;

        if !storage::job_exists_tx(&mut tx, job_id).await? {
            tx.rollback().await?;
            return Err(Error::JobNotFound(job_id));
        }
        let history = storage::location_history_tx(&mut tx, job_id).await?;
        tx.commit().await?;

        debug!(records = history.len(), "Retrieved location history");
        Ok(history)
    }

    /// Jobs currently at the given asset (open location record, no
    /// departure time).
    #[instrument(
        name = "floortrack.current_occupants",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn current_occupants(
        &self,
        principal: &Principal,
        asset_id: i64,
    ) -> Result<Vec<Job>, Error> {
        let mut tx = self.pool.begin().await?;

        if !storage::asset_exists_tx(&mut tx, asset_id).await? {
            tx.rollback().await?;
            return Err(Error::AssetNotFound(asset_id));
        }
        let occupants = storage::current_occupants_tx(&mut tx, asset_id).await?;
        tx.commit().await?;

        debug!(occupants = occupants.len(), "Retrieved current occupants");
        Ok(occupants)
    }

    /// Delete an asset.
    ///
    /// Fails with [`Error::AssetOccupied`] while any job has an open
    /// location record at the asset. Closed history records keep their
    /// reference to the deleted asset's id.
    #[instrument(
        name = "floortrack.delete_asset",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn delete_asset(&self, principal: &Principal, asset_id: i64) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        if !storage::lock_asset_tx(&mut tx, asset_id).await? {
            warn!("Asset not found for deletion");
            tx.rollback().await?;
            return Err(Error::AssetNotFound(asset_id));
        }
        let occupants = storage::open_location_count_tx(&mut tx, asset_id).await?;
        if occupants > 0 {
            warn!(occupants, "Cannot delete asset with jobs at it");
            tx.rollback().await?;
            return Err(Error::AssetOccupied(asset_id));
        }

        storage::delete_asset_tx(&mut tx, asset_id).await?;
        tx.commit().await?;

        info!("Asset deleted");
        Ok(())
    }

    /// Create a job for an existing customer. New jobs start out pending and
    /// not at any asset.
    #[instrument(
        name = "floortrack.create_job",
        skip(self, principal, new_job),
        fields(principal = %principal.username, customer_id = new_job.customer_id)
    )]
    pub async fn create_job(&self, principal: &Principal, new_job: NewJob) -> Result<Job, Error> {
        let mut tx = self.pool.begin().await?;

        if !storage::customer_exists_tx(&mut tx, new_job.customer_id).await? {
            warn!("Customer not found for job creation");
            tx.rollback().await?;
            return Err(Error::CustomerNotFound(new_job.customer_id));
        }
        let job = storage::insert_job_tx(&mut tx, &new_job, self.clock.now()).await?;
        tx.commit().await?;

        info!(job_id = job.id, "Job created");
        Ok(job)
    }

    /// Fetch a job by id.
    #[instrument(
        name = "floortrack.get_job",
        skip(self, principal),
        fields(principal = %principal.username)
    )]
    pub async fn get_job(&self, principal: &Principal, job_id: i64) -> Result<Job, Error> {
        storage::find_job(&self.pool, job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))
    }

    /// Create a customer.
    #[instrument(
        name = "floortrack.create_customer",
        skip(self, principal, new_customer),
        fields(principal = %principal.username)
    )]
    pub async fn create_customer(
        &self,
        principal: &Principal,
        new_customer: NewCustomer,
    ) -> Result<Customer, Error> {
        let customer =
            storage::insert_customer(&self.pool, &new_customer, self.clock.now()).await?;
        info!(customer_id = customer.id, "Customer created");
        Ok(customer)
    }

    /// Create an asset.
    #[instrument(
        name = "floortrack.create_asset",
        skip(self, principal, new_asset),
        fields(principal = %principal.username)
    )]
    pub async fn create_asset(
        &self,
        principal: &Principal,
        new_asset: NewAsset,
    ) -> Result<Asset, Error> {
        let asset = storage::insert_asset(&self.pool, &new_asset, self.clock.now()).await?;
        info!(asset_id = asset.id, "Asset created");
        Ok(asset)
    }
}
