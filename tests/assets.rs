#![allow(missing_docs)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use floortrack::schema::{NewAsset, NewCustomer, NewJob};
use floortrack::{Error, ErrorKind, Principal, Tracker};
use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// Test utilities and common setup
mod test_utils {
    use super::*;
    use testcontainers::runners::AsyncRunner;

    pub(super) struct TestApp {
        pub(super) tracker: Tracker,
        pub(super) operator: Principal,
        _container: ContainerAsync<Postgres>,
    }

    /// Start a throwaway PostgreSQL instance, run the migrations, and build
    /// a tracker on the system clock.
    pub(super) async fn setup() -> anyhow::Result<TestApp> {
        let container = Postgres::default().start().await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&connection_string).await?;
        floortrack::setup_database(&pool).await?;

        Ok(TestApp {
            tracker: Tracker::new(pool),
            operator: Principal {
                id: 1,
                username: "operator".into(),
            },
            _container: container,
        })
    }

    impl TestApp {
        /// Create a pending job for a fresh customer, returning the job id.
        pub(super) async fn seed_job(&self, name: &str) -> anyhow::Result<i64> {
            let customer = self
                .tracker
                .create_customer(
                    &self.operator,
                    NewCustomer {
                        name: format!("Customer of {name}"),
                        email: None,
                        phone: None,
                        address: None,
                    },
                )
                .await?;

            let job = self
                .tracker
                .create_job(
                    &self.operator,
                    NewJob {
                        name: name.into(),
                        description: None,
                        customer_id: customer.id,
                        due_date: None,
                    },
                )
                .await?;
            Ok(job.id)
        }

        pub(super) async fn seed_asset(&self, name: &str) -> anyhow::Result<i64> {
            let asset = self
                .tracker
                .create_asset(
                    &self.operator,
                    NewAsset {
                        name: name.into(),
                        manufacturer: None,
                        model: None,
                        description: None,
                    },
                )
                .await?;
            Ok(asset.id)
        }
    }
}

#[tokio::test]
async fn occupants_reflect_open_stays_only() -> anyhow::Result<()> {
    let app = test_utils::setup().await?;
    let first = app.seed_job("Rebuild spindle").await?;
    let second = app.seed_job("Regrind ways").await?;
    let lathe = app.seed_asset("Lathe 1").await?;
    let mill = app.seed_asset("Mill 2").await?;

    app.tracker.move_job(&app.operator, first, lathe).await?;
    app.tracker.move_job(&app.operator, second, lathe).await?;

    let occupants = app.tracker.current_occupants(&app.operator, lathe).await?;
    let ids: Vec<i64> = occupants.iter().map(|job| job.id).collect();
    assert_eq!(ids, vec![first, second]);

    // Moving one job away removes it from the asset's occupants.
    app.tracker.move_job(&app.operator, second, mill).await?;

    let occupants = app.tracker.current_occupants(&app.operator, lathe).await?;
    let ids: Vec<i64> = occupants.iter().map(|job| job.id).collect();
    assert_eq!(ids, vec![first]);

    Ok(())
}

#[tokio::test]
async fn occupants_of_unknown_asset_is_not_found() -> anyhow::Result<()> {
    let app = test_utils::setup().await?;

    let error = app
        .tracker
        .current_occupants(&app.operator, 9999)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::AssetNotFound(9999)));
    assert_eq!(error.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn deleting_an_idle_asset_succeeds_and_history_survives() -> anyhow::Result<()> {
    let app = test_utils::setup().await?;
    let job_id = app.seed_job("Rebuild spindle").await?;
    let lathe = app.seed_asset("Lathe 1").await?;
    let mill = app.seed_asset("Mill 2").await?;

    // Leave closed history at the lathe, then move on.
    app.tracker.move_job(&app.operator, job_id, lathe).await?;
    app.tracker.move_job(&app.operator, job_id, mill).await?;

    app.tracker.delete_asset(&app.operator, lathe).await?;

    // The closed stay still references the deleted asset's id.
    let history = app.tracker.location_history(&app.operator, job_id).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].asset_id, lathe);
    assert!(!history[0].is_open());

    // Deleting again reports the asset as gone.
    let error = app
        .tracker
        .delete_asset(&app.operator, lathe)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::AssetNotFound(id) if id == lathe));

    Ok(())
}

#[tokio::test]
async fn deleting_an_occupied_asset_is_a_conflict() -> anyhow::Result<()> {
    let app = test_utils::setup().await?;
    let job_id = app.seed_job("Rebuild spindle").await?;
    let lathe = app.seed_asset("Lathe 1").await?;

    app.tracker.move_job(&app.operator, job_id, lathe).await?;

    let error = app
        .tracker
        .delete_asset(&app.operator, lathe)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::AssetOccupied(id) if id == lathe));
    assert_eq!(error.kind(), ErrorKind::Conflict);

    // The asset is still there and still occupied.
    let occupants = app.tracker.current_occupants(&app.operator, lathe).await?;
    assert_eq!(occupants.len(), 1);
    assert_eq!(occupants[0].id, job_id);

    Ok(())
}

#[tokio::test]
async fn creating_a_job_requires_an_existing_customer() -> anyhow::Result<()> {
    let app = test_utils::setup().await?;

    let error = app
        .tracker
        .create_job(
            &app.operator,
            NewJob {
                name: "Orphan job".into(),
                description: None,
                customer_id: 9999,
                due_date: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(error, Error::CustomerNotFound(9999)));
    assert_eq!(error.kind(), ErrorKind::NotFound);

    Ok(())
}
