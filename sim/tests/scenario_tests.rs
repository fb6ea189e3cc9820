use fluxstate_domains::{DeleteMode, SimulatedServiceConfig};
use fluxstate_sim::{ScenarioConfig, ScenarioReport, run_scenario};
use fluxstate_storage::{PersistenceGateway, SqliteGateway};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn in_memory() -> Arc<dyn PersistenceGateway> {
    Arc::new(SqliteGateway::open_in_memory().unwrap())
}

#[tokio::test]
async fn default_scenario_reports_expected_counts() {
    let report = run_scenario(in_memory(), &ScenarioConfig::default())
        .await
        .unwrap();

    assert_eq!(
        report,
        ScenarioReport {
            // 45 fetched plus the pushed draft; the trashed post stays.
            posts: 46,
            pages: 1,
            // The edited post and the local page.
            locally_changed: 2,
            server_posts: 46,
            post_pages_fetched: 3,
            site_plugins: 2,
            directory_plugins: 120,
            directory_pages_fetched: 3,
            events: 15,
            errors: 0,
        }
    );
}

#[tokio::test]
async fn hard_delete_removes_oldest_post() {
    let config = ScenarioConfig {
        service: SimulatedServiceConfig {
            delete_mode: DeleteMode::Remove,
            ..SimulatedServiceConfig::default()
        },
        ..ScenarioConfig::default()
    };

    let report = run_scenario(in_memory(), &config).await.unwrap();

    assert_eq!(report.posts, 45);
    assert_eq!(report.server_posts, 45);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_runs_with_latency_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let gateway: Arc<dyn PersistenceGateway> =
        Arc::new(SqliteGateway::open(dir.path().join("sim.db")).unwrap());
    let config = ScenarioConfig {
        seeded_posts: 7,
        seeded_directory: 4,
        service: SimulatedServiceConfig {
            latency: Duration::from_millis(2),
            echo_date_created: false,
            ..SimulatedServiceConfig::default()
        },
        ..ScenarioConfig::default()
    };

    let report = run_scenario(gateway, &config).await.unwrap();

    assert_eq!(report.posts, 8);
    assert_eq!(report.post_pages_fetched, 1);
    assert_eq!(report.directory_plugins, 4);
    assert_eq!(report.errors, 0);
}
