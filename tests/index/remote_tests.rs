// Tests for the remote catalog tree driven through the coordinator

use std::sync::Arc;

use assetdex::app::TickReport;
use assetdex::remote::{LoadState, LoadTrigger};
use assetdex::ui::{Pane, PaneSpec};
use assetdex::{Coordinator, IndexError};

use super::common::{config, record, services, CountingCatalog};

fn catalog() -> Arc<CountingCatalog> {
    CountingCatalog::new(vec![
        record("crate", "Wooden Crate", "model"),
        record("barrel", "Barrel", "model"),
        record("brick", "Brick Wall", "material"),
    ])
}

fn remote_items(coordinator: &Coordinator, grid: assetdex::events::PanelId) -> Vec<String> {
    coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .map(|g| g.projection().items().iter().map(|i| i.name.clone()).collect())
        .unwrap_or_default()
}

fn category_state(coordinator: &mut Coordinator, panel: assetdex::events::PanelId) -> LoadState {
    coordinator
        .pane_mut(panel)
        .and_then(Pane::as_remote_tree_mut)
        .and_then(|r| r.tree().category(0).map(|c| c.state()))
        .unwrap_or(LoadState::NotLoaded)
}

#[tokio::test]
async fn test_category_load_idempotence() {
    let catalog = catalog();
    let mut coordinator =
        Coordinator::new(config(false), services(), catalog.clone(), PaneSpec::RemoteTree);
    let remote = coordinator.active();
    let grid = coordinator.add_panel(PaneSpec::RemoteGrid);

    // Two rapid triggers: one query.
    assert!(matches!(
        coordinator.load_category(remote, 0).unwrap(),
        LoadTrigger::Query(_)
    ));
    assert_eq!(
        coordinator.load_category(remote, 0).unwrap(),
        LoadTrigger::AlreadyLoading
    );
    assert_eq!(category_state(&mut coordinator, remote), LoadState::Loading);

    let report = coordinator.wait_tick().await;
    assert_eq!(report.results_loaded, 1);
    assert_eq!(catalog.calls(), 1);
    assert_eq!(remote_items(&coordinator, grid), vec!["Wooden Crate", "Barrel"]);
    assert_eq!(category_state(&mut coordinator, remote), LoadState::Loaded);

    // Loaded categories replay the cache without querying.
    let loads_before = coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .map(|g| g.projection().load_count())
        .unwrap();
    assert_eq!(
        coordinator.load_category(remote, 0).unwrap(),
        LoadTrigger::Cached
    );
    assert_eq!(catalog.calls(), 1);
    let loads_after = coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .map(|g| g.projection().load_count())
        .unwrap();
    assert_eq!(loads_after, loads_before + 1);
}

#[tokio::test]
async fn test_forced_refresh_queries_again() {
    let catalog = catalog();
    let mut coordinator =
        Coordinator::new(config(false), services(), catalog.clone(), PaneSpec::RemoteTree);
    let remote = coordinator.active();

    coordinator.load_category(remote, 0).unwrap();
    coordinator.wait_tick().await;
    assert!(matches!(
        coordinator.refresh_category(remote, 0).unwrap(),
        LoadTrigger::Query(_)
    ));
    coordinator.wait_tick().await;
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test]
async fn test_query_failure_returns_to_idle() {
    let mut coordinator = Coordinator::new(
        config(false),
        services(),
        CountingCatalog::failing(),
        PaneSpec::RemoteTree,
    );
    let remote = coordinator.active();
    let grid = coordinator.add_panel(PaneSpec::RemoteGrid);

    coordinator.load_category(remote, 0).unwrap();
    let report = coordinator.wait_tick().await;

    assert_eq!(report.failures, 1);
    assert!(coordinator.status().contains("catalog offline"));
    assert_eq!(category_state(&mut coordinator, remote), LoadState::NotLoaded);
    assert!(remote_items(&coordinator, grid).is_empty());
}

#[tokio::test]
async fn test_new_search_supersedes_previous() {
    let catalog = catalog();
    let mut coordinator =
        Coordinator::new(config(false), services(), catalog.clone(), PaneSpec::RemoteTree);
    let remote = coordinator.active();
    let grid = coordinator.add_panel(PaneSpec::RemoteGrid);

    let first = coordinator.search(remote, "crate").unwrap();
    let second = coordinator.search(remote, "brick").unwrap();
    assert_ne!(first, second);

    let mut total = TickReport::default();
    while total.applied + total.dropped < 2 {
        let report = coordinator.wait_tick().await;
        total.applied += report.applied;
        total.dropped += report.dropped;
        total.results_loaded += report.results_loaded;
    }

    // Both searches executed, only the latest is shown.
    assert_eq!(catalog.calls(), 2);
    assert_eq!(total.dropped, 1);
    assert_eq!(total.results_loaded, 1);
    assert_eq!(remote_items(&coordinator, grid), vec!["Brick Wall"]);
}

#[tokio::test]
async fn test_late_result_for_closed_panel_is_dropped() {
    let catalog = catalog();
    let mut coordinator =
        Coordinator::new(config(false), services(), catalog.clone(), PaneSpec::RemoteGrid);
    let grid = coordinator.active();
    let remote = coordinator.add_panel(PaneSpec::RemoteTree);

    coordinator.load_category(remote, 0).unwrap();
    coordinator.remove_panel(remote).unwrap();

    let report = coordinator.wait_tick().await;
    assert_eq!(report.dropped, 1);
    assert_eq!(report.results_loaded, 0);
    assert!(remote_items(&coordinator, grid).is_empty());
}

#[test]
fn test_category_on_wrong_panel_kind() {
    let mut coordinator = Coordinator::new(
        config(false),
        services(),
        catalog(),
        PaneSpec::Grid { folder: None },
    );
    let grid = coordinator.active();
    assert!(matches!(
        coordinator.load_category(grid, 0),
        Err(IndexError::UnknownPanel { .. })
    ));
}
