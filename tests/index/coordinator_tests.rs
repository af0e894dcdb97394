// Multi-panel coordination: layout, fan-out, event routing and mutation sync

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetdex::app::{LayoutItem, TickReport};
use assetdex::events::{FsChange, FsChangeKind, PanelId, UiTask};
use assetdex::fs::types::{canonicalize_path, file_name};
use assetdex::remote::StaticCatalog;
use assetdex::tree::{DropEffect, NewAsset};
use assetdex::ui::{Pane, PaneSpec, RootSpec};
use assetdex::{Coordinator, IndexError};
use tempfile::tempdir;

use super::common::{config, record, services, touch};

fn root_spec(path: &Path) -> RootSpec {
    let path = canonicalize_path(path);
    RootSpec {
        name: file_name(&path),
        path,
    }
}

fn coordinator(watch: bool, first: PaneSpec) -> Coordinator {
    Coordinator::new(
        config(watch),
        services(),
        Arc::new(StaticCatalog::new(vec![record("crate", "Crate", "model")])),
        first,
    )
}

fn grid_names(coordinator: &Coordinator, grid: PanelId) -> Vec<String> {
    coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .map(|g| g.projection().items().iter().map(|i| i.name.clone()).collect())
        .unwrap_or_default()
}

fn grid_loads(coordinator: &Coordinator, grid: PanelId) -> u64 {
    coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .map(|g| g.projection().load_count())
        .unwrap_or(0)
}

fn grid_folder(coordinator: &Coordinator, grid: PanelId) -> Option<PathBuf> {
    coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .and_then(|g| g.current_folder())
        .map(Path::to_path_buf)
}

fn grid_generation(coordinator: &Coordinator, grid: PanelId) -> Option<u64> {
    coordinator
        .pane(grid)
        .and_then(Pane::as_grid)
        .and_then(|g| g.watcher_generation())
}

fn changed(owner: PanelId, generation: u64, path: PathBuf) -> UiTask {
    UiTask::FsChanged {
        owner,
        generation,
        change: FsChange::new(FsChangeKind::Created, path),
    }
}

#[test]
fn test_separators_track_panel_count() {
    let mut c = coordinator(false, PaneSpec::RemoteTree);
    let mut ids = vec![c.active()];
    for _ in 0..4 {
        ids.push(c.add_panel(PaneSpec::RemoteGrid));
    }
    assert_eq!(c.panel_count(), 5);
    assert_eq!(c.separator_count(), 4);

    // Strip alternates panel, separator, panel...
    for (i, item) in c.layout().iter().enumerate() {
        assert_eq!(i % 2 == 0, matches!(item, LayoutItem::Panel(_)));
    }

    // Remove from the middle, then the rest.
    c.remove_panel(ids[2]).unwrap();
    assert_eq!(c.separator_count(), 3);
    for id in [ids[0], ids[4], ids[1]] {
        c.remove_panel(id).unwrap();
        assert_eq!(c.separator_count(), c.panel_count() - 1);
    }
    assert_eq!(c.panel_count(), 1);
    assert_eq!(c.separator_count(), 0);
    assert!(!c.close_visible(ids[3]));

    let layout_before = c.layout().to_vec();
    assert!(matches!(c.remove_panel(ids[3]), Err(IndexError::LastPanel)));
    assert_eq!(c.panel_count(), 1);
    assert_eq!(c.layout(), layout_before.as_slice());
}

#[test]
fn test_folder_selection_fans_out_to_local_grids() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("Props").join("crate.vmdl"));
    touch(&root.join("Props").join("barrel.vmdl"));
    touch(&root.join("readme.txt"));

    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    let left = c.add_panel(PaneSpec::Grid { folder: None });
    let right = c.add_panel(PaneSpec::Grid { folder: None });
    let remote = c.add_panel(PaneSpec::RemoteGrid);

    let props = root.join("Props");
    assert_eq!(c.select_folder(tree, &props).unwrap(), 2);

    for grid in [left, right] {
        assert_eq!(grid_folder(&c, grid).as_deref(), Some(props.as_path()));
        assert_eq!(grid_loads(&c, grid), 1);
        assert_eq!(grid_names(&c, grid), vec!["barrel.vmdl", "crate.vmdl"]);
    }
    assert_eq!(grid_loads(&c, remote), 0);

    // Selecting a file is not broadcast.
    assert_eq!(c.select_folder(tree, &root.join("readme.txt")).unwrap(), 0);
    assert_eq!(grid_loads(&c, left), 1);
}

#[test]
fn test_grid_change_events_coalesce_and_respect_generation() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    let first = root.join("first");
    let second = root.join("second");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();

    let mut c = coordinator(
        true,
        PaneSpec::Grid {
            folder: Some(first.clone()),
        },
    );
    let grid = c.active();
    let sender = c.sender();
    let Some(generation) = grid_generation(&c, grid) else {
        // No watch backend on this host; nothing to route.
        return;
    };

    let loads = grid_loads(&c, grid);
    for name in ["a.txt", "b.txt", "c.txt"] {
        sender.send(changed(grid, generation, first.join(name)));
    }
    let report = c.tick();
    assert_eq!(report.applied, 3);
    assert_eq!(report.grids_reloaded, 1);
    assert_eq!(grid_loads(&c, grid), loads + 1);

    // Change outside the folder on screen.
    sender.send(changed(grid, generation, second.join("x.txt")));
    let report = c.tick();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.grids_reloaded, 0);

    // Events produced before navigating away belong to the old root.
    c.pane_mut(grid)
        .and_then(Pane::as_grid_mut)
        .unwrap()
        .navigate(&second);
    assert_ne!(grid_generation(&c, grid), Some(generation));
    sender.send(changed(grid, generation, second.join("y.txt")));
    let report = c.tick();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.grids_reloaded, 0);
}

#[test]
fn test_tree_change_marks_folder_dirty() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("a.txt"));

    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap().rows();

    c.sender().send(changed(tree, 0, root.join("b.txt")));
    let report = c.tick();
    assert_eq!(report.trees_dirtied, 1);
    assert!(report.needs_redraw());

    let panel = c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap();
    let dirty = panel
        .find_node(&root)
        .and_then(|n| n.as_folder())
        .is_some_and(|f| f.is_dirty());
    assert!(dirty);
}

#[test]
fn test_task_for_closed_panel_is_dropped() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());

    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    c.add_panel(PaneSpec::RemoteGrid);
    c.sender().send(changed(tree, 0, root.join("late.txt")));
    c.remove_panel(tree).unwrap();

    let report = c.tick();
    assert_eq!(
        report,
        TickReport {
            dropped: 1,
            ..TickReport::default()
        }
    );
}

#[test]
fn test_mutations_sync_other_panels() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("old.txt"));
    touch(&root.join("keep.txt"));

    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    let grid = c.add_panel(PaneSpec::Grid {
        folder: Some(root.clone()),
    });
    c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap().rows();

    // Tree mutation reloads the grid showing the parent.
    let loads = grid_loads(&c, grid);
    let created = c.create_folder(tree, &root, "Textures").unwrap();
    assert!(created.is_dir());
    assert_eq!(grid_loads(&c, grid), loads + 1);
    assert!(grid_names(&c, grid).contains(&"Textures".to_string()));
    assert!(c.status().contains("done"));

    // Grid mutation dirties the tree's view of the folder.
    let index = grid_names(&c, grid)
        .iter()
        .position(|n| n == "old.txt")
        .unwrap();
    c.grid_delete(grid, index).unwrap();
    assert!(!root.join("old.txt").exists());
    assert!(!grid_names(&c, grid).contains(&"old.txt".to_string()));

    let panel = c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap();
    let dirty = panel
        .find_node(&root)
        .and_then(|n| n.as_folder())
        .is_some_and(|f| f.is_dirty());
    assert!(dirty);
    let names: Vec<String> = panel.rows().into_iter().map(|r| r.name).collect();
    assert!(!names.contains(&"old.txt".to_string()));
    assert!(names.contains(&"keep.txt".to_string()));
}

#[test]
fn test_failed_mutation_reports_status() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("taken.txt"));

    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    assert!(c.rename(tree, &root.join("missing.txt"), "other.txt").is_err());
    assert!(c.status().starts_with("✗ rename failed"));
}

#[tokio::test]
async fn test_live_watch_refreshes_tree_and_grid() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("first.txt"));

    let mut c = coordinator(
        true,
        PaneSpec::Tree {
            roots: vec![root_spec(&root)],
        },
    );
    let tree = c.active();
    let grid = c.add_panel(PaneSpec::Grid {
        folder: Some(root.clone()),
    });
    c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap().rows();
    if grid_generation(&c, grid).is_none() {
        return;
    }

    touch(&root.join("second.txt"));

    let mut total = TickReport::default();
    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while total.grids_reloaded == 0 || total.trees_dirtied == 0 {
            let report = c.wait_tick().await;
            total.grids_reloaded += report.grids_reloaded;
            total.trees_dirtied += report.trees_dirtied;
        }
    })
    .await;
    assert!(waited.is_ok(), "no change delivered: {:?}", total);

    assert!(grid_names(&c, grid).contains(&"second.txt".to_string()));
    let names: Vec<String> = c
        .pane_mut(tree)
        .and_then(Pane::as_tree_mut)
        .unwrap()
        .rows()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert!(names.contains(&"second.txt".to_string()));
}

fn tree_and_grid(root: &Path, shown: &Path) -> (Coordinator, PanelId, PanelId) {
    let mut c = coordinator(
        false,
        PaneSpec::Tree {
            roots: vec![root_spec(root)],
        },
    );
    let tree = c.active();
    let grid = c.add_panel(PaneSpec::Grid {
        folder: Some(shown.to_path_buf()),
    });
    c.pane_mut(tree).and_then(Pane::as_tree_mut).unwrap().rows();
    (c, tree, grid)
}

#[test]
fn test_move_and_copy_reload_grid_on_destination() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    let src = root.join("src");
    let dst = root.join("dst");
    touch(&src.join("item.txt"));
    touch(&src.join("other.txt"));
    fs::create_dir_all(&dst).unwrap();

    let (mut c, tree, grid) = tree_and_grid(&root, &dst);
    assert!(grid_names(&c, grid).is_empty());

    c.move_to(tree, &src.join("item.txt"), &dst).unwrap();
    assert_eq!(grid_names(&c, grid), vec!["item.txt"]);
    assert!(c.status().contains("move done"));

    c.copy_to(tree, &src.join("other.txt"), &dst).unwrap();
    assert_eq!(grid_names(&c, grid), vec!["item.txt", "other.txt"]);
    assert!(src.join("other.txt").exists());
}

#[test]
fn test_move_reloads_grid_on_source() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    let src = root.join("src");
    touch(&src.join("item.txt"));
    fs::create_dir_all(root.join("dst")).unwrap();

    let (mut c, tree, grid) = tree_and_grid(&root, &src);
    assert_eq!(grid_names(&c, grid), vec!["item.txt"]);

    c.move_to(tree, &src.join("item.txt"), &root.join("dst")).unwrap();
    assert!(grid_names(&c, grid).is_empty());
}

#[test]
fn test_creations_and_duplicate_reload_grid() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    touch(&root.join("a.txt"));

    let (mut c, tree, grid) = tree_and_grid(&root, &root);

    c.create_unique_folder(tree, &root).unwrap();
    assert!(grid_names(&c, grid).contains(&"NewFolder".to_string()));

    let asset = NewAsset::Template {
        name: "material".to_string(),
        extension: "vmat".to_string(),
        contents: b"{}".to_vec(),
    };
    c.create_asset(tree, &root, &asset).unwrap();
    assert!(grid_names(&c, grid).contains(&"material.vmat".to_string()));

    c.duplicate(tree, &root.join("a.txt")).unwrap();
    assert!(grid_names(&c, grid).contains(&"a_1.txt".to_string()));
}

#[test]
fn test_drop_syncs_and_reports_failures() {
    let temp = tempdir().unwrap();
    let root = canonicalize_path(temp.path());
    let dst = root.join("dst");
    touch(&root.join("loose.txt"));
    fs::create_dir_all(dst.join("inner")).unwrap();

    let (mut c, tree, grid) = tree_and_grid(&root, &dst);

    let results = c
        .drop_onto(
            tree,
            &dst.join("inner"),
            &[root.join("loose.txt"), dst.clone()],
            DropEffect::Move,
        )
        .unwrap();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(c.status().starts_with("✗ move failed"));
    assert!(dst.join("inner/loose.txt").exists());

    let loads = grid_loads(&c, grid);
    let results = c
        .drop_onto(tree, &dst, &[dst.join("inner/loose.txt")], DropEffect::Copy)
        .unwrap();
    assert!(results[0].is_ok());
    assert_eq!(grid_loads(&c, grid), loads + 1);
    assert!(grid_names(&c, grid).contains(&"loose.txt".to_string()));
}
