// Tests for grid layout and the grid projection

use std::fs;

use assetdex::grid::{GridGeometry, GridProjection, GridSource};
use assetdex::IndexError;
use tempfile::tempdir;

use super::common::{record, services, touch};

fn geometry() -> GridGeometry {
    GridGeometry {
        cell_width: 80.0,
        cell_height: 90.0,
        spacing: 4.0,
        padding: 10.0,
    }
}

#[test]
fn test_columns_and_rows_follow_width() {
    let dir = tempdir().unwrap();
    for i in 0..7 {
        touch(&dir.path().join(format!("file{}.txt", i)));
    }

    let mut grid = GridProjection::new(geometry(), services());
    grid.load_folder(dir.path());

    // (272 - 20 + 4) / 84 = 3.04
    grid.set_width(272.0);
    assert_eq!(grid.columns(), 3);
    assert_eq!(grid.rows(), 3);

    grid.set_width(50.0);
    assert_eq!(grid.columns(), 1);
    assert_eq!(grid.rows(), 7);
}

#[test]
fn test_hit_test_rejects_gaps_and_partial_rows() {
    let dir = tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
        touch(&dir.path().join(name));
    }

    let mut grid = GridProjection::new(geometry(), services());
    grid.set_width(272.0);
    grid.load_folder(dir.path());

    assert_eq!(grid.hit_test(15.0, 15.0), Some(0));
    assert_eq!(grid.hit_test(100.0, 50.0), Some(1));
    assert_eq!(grid.hit_test(15.0, 110.0), Some(3));

    // gap between columns 0 and 1
    assert_eq!(grid.hit_test(92.0, 50.0), None);
    // second row, second column: no fifth item
    assert_eq!(grid.hit_test(100.0, 110.0), None);
    // inside padding
    assert_eq!(grid.hit_test(5.0, 5.0), None);
}

#[test]
fn test_load_folder_replaces_items_wholesale() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("one.txt"));

    let mut grid = GridProjection::new(geometry(), services());
    grid.load_folder(dir.path());
    assert_eq!(grid.len(), 1);

    fs::remove_file(dir.path().join("one.txt")).unwrap();
    touch(&dir.path().join("two.txt"));
    grid.reload();
    assert_eq!(grid.items()[0].name, "two.txt");
    assert_eq!(grid.load_count(), 2);
    assert!(matches!(grid.source(), GridSource::Folder(_)));
}

#[test]
fn test_thumbnails_are_best_effort() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("albedo.png"));
    touch(&dir.path().join("crate.vmdl"));

    let mut grid = GridProjection::new(geometry(), services());
    grid.load_folder(dir.path());

    let png = &grid.items()[0];
    assert!(png.thumbnail.is_some());
    let model = &grid.items()[1];
    assert!(model.thumbnail.is_none());
    assert_eq!(model.icon.icon, "view_in_ar");
}

#[test]
fn test_remote_results_are_tagged() {
    let mut grid = GridProjection::new(geometry(), services());
    grid.load_remote_search(
        "crate",
        &[record("a", "Wooden Crate", "model"), record("b", "Crate Mat", "material")],
    );

    assert_eq!(grid.len(), 2);
    assert!(grid.items().iter().all(|item| item.is_remote && !item.can_drag()));
    assert_eq!(grid.items()[0].remote.as_ref().unwrap().identifier, "a");
    assert!(grid.current_folder().is_none());
    assert!(matches!(
        grid.duplicate(0),
        Err(IndexError::RemoteItem { .. })
    ));
}

#[test]
fn test_visible_range_pages_by_row() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        touch(&dir.path().join(format!("f{:02}.txt", i)));
    }

    let mut grid = GridProjection::new(geometry(), services());
    grid.set_width(272.0);
    grid.load_folder(dir.path());

    // rows are 94px apart starting at 10
    assert_eq!(grid.visible_range(0.0, 90.0), 0..3);
    assert_eq!(grid.visible_range(104.0, 90.0), 3..6);
    assert_eq!(grid.visible_range(150.0, 90.0), 3..9);
    assert!(grid.content_height() > 9.0 * 90.0);
}
