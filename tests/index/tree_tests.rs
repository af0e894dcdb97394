// Tests for the lazy tree model and its mutations

use std::fs;

use assetdex::assets::{AssetRegistry, MemoryRegistry, RegistryCall};
use assetdex::config::ProjectPaths;
use assetdex::tree::{ops, ChildState, FolderNode, NewAsset, TreeNode};
use tempfile::tempdir;

use super::common::touch;

fn names(folder: &mut FolderNode) -> Vec<String> {
    folder
        .children()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn root_at(path: &std::path::Path) -> TreeNode {
    TreeNode::Folder(FolderNode::root(path, "Assets", &ProjectPaths::default()))
}

#[test]
fn test_sort_invariant() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("b.txt"));
    touch(&dir.path().join("A.txt"));
    fs::create_dir(dir.path().join("Z")).unwrap();

    let mut folder = FolderNode::new(dir.path(), None, &ProjectPaths::default());
    assert_eq!(names(&mut folder), vec!["Z", "A.txt", "b.txt"]);
}

#[test]
fn test_exclusion_invariant() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join(".hidden"));
    fs::create_dir(dir.path().join("obj")).unwrap();
    touch(&dir.path().join("foo.generated.cs"));
    touch(&dir.path().join("bar.meta"));
    touch(&dir.path().join("baz_c"));
    touch(&dir.path().join("baz"));
    touch(&dir.path().join("normal.txt"));

    let mut folder = FolderNode::new(dir.path(), None, &ProjectPaths::default());
    assert_eq!(names(&mut folder), vec!["baz", "normal.txt"]);
}

#[test]
fn test_compiled_shadow_kept_without_source() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("model.vmdl_c"));

    let mut folder = FolderNode::new(dir.path(), None, &ProjectPaths::default());
    assert_eq!(names(&mut folder), vec!["model.vmdl_c"]);
}

#[test]
fn test_idempotent_rebuild() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("models")).unwrap();
    touch(&dir.path().join("a.txt"));
    touch(&dir.path().join("B.png"));

    let mut folder = FolderNode::new(dir.path(), None, &ProjectPaths::default());
    folder.build_children();
    let first: Vec<_> = folder
        .loaded_children()
        .iter()
        .map(|c| (c.path().to_path_buf(), c.is_folder()))
        .collect();
    folder.build_children();
    let second: Vec<_> = folder
        .loaded_children()
        .iter()
        .map(|c| (c.path().to_path_buf(), c.is_folder()))
        .collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_dirty_propagation_after_rename() {
    let dir = tempdir().unwrap();
    let f = dir.path().join("F");
    touch(&f.join("X.txt"));

    let mut root = root_at(dir.path());
    let folder = root.find_node(&f).unwrap().as_folder_mut().unwrap();
    assert_eq!(names(folder), vec!["X.txt"]);

    ops::rename(&mut root, &f.join("X.txt"), "Y.txt").unwrap();

    // F is dirty, its parent (the root) is not.
    assert!(!root.as_folder().unwrap().is_dirty());
    let folder = root.find_node(&f).unwrap().as_folder_mut().unwrap();
    assert!(folder.is_dirty());
    assert_eq!(names(folder), vec!["Y.txt"]);
    assert_eq!(folder.state(), ChildState::Built);
}

#[test]
fn test_filter_finds_unopened_matches() {
    let dir = tempdir().unwrap();
    let f = dir.path().join("F");
    touch(&f.join("a/b/c/needle.txt"));
    touch(&f.join("other.txt"));

    let folder = FolderNode::new(&f, None, &ProjectPaths::default());
    assert!(folder.matches_filter("needle"));
    assert!(folder.matches_filter("NEEDLE"));
    assert!(!folder.matches_filter("haystack"));

    // The scan did not materialize anything.
    assert_eq!(folder.state(), ChildState::Unbuilt);
    assert!(folder.loaded_children().is_empty());
}

#[test]
fn test_missing_directory_renders_empty() {
    let dir = tempdir().unwrap();
    let mut folder = FolderNode::new(&dir.path().join("gone"), None, &ProjectPaths::default());
    assert!(names(&mut folder).is_empty());
    assert!(folder.is_built());
}

#[test]
fn test_find_node_is_case_insensitive() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("Models/Crate.vmdl"));

    let mut root = root_at(dir.path());
    let upper = dir.path().join("MODELS").join("crate.VMDL");
    let node = root.find_node(&upper).unwrap();
    assert_eq!(node.name(), "Crate.vmdl");
}

#[test]
fn test_create_asset_registers_exactly_once() {
    let dir = tempdir().unwrap();
    let registry = MemoryRegistry::new();
    let mut root = root_at(dir.path());
    root.as_folder_mut().unwrap().children();

    let template = NewAsset::Template {
        name: "material".to_string(),
        extension: "vmat".to_string(),
        contents: b"Layer0 {}".to_vec(),
    };
    let first = ops::create_asset(&mut root, dir.path(), &template, &registry).unwrap();
    let second = ops::create_asset(&mut root, dir.path(), &template, &registry).unwrap();
    assert_eq!(first.file_name().unwrap(), "material.vmat");
    assert_eq!(second.file_name().unwrap(), "material_1.vmat");

    let typed = NewAsset::Typed {
        name: "footstep".to_string(),
        kind: "sound".to_string(),
        extension: "sound".to_string(),
    };
    let sound = ops::create_asset(&mut root, dir.path(), &typed, &registry).unwrap();

    assert_eq!(
        registry.calls(),
        vec![
            RegistryCall::Registered(first.clone()),
            RegistryCall::Registered(second),
            RegistryCall::Created {
                kind: "sound".to_string(),
                path: sound,
            },
        ]
    );
    assert!(root.as_folder().unwrap().is_dirty());

    // The cached resource handle resolves through the registry.
    let folder = root.as_folder_mut().unwrap();
    let file = folder.children_mut()[0].as_file_mut().unwrap();
    assert_eq!(file.resource(&registry).unwrap().path, first);
}

#[test]
fn test_failed_create_calls_nothing() {
    let dir = tempdir().unwrap();
    let registry = MemoryRegistry::new();
    let mut root = root_at(dir.path());

    let bad = NewAsset::Template {
        name: "a/b".to_string(),
        extension: "txt".to_string(),
        contents: Vec::new(),
    };
    assert!(ops::create_asset(&mut root, dir.path(), &bad, &registry).is_err());
    assert!(registry.calls().is_empty());
    assert!(registry.find(&dir.path().join("a/b.txt")).is_none());
}

#[test]
fn test_move_dirties_source_and_destination() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("src/item.txt"));
    fs::create_dir(dir.path().join("dst")).unwrap();

    let mut root = root_at(dir.path());
    let src = dir.path().join("src");
    let dst = dir.path().join("dst");
    root.find_node(&src).unwrap().as_folder_mut().unwrap().children();
    root.find_node(&dst).unwrap().as_folder_mut().unwrap().children();

    let moved = ops::move_to(&mut root, &src.join("item.txt"), &dst).unwrap();
    assert!(moved.ends_with("dst/item.txt"));

    let src_node = root.find_node(&src).unwrap().as_folder_mut().unwrap();
    assert!(src_node.is_dirty());
    assert!(names(src_node).is_empty());
    let dst_node = root.find_node(&dst).unwrap().as_folder_mut().unwrap();
    assert_eq!(names(dst_node), vec!["item.txt"]);
}
