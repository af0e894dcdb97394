//! Exclusion rules applied to every directory listing shown by the index.
//!
//! These rules are a fixed view invariant rather than a user preference, and
//! must stay bit-exact so other readers of the same project tree agree on
//! what is browsable.

use std::collections::HashSet;

/// Build-output directory name, matched case-insensitively.
pub const BUILD_OUTPUT_DIR: &str = "obj";

/// Marker for generated sources, matched anywhere in the name.
pub const GENERATED_MARKER: &str = ".generated";

pub const META_SUFFIX: &str = ".meta";

/// Compiled artifacts carry a one-character marker after an underscore,
/// e.g. `model.vmdl_c` next to `model.vmdl`.
pub const COMPILED_SUFFIX: &str = "_c";

/// A raw directory entry before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
}

impl RawEntry {
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Rules that need no knowledge of siblings.
pub fn is_excluded_alone(name: &str, is_dir: bool) -> bool {
    if name.starts_with('.') {
        return true;
    }

    let lower = name.to_lowercase();
    if is_dir {
        return lower == BUILD_OUTPUT_DIR;
    }

    lower.contains(GENERATED_MARKER) || lower.ends_with(META_SUFFIX)
}

/// Source name a compiled shadow would belong to, if `name` looks like one.
pub fn compiled_source_name(name: &str) -> Option<&str> {
    let suffix_len = COMPILED_SUFFIX.len();
    if name.len() <= suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
        return None;
    }
    let (stem, suffix) = name.split_at(name.len() - suffix_len);
    suffix.eq_ignore_ascii_case(COMPILED_SUFFIX).then_some(stem)
}

/// Keep only the entries that the index shows. Order is preserved.
pub fn filter_entries<T, F>(entries: Vec<T>, describe: F) -> Vec<T>
where
    F: Fn(&T) -> (&str, bool),
{
    let sibling_files: HashSet<String> = entries
        .iter()
        .map(&describe)
        .filter(|(_, is_dir)| !is_dir)
        .map(|(name, _)| name.to_lowercase())
        .collect();

    entries
        .into_iter()
        .filter(|entry| {
            let (name, is_dir) = describe(entry);
            if is_excluded_alone(name, is_dir) {
                return false;
            }
            if is_dir {
                return true;
            }
            match compiled_source_name(name) {
                Some(source) => !sibling_files.contains(&source.to_lowercase()),
                None => true,
            }
        })
        .collect()
}
