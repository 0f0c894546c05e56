// src/core/packages.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How an entry of the package list is deduplicated.
#[derive(Debug, PartialEq, Eq)]
enum PackageKind {
    /// `pkg`, `pkg=version` or `pkg/release`, keyed by the bare name.
    Name { name: String, pinned: bool },
    /// A `.deb` file on disk, keyed by its resolved path.
    LocalPath(PathBuf),
    /// An apt pattern such as `?priority(required)`; never deduplicated.
    Pattern,
}

fn classify(entry: &str) -> PackageKind {
    if entry.starts_with('?') {
        return PackageKind::Pattern;
    }
    if entry.starts_with('/') || entry.starts_with("./") || entry.starts_with("../") {
        return PackageKind::LocalPath(resolve(Path::new(entry)));
    }
    match entry.find(['/', '=']) {
        Some(index) => PackageKind::Name {
            name: entry.get(..index).unwrap_or(entry).to_string(),
            pinned: true,
        },
        None => PackageKind::Name {
            name: entry.to_string(),
            pinned: false,
        },
    }
}

/// Canonical path when the file exists, the lexically absolute path otherwise.
fn resolve(path: &Path) -> PathBuf {
    dunce::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Removes duplicate entries from a package list.
///
/// Names are compared by the part before `/` or `=`: the surviving entry keeps
/// the position of the first occurrence, and a later entry replaces it unless
/// the later one is a bare name while the kept one is pinned. Local paths are
/// compared by resolved path; the later entry wins at its own position.
/// Patterns are left alone. Applying it twice gives the same result as once.
pub fn sanitize(packages: &[String]) -> Vec<String> {
    let mut slots: Vec<Option<String>> = Vec::with_capacity(packages.len());
    let mut names: HashMap<String, (usize, bool)> = HashMap::new();
    let mut paths: HashMap<PathBuf, usize> = HashMap::new();

    for entry in packages {
        match classify(entry) {
            PackageKind::Pattern => slots.push(Some(entry.clone())),
            PackageKind::Name { name, pinned } => match names.get_mut(&name) {
                Some((slot, kept_pinned)) => {
                    if pinned || !*kept_pinned {
                        log::debug!("Replacing package '{}' by '{}'.", name, entry);
                        if let Some(kept) = slots.get_mut(*slot) {
                            *kept = Some(entry.clone());
                        }
                        *kept_pinned = pinned;
                    } else {
                        log::debug!("Dropping '{}' in favour of a pinned entry.", entry);
                    }
                }
                None => {
                    names.insert(name, (slots.len(), pinned));
                    slots.push(Some(entry.clone()));
                }
            },
            PackageKind::LocalPath(path) => {
                if let Some(previous) = paths.insert(path, slots.len()) {
                    if let Some(dropped) = slots.get_mut(previous).and_then(Option::take) {
                        log::debug!("Dropping '{}' in favour of '{}'.", dropped, entry);
                    }
                }
                slots.push(Some(entry.clone()));
            }
        }
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pinned_version_wins() {
        let packages = strings(&["less/jammy-updates", "more", "less=590-1build1"]);
        assert_eq!(sanitize(&packages), strings(&["less=590-1build1", "more"]));
    }

    #[test]
    fn test_bare_name_does_not_replace_pinned() {
        let packages = strings(&["vim=2:9.0", "less", "vim"]);
        assert_eq!(sanitize(&packages), strings(&["vim=2:9.0", "less"]));
    }

    #[test]
    fn test_duplicate_bare_names() {
        let packages = strings(&["vim", "less", "vim", "less"]);
        assert_eq!(sanitize(&packages), strings(&["vim", "less"]));
    }

    #[test]
    fn test_patterns_are_untouched() {
        let packages = strings(&["?priority(required)", "vim", "?priority(required)"]);
        assert_eq!(sanitize(&packages), packages);
    }

    #[test]
    fn test_local_paths_keep_later_entry() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let deb = dir.path().join("bdebstrap_0.5_all.deb");
        fs::write(&deb, b"").unwrap();

        let direct = deb.display().to_string();
        let detour = sub.join("..").join("bdebstrap_0.5_all.deb").display().to_string();
        let packages = vec![direct, "vim".to_string(), detour.clone()];

        assert_eq!(sanitize(&packages), vec!["vim".to_string(), detour]);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let packages = strings(&[
            "less/jammy-updates",
            "?essential",
            "more",
            "less=590-1build1",
            "more",
            "/tmp/a.deb",
            "/tmp/./a.deb",
        ]);
        let once = sanitize(&packages);
        assert_eq!(sanitize(&once), once);
    }
}
