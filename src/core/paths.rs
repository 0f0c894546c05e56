// src/core/paths.rs

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum OutputDirError {
    #[error("The output directory '{0}' already exists and is not empty. Use --force to override it.")]
    NotEmpty(String),
    #[error("The output path '{0}' exists but is not a directory.")]
    NotADirectory(String),
    #[error("Could not create output directory at '{path}': {source}")]
    Creation {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not remove existing output directory '{path}': {source}")]
    Removal {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not read output directory '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Makes sure `dir` exists and is empty before a build writes into it.
///
/// A non-empty directory is only wiped when `force` is set. Nothing on disk is
/// touched in dry run.
pub fn prepare_output_dir(dir: &Path, force: bool, dry_run: bool) -> Result<(), OutputDirError> {
    let display = dir.display().to_string();
    if dry_run {
        log::debug!("Simulation: not preparing output directory '{}'.", display);
        return Ok(());
    }

    if dir.exists() {
        if !dir.is_dir() {
            return Err(OutputDirError::NotADirectory(display));
        }
        let mut entries = fs::read_dir(dir).map_err(|e| OutputDirError::Read {
            path: display.clone(),
            source: e,
        })?;
        if entries.next().is_none() {
            return Ok(());
        }
        if !force {
            return Err(OutputDirError::NotEmpty(display));
        }
        log::info!("Removing existing output directory '{}'.", display);
        fs::remove_dir_all(dir).map_err(|e| OutputDirError::Removal {
            path: display.clone(),
            source: e,
        })?;
    }

    fs::create_dir_all(dir).map_err(|e| OutputDirError::Creation {
        path: display,
        source: e,
    })
}

/// The default output directory: `<output_base_dir>/<name>`.
pub fn default_output_dir(output_base_dir: &Path, name: &str) -> PathBuf {
    output_base_dir.join(name)
}

/// Lowers the access and modification time of `path` to `epoch` if it is newer.
///
/// Returns whether the file was changed. Without an epoch nothing is touched.
/// Only regular files and directories are clamped: opening a FIFO blocks and
/// opening a device node reaches the device itself.
pub fn clamp_mtime(path: &Path, epoch: Option<u64>) -> io::Result<bool> {
    let Some(epoch) = epoch else {
        return Ok(false);
    };
    let metadata = fs::symlink_metadata(path)?;
    let file_type = metadata.file_type();
    if !file_type.is_file() && !file_type.is_dir() {
        log::debug!("Not clamping special file '{}'.", path.display());
        return Ok(false);
    }
    let ceiling = UNIX_EPOCH + Duration::from_secs(epoch);
    let modified = metadata.modified()?;
    if modified <= ceiling {
        return Ok(false);
    }
    log::debug!("Clamping modification time of '{}'.", path.display());
    let times = FileTimes::new().set_accessed(ceiling).set_modified(ceiling);
    File::open(path)?.set_times(times)?;
    Ok(true)
}

/// Clamps every entry below `root` (including `root`), logging failures.
/// Returns the number of clamped entries.
pub fn clamp_tree(root: &Path, epoch: Option<u64>) -> usize {
    if epoch.is_none() {
        return 0;
    }
    let mut clamped = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Failed to walk '{}': {}", root.display(), e);
                continue;
            }
        };
        // Symlinks cannot be opened without following them; special files
        // must not be opened at all.
        let file_type = entry.file_type();
        if entry.path_is_symlink() || !(file_type.is_file() || file_type.is_dir()) {
            continue;
        }
        match clamp_mtime(entry.path(), epoch) {
            Ok(true) => clamped += 1,
            Ok(false) => {}
            Err(e) => log::error!(
                "Failed to clamp modification time of '{}': {}",
                entry.path().display(),
                e
            ),
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn mtime_secs(path: &Path) -> io::Result<u64> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(modified.duration_since(UNIX_EPOCH).unwrap().as_secs())
    }

    fn now_secs() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    #[test]
    fn test_missing_dir_is_created() {
        let base = tempdir().unwrap();
        let dir = base.path().join("Debian-unstable");
        prepare_output_dir(&dir, false, false).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_empty_dir_is_accepted() {
        let dir = tempdir().unwrap();
        prepare_output_dir(dir.path(), false, false).unwrap();
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_non_empty_dir_is_rejected() {
        let dir = tempdir().unwrap();
        let keep = dir.path().join("root.tar.xz");
        fs::write(&keep, b"data").unwrap();

        let err = prepare_output_dir(dir.path(), false, false).unwrap_err();
        assert!(matches!(err, OutputDirError::NotEmpty(_)));
        assert!(err.to_string().contains("already exists and is not empty"));
        assert_eq!(fs::read(&keep).unwrap(), b"data");
    }

    #[test]
    fn test_force_replaces_non_empty_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("old"), b"data").unwrap();
        prepare_output_dir(dir.path(), true, false).unwrap();
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let base = tempdir().unwrap();
        let dir = base.path().join("out");
        prepare_output_dir(&dir, true, true).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/srv/images"), "Debian-unstable"),
            PathBuf::from("/srv/images/Debian-unstable")
        );
    }

    #[test]
    fn test_clamp_mtime_without_epoch_is_noop() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("manifest");
        fs::write(&file, b"").unwrap();
        let before = mtime_secs(&file).unwrap();
        assert!(!clamp_mtime(&file, None).unwrap());
        assert_eq!(mtime_secs(&file).unwrap(), before);
    }

    #[test]
    fn test_clamp_mtime_lowers_newer_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("manifest");
        fs::write(&file, b"").unwrap();
        assert!(clamp_mtime(&file, Some(1581694618)).unwrap());
        assert_eq!(mtime_secs(&file).unwrap(), 1581694618);
    }

    #[test]
    fn test_clamp_mtime_never_increases() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("manifest");
        fs::write(&file, b"").unwrap();
        let before = mtime_secs(&file).unwrap();
        let future = now_secs() + 3600;
        assert!(!clamp_mtime(&file, Some(future)).unwrap());
        assert_eq!(mtime_secs(&file).unwrap(), before);
    }

    #[test]
    fn test_clamp_tree() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a"), b"").unwrap();
        fs::write(dir.path().join("b"), b"").unwrap();

        assert_eq!(clamp_tree(dir.path(), None), 0);
        assert_eq!(clamp_tree(dir.path(), Some(1000)), 4);
        assert_eq!(mtime_secs(&dir.path().join("sub").join("a")).unwrap(), 1000);
    }

    #[cfg(unix)]
    fn make_fifo(path: &Path) {
        let status = std::process::Command::new("mkfifo").arg(path).status().unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_clamp_mtime_skips_fifo() {
        let dir = tempdir().unwrap();
        let fifo = dir.path().join("initctl");
        make_fifo(&fifo);
        assert!(!clamp_mtime(&fifo, Some(1000)).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_clamp_tree_does_not_block_on_fifo() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("run")).unwrap();
        make_fifo(&dir.path().join("run").join("initctl"));
        fs::write(dir.path().join("manifest"), b"").unwrap();

        let root = dir.path().to_path_buf();
        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            sender.send(clamp_tree(&root, Some(1000))).ok();
        });
        let clamped = receiver
            .recv_timeout(Duration::from_secs(10))
            .expect("clamp_tree blocked on a FIFO");
        // root, run/ and manifest; the FIFO is left alone.
        assert_eq!(clamped, 3);
        assert_eq!(mtime_secs(&dir.path().join("manifest")).unwrap(), 1000);
    }
}
