//! Per-request scratch directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use uuid::Uuid;

use crate::error::{ExportError, SubmissionError};

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";

/// The input/output directory pair of one request
///
/// Laid out as `<root>/<YYYY-MM-DD HH.MM.SS>-<token>/{input,output}`. The
/// directories are never removed automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: String,
    root: PathBuf,
}

impl Workspace {
    /// Creates a fresh workspace under `root`.
    ///
    /// `root` must already exist. The random token keeps two requests in
    /// the same second apart; an already existing directory is still an
    /// error rather than being reused.
    pub fn allocate(root: &Path) -> Result<Self, SubmissionError> {
        let stamp = Local::now().format("%Y-%m-%d %H.%M.%S");
        let token = Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", stamp, &token[..8]);
        let workspace = Self {
            root: root.join(&id),
            id,
        };

        for dir in [workspace.root.clone(), workspace.input_dir(), workspace.output_dir()] {
            fs::create_dir(&dir).map_err(|source| SubmissionError::Workspace { path: dir, source })?;
        }

        tracing::debug!("Allocated workspace {}", workspace.root.display());
        Ok(workspace)
    }

    /// Reopens a workspace from the id handed out by a previous request.
    pub fn open(root: &Path, id: &str) -> Result<Self, ExportError> {
        let malformed = id.is_empty()
            || id == "."
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\');
        if malformed {
            return Err(ExportError::InvalidReference(id.to_string()));
        }

        let dir = root.join(id);
        if !dir.join(OUTPUT_DIR).is_dir() {
            return Err(ExportError::InvalidReference(id.to_string()));
        }

        Ok(Self {
            id: id.to_string(),
            root: dir,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Where uploads are saved.
    pub fn input_dir(&self) -> PathBuf {
        self.root.join(INPUT_DIR)
    }

    /// Where the library function writes its results.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }
}

/// Creates the workspace root if it is missing. Called once at startup.
pub fn ensure_root(root: &Path) -> io::Result<()> {
    if !root.exists() {
        fs::create_dir_all(root)?;
        tracing::info!("Created workspace root {}", root.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_creates_both_directories() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).unwrap();

        assert!(workspace.input_dir().is_dir());
        assert!(workspace.output_dir().is_dir());
        assert_eq!(workspace.path().parent(), Some(root.path()));
        assert!(workspace.output_dir().ends_with("output"));
    }

    #[test]
    fn test_same_second_requests_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let first = Workspace::allocate(root.path()).unwrap();
        let second = Workspace::allocate(root.path()).unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_id_starts_with_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).unwrap();
        let id = workspace.id();
        // "YYYY-MM-DD HH.MM.SS-xxxxxxxx"
        assert_eq!(id.len(), 28);
        assert_eq!(&id[10..11], " ");
        assert!(!id.contains(':'));
    }

    #[test]
    fn test_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");
        let err = Workspace::allocate(&missing).unwrap_err();
        assert!(matches!(err, SubmissionError::Workspace { .. }));
    }

    #[test]
    fn test_ensure_root_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("temp");
        ensure_root(&nested).unwrap();
        ensure_root(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_open_round_trips_and_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).unwrap();

        let reopened = Workspace::open(root.path(), workspace.id()).unwrap();
        assert_eq!(reopened, workspace);

        for bad in ["", "..", "../etc", "a/b", "nope"] {
            assert!(
                matches!(Workspace::open(root.path(), bad), Err(ExportError::InvalidReference(_))),
                "{bad}"
            );
        }
    }
}
