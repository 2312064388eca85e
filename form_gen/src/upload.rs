//! Persisting uploaded files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::SubmissionError;

/// One file part of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name the browser sent; empty when the input was left blank
    pub file_name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Reduces a client supplied file name to a safe, flat ASCII name.
///
/// Path separators become spaces, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9._-]` is dropped and leading or trailing `.`/`_` are
/// trimmed. The result may be empty.
pub fn secure_filename(name: &str) -> String {
    let flattened = name.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Saves `file` into `upload_dir` and returns its path.
///
/// The directory is created on first use and an existing file of the same
/// name is replaced.
pub fn save_upload(file: &UploadedFile, upload_dir: &Path) -> Result<PathBuf, SubmissionError> {
    let file_name = secure_filename(&file.file_name);
    if file_name.is_empty() {
        return Err(SubmissionError::InvalidFileName(file.file_name.clone()));
    }

    let upload_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| SubmissionError::Upload { path, source }
    };

    fs::create_dir_all(upload_dir).map_err(upload_error(upload_dir))?;

    let path = upload_dir.join(file_name);
    if path.exists() {
        fs::remove_file(&path).map_err(upload_error(&path))?;
    }
    fs::write(&path, &file.data).map_err(upload_error(&path))?;

    tracing::debug!("Saved upload {} ({} bytes)", path.display(), file.data.len());
    Ok(path)
}
