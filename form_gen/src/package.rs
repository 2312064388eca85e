//! Turning a request's output directory into one downloadable file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::RESULTS_ARCHIVE_NAME;
use crate::error::ExportError;
use crate::workspace::Workspace;

/// The file handed to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Name offered in the download dialog
    pub name: String,
}

impl Artifact {
    pub fn is_archive(&self) -> bool {
        self.name == RESULTS_ARCHIVE_NAME
    }
}

/// Packages the files in `output_dir`
///
/// One file is returned as-is. Several files are zipped flat into
/// `results.zip`, written next to `output_dir` so the archive never ends up
/// inside the directory it was built from. An empty directory yields `None`.
pub fn package_results(output_dir: &Path) -> Result<Option<Artifact>, ExportError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ExportError::Io { path, source }
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(output_dir).map_err(io_error(output_dir))? {
        let entry = entry.map_err(io_error(output_dir))?;
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    match files.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(Artifact {
            name: file_name(only),
            path: only.clone(),
        })),
        many => {
            let archive_dir = output_dir.parent().unwrap_or(output_dir);
            let archive_path = archive_dir.join(RESULTS_ARCHIVE_NAME);
            write_archive(&archive_path, many)?;
            tracing::debug!(
                "Packaged {} files into {}",
                many.len(),
                archive_path.display()
            );
            Ok(Some(Artifact {
                path: archive_path,
                name: RESULTS_ARCHIVE_NAME.to_string(),
            }))
        }
    }
}

/// Packages the output of the workspace `workspace_id` under `temp_root`.
///
/// A workspace without output is an [`ExportError::Empty`].
pub fn export_workspace(temp_root: &Path, workspace_id: &str) -> Result<Artifact, ExportError> {
    let workspace = Workspace::open(temp_root, workspace_id)?;
    let artifact = package_results(&workspace.output_dir())?
        .ok_or_else(|| ExportError::Empty(workspace_id.to_string()))?;
    tracing::info!("Exporting {} from workspace {}", artifact.name, workspace_id);
    Ok(artifact)
}

fn write_archive(archive_path: &Path, files: &[PathBuf]) -> Result<(), ExportError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ExportError::Io { path, source }
    };

    let archive = File::create(archive_path).map_err(io_error(archive_path))?;
    let mut zip = ZipWriter::new(archive);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let contents = fs::read(path).map_err(io_error(path))?;
        zip.start_file(file_name(path), options)?;
        zip.write_all(&contents).map_err(io_error(archive_path))?;
    }
    zip.finish()?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn output_dir(files: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("output");
        fs::create_dir(&output).unwrap();
        for name in files {
            fs::write(output.join(name), format!("contents of {name}")).unwrap();
        }
        (root, output)
    }

    #[test]
    fn test_single_file_is_returned_as_is() {
        let (_root, output) = output_dir(&["result.xlsx"]);
        let artifact = package_results(&output).unwrap().unwrap();
        assert_eq!(artifact.name, "result.xlsx");
        assert_eq!(artifact.path, output.join("result.xlsx"));
        assert!(!artifact.is_archive());
    }

    #[test]
    fn test_several_files_are_zipped() {
        let (root, output) = output_dir(&["a.xlsx", "b.xlsx"]);
        let artifact = package_results(&output).unwrap().unwrap();
        assert_eq!(artifact.name, "results.zip");
        assert_eq!(artifact.path, root.path().join("results.zip"));

        let mut archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["a.xlsx", "b.xlsx"]);

        let mut contents = String::new();
        archive
            .by_name("b.xlsx")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "contents of b.xlsx");
    }

    #[test]
    fn test_repeated_export_does_not_nest_archives() {
        let (_root, output) = output_dir(&["a.xlsx", "b.xlsx"]);
        package_results(&output).unwrap();
        let artifact = package_results(&output).unwrap().unwrap();
        let archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let (_root, output) = output_dir(&[]);
        assert_eq!(package_results(&output).unwrap(), None);
    }

    #[test]
    fn test_subdirectories_are_ignored() {
        let (_root, output) = output_dir(&["result.xlsx"]);
        fs::create_dir(output.join("logs")).unwrap();
        let artifact = package_results(&output).unwrap().unwrap();
        assert_eq!(artifact.name, "result.xlsx");
    }

    #[test]
    fn test_export_workspace() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::allocate(root.path()).unwrap();

        let err = export_workspace(root.path(), workspace.id()).unwrap_err();
        assert!(matches!(err, ExportError::Empty(_)));

        fs::write(workspace.output_dir().join("result.xlsx"), "merged").unwrap();
        let artifact = export_workspace(root.path(), workspace.id()).unwrap();
        assert_eq!(artifact.name, "result.xlsx");

        let err = export_workspace(root.path(), "../elsewhere").unwrap_err();
        assert!(matches!(err, ExportError::InvalidReference(_)));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let err = package_results(&root.path().join("missing")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
