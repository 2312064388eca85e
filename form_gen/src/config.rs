//! Form and server configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigurationError;

/// Option identifiers probed, in order, for the output destination.
pub const DESTINATION_CANDIDATES: [&str; 3] = ["outpath", "outdir", "outfile"];

/// File name of the archive built when a request produced several files.
pub const RESULTS_ARCHIVE_NAME: &str = "results.zip";

/// How the form is derived from the command
///
/// Options are referred to in two ways. `ignore_options`, `option_order`,
/// `advanced_option_order` and `label_overrides` take the option id (Clap's
/// arg id). `upload_options`, `advanced_options` and `help_overrides` take
/// the field name (lower-cased value name, else id). The two coincide unless
/// an option sets its own `value_name`. Names that match no option are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormConfig {
    /// Page header; falls back to the command name
    pub title: Option<String>,
    /// Text below the header; falls back to the command's about text
    pub subtitle: Option<String>,
    /// Fields rendered as file uploads regardless of their declared type
    pub upload_options: Vec<String>,
    /// Options never rendered
    pub ignore_options: Vec<String>,
    /// Fields placed in the collapsible "advanced" section
    pub advanced_options: Vec<String>,
    /// Order of the primary fields. Fields not listed are left out.
    pub option_order: Vec<String>,
    /// Order of the advanced fields; defaults to `advanced_options`.
    pub advanced_option_order: Vec<String>,
    pub help_overrides: BTreeMap<String, String>,
    pub label_overrides: BTreeMap<String, String>,
    /// Option that receives the request's output directory
    pub destination_option: Option<String>,
}

impl FormConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

/// Settings of the HTTP surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Root under which every request gets its own workspace
    pub temp_root: PathBuf,
    /// Include the underlying error text in failure pages
    pub verbose_errors: bool,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from("temp"),
            verbose_errors: false,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config = FormConfig::from_toml_str(
            r#"
            title = "XLSForm translations"
            upload_options = ["source", "target"]
            advanced_options = ["carry", "no_diverse"]
            option_order = ["source", "target", "languages"]
            destination_option = "outdir"

            [help_overrides]
            source = "Spreadsheets with existing translations"
            "#,
        )
        .unwrap();

        assert_eq!(config.title.as_deref(), Some("XLSForm translations"));
        assert_eq!(config.upload_options, vec!["source", "target"]);
        assert!(config.ignore_options.is_empty());
        assert_eq!(
            config.help_overrides.get("source").map(String::as_str),
            Some("Spreadsheets with existing translations")
        );
        assert_eq!(config.destination_option.as_deref(), Some("outdir"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = FormConfig::from_toml_str("titel = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = FormConfig::from_toml_file(Path::new("/nonexistent/form.toml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.temp_root, PathBuf::from("temp"));
        assert!(!config.verbose_errors);
    }
}
