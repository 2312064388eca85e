//! Serve a Clap command line tool as a single-page web form.
//!
//! The command's options are read into a [`ParserModel`], turned into a
//! [`FormSpec`] once at startup, and rendered as an HTML form. Each
//! submission gets its own [`Workspace`]: uploads are saved into its input
//! directory, the form values are translated back into keyword arguments,
//! and the underlying [`LibraryFunction`] is called with the workspace's
//! output directory as its destination. The results are downloaded through
//! `/export`, zipped when there is more than one file.

// Re-export the procedural macro
pub use clap_web_form_macro::web_form_bind;

pub mod config;
pub mod error;
pub mod form;
pub mod invoke;
pub mod option;
pub mod package;
pub mod render;
pub mod server;
pub mod submission;
pub mod upload;
pub mod workspace;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Command;

pub use config::{FormConfig, ServerConfig};
pub use error::{ConfigurationError, ExportError, InvokeError, SubmissionError};
pub use form::{Field, FormSpec, InputKind};
pub use invoke::{kwargs_to_argv, parse_kwargs, LibraryFunction};
pub use option::ParserModel;
pub use submission::{Kwargs, Submission, Value};
pub use upload::UploadedFile;
pub use workspace::Workspace;

use config::DESTINATION_CANDIDATES;

/// Result of one successful submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// Workspace id to export from; `None` when no output was written
    pub workspace: Option<String>,
    /// Keyword arguments the library function was called with
    pub kwargs: Kwargs,
}

/// A command's form bound to the function that serves it
///
/// Built once at startup and shared read-only between requests.
pub struct WebForm {
    spec: FormSpec,
    destination: String,
    function: Arc<dyn LibraryFunction>,
}

impl WebForm {
    /// Builds the form for a Clap command
    ///
    /// # Example
    ///
    /// ```
    /// use clap::{CommandFactory, Parser};
    /// use clap_web_form::{FormConfig, InvokeError, Kwargs, WebForm};
    ///
    /// #[derive(Parser)]
    /// #[command(name = "merge")]
    /// struct Args {
    ///     #[arg(long)]
    ///     outdir: String,
    /// }
    ///
    /// let form = WebForm::new(&Args::command(), FormConfig::default(), |_: &Kwargs| {
    ///     Ok::<(), InvokeError>(())
    /// })
    /// .unwrap();
    /// assert_eq!(form.destination(), "outdir");
    /// assert_eq!(form.spec().title, "merge");
    /// ```
    pub fn new(
        command: &Command,
        config: FormConfig,
        function: impl LibraryFunction + 'static,
    ) -> Result<Self, ConfigurationError> {
        let model = ParserModel::from_command(command)?;
        Self::from_model(&model, &config, function)
    }

    /// Builds the form from an explicitly declared option model.
    pub fn from_model(
        model: &ParserModel,
        config: &FormConfig,
        function: impl LibraryFunction + 'static,
    ) -> Result<Self, ConfigurationError> {
        let spec = FormSpec::build(model, config)?;
        let destination = resolve_destination(model, config)?;

        tracing::info!(
            "Built form `{}` with {} fields ({} advanced), destination `{}`",
            spec.title,
            spec.fields.len() + spec.advanced_fields.len(),
            spec.advanced_fields.len(),
            destination
        );

        Ok(Self {
            spec,
            destination,
            function: Arc::new(function),
        })
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    /// Keyword the output directory is passed under.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Runs one submission to completion
    ///
    /// Allocates a workspace under `temp_root`, translates the submission
    /// and calls the library function. Any failure fails the whole
    /// submission; the workspace is left in place either way.
    pub fn handle_submission(
        &self,
        submission: &Submission,
        temp_root: &Path,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let workspace = Workspace::allocate(temp_root)?;
        let kwargs = submission::translate(submission, &self.spec, &workspace, &self.destination)?;
        tracing::debug!("Calling library function with {:?}", kwargs);

        self.function.call(&kwargs)?;

        let output_dir = workspace.output_dir();
        let has_output = has_output_files(&output_dir)?;

        tracing::info!(
            "Submission in workspace {} finished ({})",
            workspace.id(),
            if has_output { "output written" } else { "no output" }
        );

        Ok(SubmissionOutcome {
            workspace: has_output.then(|| workspace.id().to_string()),
            kwargs,
        })
    }
}

/// Whether `output_dir` holds at least one file. Subdirectories are not
/// exported, so they do not count.
fn has_output_files(output_dir: &Path) -> Result<bool, SubmissionError> {
    let output_error = |source| SubmissionError::Output {
        path: output_dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(output_dir).map_err(output_error)? {
        if entry.map_err(output_error)?.path().is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Finds the option that receives the output directory and returns its
/// field name. Placeholder labels are compared case-insensitively since
/// Clap upper-cases them by default.
fn resolve_destination(
    model: &ParserModel,
    config: &FormConfig,
) -> Result<String, ConfigurationError> {
    if let Some(wanted) = config.destination_option.as_deref() {
        return model
            .options
            .iter()
            .find(|o| o.identifier() == wanted || o.id == wanted || o.name() == wanted)
            .map(|o| o.name())
            .ok_or_else(|| ConfigurationError::UnknownDestination(wanted.to_string()));
    }

    DESTINATION_CANDIDATES
        .iter()
        .find_map(|candidate| {
            model
                .options
                .iter()
                .find(|o| o.name() == *candidate || o.id == *candidate)
        })
        .map(|o| o.name())
        .ok_or(ConfigurationError::NoDestination)
}
