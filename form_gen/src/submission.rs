//! Translating a form submission into keyword arguments.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SubmissionError;
use crate::form::{FormSpec, InputKind};
use crate::upload::{save_upload, UploadedFile};
use crate::workspace::Workspace;

/// A keyword argument value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Flag(bool),
}

impl Value {
    /// Empty text and empty lists count as "not specified".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(text) => text.is_empty(),
            Value::List(values) => values.is_empty(),
            Value::Flag(_) => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Flag(value)
    }
}

/// Keyword arguments for the underlying library function, keyed by field name
pub type Kwargs = BTreeMap<String, Value>;

/// One incoming form submission
#[derive(Debug, Clone, Default)]
pub struct Submission {
    values: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.push((name.into(), value.into()));
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.push((name.into(), file));
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_value(name, value);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.push_file(name, file);
        self
    }

    /// Every file sent under `name`, including blank ones.
    pub fn files(&self, name: &str) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(move |(n, _)| n == name).map(|(_, f)| f)
    }

    /// Text values by name. A name sent once maps to text, a name sent
    /// several times maps to the list of its values.
    pub fn values(&self) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for (name, value) in &self.values {
            let merged = match values.remove(name) {
                None => Value::Text(value.clone()),
                Some(Value::Text(first)) => Value::List(vec![first, value.clone()]),
                Some(Value::List(mut list)) => {
                    list.push(value.clone());
                    Value::List(list)
                }
                Some(flag @ Value::Flag(_)) => flag,
            };
            values.insert(name.clone(), merged);
        }
        values
    }
}

/// Builds the keyword arguments for one submission
///
/// Uploads are saved into the workspace's input directory and passed as
/// lists of paths. Empty values are dropped, so a field left blank and an
/// unchecked checkbox are both absent from the result rather than present
/// with an empty or `false` value. Checkbox values become `true` only for
/// `"on"`. Single text values of multi-value fields are split on spaces.
/// Names that match no field are dropped. The workspace's output directory
/// is passed under `destination`.
pub fn translate(
    submission: &Submission,
    spec: &FormSpec,
    workspace: &Workspace,
    destination: &str,
) -> Result<Kwargs, SubmissionError> {
    let mut uploads = BTreeMap::new();
    let input_dir = workspace.input_dir();
    for field in spec.all_fields().filter(|f| f.input_kind == InputKind::File) {
        let mut paths = Vec::new();
        // Browsers send a nameless part for a file input left blank
        for file in submission.files(&field.name).filter(|f| !f.file_name.is_empty()) {
            let path = save_upload(file, &input_dir)?;
            paths.push(path.to_string_lossy().into_owned());
        }
        uploads.insert(field.name.clone(), Value::List(paths));
    }

    let mut merged = uploads;
    merged.extend(submission.values());
    merged.retain(|_, value| !value.is_empty());

    let mut kwargs = Kwargs::new();
    for (name, value) in merged {
        let Some(field) = spec.field(&name) else {
            tracing::debug!("Dropping submitted value `{}` with no matching field", name);
            continue;
        };

        let value = match value {
            value if field.input_kind == InputKind::Checkbox => {
                Value::Flag(value == Value::Text("on".to_string()))
            }
            Value::Text(text) if field.multiple => {
                Value::List(text.split(' ').map(str::to_string).collect())
            }
            value => value,
        };
        kwargs.insert(name, value);
    }

    kwargs.insert(
        destination.to_string(),
        Value::Text(workspace.output_dir().to_string_lossy().into_owned()),
    );

    Ok(kwargs)
}
