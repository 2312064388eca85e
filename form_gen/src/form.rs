//! Building the web form specification from the option model.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::FormConfig;
use crate::error::ConfigurationError;
use crate::option::{Arity, CliKind, DeclaredType, OptionModel, ParserModel};

/// Widget used to render a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Checkbox,
    File,
    /// Closed set of choices
    Select,
}

impl InputKind {
    /// Widget used when an option declares no value type.
    pub fn fallback(kind: CliKind) -> Self {
        match kind {
            CliKind::StoreSingle | CliKind::StoreMultiple | CliKind::Append | CliKind::Count => {
                InputKind::Text
            }
            CliKind::StoreTrue
            | CliKind::StoreFalse
            | CliKind::StoreConst
            | CliKind::AppendConst
            | CliKind::Help
            | CliKind::Version => InputKind::Checkbox,
        }
    }
}

/// Render-ready descriptor of one form field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Form key, and the keyword the value is passed under
    pub name: String,
    pub label: String,
    pub help: String,
    pub input_kind: InputKind,
    /// Type the submitted value is validated against
    pub value_type: DeclaredType,
    /// Accepts several values
    pub multiple: bool,
    pub multiple_limit: Option<usize>,
    pub default: Option<String>,
    pub required: bool,
    pub choices: Vec<String>,
}

/// The whole form: built once at startup, read-only afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSpec {
    pub title: String,
    pub subtitle: String,
    pub fields: Vec<Field>,
    pub advanced_fields: Vec<Field>,
}

impl FormSpec {
    /// Builds the form from the option model and the form configuration
    ///
    /// Fails when no title can be resolved, when a counted option declares
    /// a non-integer type, or when two options resolve to the same name.
    ///
    /// # Example
    ///
    /// ```
    /// use clap_web_form::config::FormConfig;
    /// use clap_web_form::form::{FormSpec, InputKind};
    /// use clap_web_form::option::{CliKind, OptionModel, ParserModel};
    ///
    /// let model = ParserModel {
    ///     program: Some("merge".to_string()),
    ///     description: None,
    ///     options: vec![
    ///         OptionModel::new("outdir", CliKind::StoreSingle),
    ///         OptionModel::new("carry", CliKind::StoreTrue),
    ///     ],
    /// };
    ///
    /// let spec = FormSpec::build(&model, &FormConfig::default()).unwrap();
    /// assert_eq!(spec.title, "merge");
    /// assert_eq!(spec.fields[1].input_kind, InputKind::Checkbox);
    /// ```
    pub fn build(model: &ParserModel, config: &FormConfig) -> Result<Self, ConfigurationError> {
        let title = config
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(model.program.as_deref().filter(|p| !p.is_empty()))
            .ok_or(ConfigurationError::MissingTitle)?
            .to_string();

        let subtitle = config
            .subtitle
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(model.description.as_deref())
            .unwrap_or_default()
            .to_string();

        let mut seen = BTreeSet::new();
        let mut primary: Vec<(&str, Field)> = Vec::new();
        let mut advanced: Vec<(&str, Field)> = Vec::new();

        for option in &model.options {
            if option.is_help_or_version() || config.ignore_options.contains(&option.id) {
                continue;
            }

            let field = build_field(option, config)?;
            if !seen.insert(field.name.clone()) {
                return Err(ConfigurationError::DuplicateName(field.name));
            }

            if config.advanced_options.contains(&field.name) {
                advanced.push((option.id.as_str(), field));
            } else {
                primary.push((option.id.as_str(), field));
            }
        }

        let fields = if config.option_order.is_empty() {
            primary.into_iter().map(|(_, field)| field).collect()
        } else {
            order_by_id(primary, &config.option_order)
        };

        let advanced_order = if config.advanced_option_order.is_empty() {
            &config.advanced_options
        } else {
            &config.advanced_option_order
        };
        let advanced_fields = order_by_id(advanced, advanced_order);

        Ok(Self {
            title,
            subtitle,
            fields,
            advanced_fields,
        })
    }

    /// Primary fields followed by advanced ones.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().chain(self.advanced_fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.all_fields().find(|f| f.name == name)
    }
}

fn build_field(option: &OptionModel, config: &FormConfig) -> Result<Field, ConfigurationError> {
    let name = option.name();

    let label = config
        .label_overrides
        .get(&option.id)
        .cloned()
        .unwrap_or_else(|| default_label(&name));

    let value_type = match (option.cli_kind, option.declared_type) {
        (CliKind::Count, DeclaredType::Integer | DeclaredType::Inferred) => DeclaredType::Integer,
        (CliKind::Count, declared) => {
            return Err(ConfigurationError::CountTypeMismatch {
                option: option.id.clone(),
                declared: declared.to_string(),
            });
        }
        (_, declared) => declared,
    };

    let takes_values = option.arity != Arity::None;
    let input_kind = if value_type == DeclaredType::File || config.upload_options.contains(&name) {
        InputKind::File
    } else if takes_values && !option.choices.is_empty() {
        InputKind::Select
    } else {
        match value_type {
            DeclaredType::Text => InputKind::Text,
            DeclaredType::Integer => InputKind::Number,
            DeclaredType::File => InputKind::File,
            DeclaredType::Inferred => InputKind::fallback(option.cli_kind),
        }
    };

    let help = config
        .help_overrides
        .get(&name)
        .cloned()
        .unwrap_or_else(|| option.help.clone());

    Ok(Field {
        label,
        help,
        input_kind,
        value_type,
        multiple: option.is_multiple(),
        multiple_limit: option.multiple_limit(),
        default: option.default.clone(),
        required: option.required,
        choices: option.choices.clone(),
        name,
    })
}

/// `source_lang` becomes `Source lang`.
fn default_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

/// Keeps only the fields listed in `order`, in that order.
fn order_by_id(fields: Vec<(&str, Field)>, order: &[String]) -> Vec<Field> {
    order
        .iter()
        .flat_map(|id| {
            fields
                .iter()
                .filter(move |(field_id, _)| *field_id == id.as_str())
                .map(|(_, field)| field.clone())
        })
        .collect()
}
