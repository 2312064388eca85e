//! Normalized description of a command's options.
//!
//! [`ParserModel`] is the schema the form is built from. It can be written
//! by hand (it is plain serde data) or derived from a Clap [`Command`] with
//! [`ParserModel::from_command`], which only reads Clap's public getters.

use std::any::TypeId;
use std::fmt;

use clap::{Arg, ArgAction, Command, ValueHint};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Which parsing behavior produced an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliKind {
    /// Stores a single value
    StoreSingle,
    /// Stores several values given in one occurrence
    StoreMultiple,
    /// Appends one value per occurrence
    Append,
    /// Appends a constant per occurrence
    AppendConst,
    /// Flag that stores `true`
    StoreTrue,
    /// Flag that stores `false`
    StoreFalse,
    /// Flag that stores a constant
    StoreConst,
    /// Flag counted by occurrences (`-vvv`)
    Count,
    /// Prints help
    Help,
    /// Prints the version
    Version,
}

/// The value type an option coerces to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredType {
    Text,
    Integer,
    File,
    /// No explicit type; the form falls back on the [`CliKind`]
    Inferred,
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclaredType::Text => "text",
            DeclaredType::Integer => "integer",
            DeclaredType::File => "file",
            DeclaredType::Inferred => "inferred",
        };
        f.write_str(name)
    }
}

/// How many values one occurrence of an option takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    None,
    One,
    /// At most N values (N > 1)
    Fixed(usize),
    Unbounded,
}

/// One option of the command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionModel {
    /// Destination identifier (Clap arg id)
    pub id: String,
    /// Placeholder label shown in usage (e.g. `FILE`)
    #[serde(default)]
    pub value_name: Option<String>,
    pub cli_kind: CliKind,
    #[serde(default = "inferred")]
    pub declared_type: DeclaredType,
    #[serde(default = "arity_one")]
    pub arity: Arity,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Closed set of accepted values, if any
    #[serde(default)]
    pub choices: Vec<String>,
    /// Long flag without dashes
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub short: Option<char>,
    #[serde(default)]
    pub positional: bool,
}

fn inferred() -> DeclaredType {
    DeclaredType::Inferred
}

fn arity_one() -> Arity {
    Arity::One
}

impl OptionModel {
    /// Creates an option with the given id and kind, everything else unset.
    pub fn new(id: impl Into<String>, cli_kind: CliKind) -> Self {
        let id = id.into();
        let arity = match cli_kind {
            CliKind::StoreSingle | CliKind::Append => Arity::One,
            CliKind::StoreMultiple => Arity::Unbounded,
            _ => Arity::None,
        };
        Self {
            long: Some(id.clone()),
            id,
            value_name: None,
            cli_kind,
            declared_type: DeclaredType::Inferred,
            arity,
            help: String::new(),
            default: None,
            required: false,
            choices: Vec::new(),
            short: None,
            positional: false,
        }
    }

    pub fn with_type(mut self, declared_type: DeclaredType) -> Self {
        self.declared_type = declared_type;
        self
    }

    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_value_name(mut self, value_name: impl Into<String>) -> Self {
        self.value_name = Some(value_name.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Field name: the placeholder label if set, else the id, lower-cased.
    pub fn name(&self) -> String {
        self.value_name
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.id)
            .to_lowercase()
    }

    /// The identifier the command is known by on its own terms: the
    /// placeholder label as written, else the id.
    pub fn identifier(&self) -> &str {
        self.value_name
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(&self.id)
    }

    /// Whether the web field takes several values.
    pub fn is_multiple(&self) -> bool {
        matches!(self.cli_kind, CliKind::Append | CliKind::AppendConst)
            || matches!(self.arity, Arity::Fixed(_) | Arity::Unbounded)
    }

    pub fn multiple_limit(&self) -> Option<usize> {
        match self.arity {
            Arity::Fixed(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_help_or_version(&self) -> bool {
        matches!(self.cli_kind, CliKind::Help | CliKind::Version)
    }
}

/// All options of one command plus the command's own description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserModel {
    /// Program name, used as the fallback form title
    #[serde(default)]
    pub program: Option<String>,
    /// Program description, used as the fallback subtitle
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionModel>,
}

impl ParserModel {
    /// Extracts the option model from a Clap Command
    ///
    /// The command is built first so that every argument reports its
    /// resolved number of values.
    ///
    /// # Example
    ///
    /// ```
    /// use clap::{CommandFactory, Parser};
    /// use clap_web_form::option::ParserModel;
    ///
    /// #[derive(Parser)]
    /// #[command(name = "merge")]
    /// struct Args {
    ///     #[arg(short, long)]
    ///     outdir: String,
    /// }
    ///
    /// let model = ParserModel::from_command(&Args::command()).unwrap();
    /// assert_eq!(model.program.as_deref(), Some("merge"));
    /// assert!(model.options.iter().any(|o| o.id == "outdir"));
    /// ```
    pub fn from_command(command: &Command) -> Result<Self, ConfigurationError> {
        let mut command = command.clone();
        command.build();

        let options = command
            .get_arguments()
            .map(option_from_arg)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            program: Some(command.get_name().to_string()).filter(|p| !p.is_empty()),
            description: command.get_about().map(|a| a.to_string()),
            options,
        })
    }

    /// Looks an option up by its field name.
    pub fn find(&self, name: &str) -> Option<&OptionModel> {
        self.options.iter().find(|o| o.name() == name)
    }
}

fn option_from_arg(arg: &Arg) -> Result<OptionModel, ConfigurationError> {
    let id = arg.get_id().as_str().to_string();
    let num_args = arg.get_num_args();
    let takes_values = num_args.map(|n| n.takes_values()).unwrap_or(true);

    let cli_kind = match arg.get_action() {
        ArgAction::Set if !takes_values => CliKind::StoreConst,
        ArgAction::Set if num_args.map(|n| n.max_values() > 1).unwrap_or(false) => {
            CliKind::StoreMultiple
        }
        ArgAction::Set => CliKind::StoreSingle,
        ArgAction::Append if !takes_values => CliKind::AppendConst,
        ArgAction::Append => CliKind::Append,
        ArgAction::SetTrue => CliKind::StoreTrue,
        ArgAction::SetFalse => CliKind::StoreFalse,
        ArgAction::Count => CliKind::Count,
        ArgAction::Help | ArgAction::HelpShort | ArgAction::HelpLong => CliKind::Help,
        ArgAction::Version => CliKind::Version,
        other => {
            return Err(ConfigurationError::UnsupportedAction {
                option: id,
                action: format!("{:?}", other),
            });
        }
    };

    let arity = match num_args {
        None => Arity::One,
        Some(range) if range.max_values() == 0 => Arity::None,
        Some(range) if range.max_values() == 1 => Arity::One,
        Some(range) if range.max_values() == usize::MAX => Arity::Unbounded,
        // Bounded ranges record their upper bound as the cap
        Some(range) => Arity::Fixed(range.max_values()),
    };

    let value_name = arg
        .get_value_names()
        .and_then(|names| names.first())
        .map(|n| n.as_str().to_string());

    let choices = arg
        .get_possible_values()
        .into_iter()
        .filter(|pv| !pv.is_hide_set())
        .map(|pv| pv.get_name().to_string())
        .collect();

    Ok(OptionModel {
        value_name,
        cli_kind,
        declared_type: declared_type_from_arg(arg, takes_values),
        arity,
        help: arg.get_help().map(|h| h.to_string()).unwrap_or_default(),
        default: arg
            .get_default_values()
            .first()
            .and_then(|d| d.to_str().map(|s| s.to_string())),
        required: arg.is_required_set(),
        choices,
        long: arg.get_long().map(|s| s.to_string()),
        short: arg.get_short(),
        positional: arg.is_positional(),
        id,
    })
}

fn declared_type_from_arg(arg: &Arg, takes_values: bool) -> DeclaredType {
    if !takes_values {
        return DeclaredType::Inferred;
    }
    if arg.get_value_hint() == ValueHint::FilePath {
        return DeclaredType::File;
    }

    let type_id = arg.get_value_parser().type_id();
    if type_id == TypeId::of::<bool>() {
        return DeclaredType::Inferred;
    }
    let integers = [
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<usize>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<isize>(),
    ];
    if integers.iter().any(|id| type_id == *id) {
        return DeclaredType::Integer;
    }

    DeclaredType::Text
}
