//! Calling the underlying library function with keyword arguments.

use clap::{Command, CommandFactory, Parser};

use crate::error::InvokeError;
use crate::option::{CliKind, OptionModel, ParserModel};
use crate::submission::{Kwargs, Value};

/// The function a form submission is ultimately passed to
///
/// Keywords are field names; the output destination arrives as text under
/// the destination option's name.
pub trait LibraryFunction: Send + Sync {
    fn call(&self, kwargs: &Kwargs) -> Result<(), InvokeError>;
}

impl<F> LibraryFunction for F
where
    F: Fn(&Kwargs) -> Result<(), InvokeError> + Send + Sync,
{
    fn call(&self, kwargs: &Kwargs) -> Result<(), InvokeError> {
        self(kwargs)
    }
}

/// Parses keyword arguments into a Clap options struct
///
/// This is what `#[web_form_bind]` uses to get from a submission back to
/// the typed options of the bound function.
pub fn parse_kwargs<T: Parser>(kwargs: &Kwargs) -> Result<T, InvokeError> {
    let argv = kwargs_to_argv(&T::command(), kwargs)?;
    T::try_parse_from(&argv).map_err(|e| InvokeError::Parse(e.to_string()))
}

/// Rebuilds the command line a user would have typed for `kwargs`
///
/// Switches are repeated for counts, values of appending options are
/// passed one occurrence each, and positionals come last after `--`.
/// Flags given a `false` value are left out.
pub fn kwargs_to_argv(command: &Command, kwargs: &Kwargs) -> Result<Vec<String>, InvokeError> {
    let model = ParserModel::from_command(command).map_err(|e| InvokeError::Parse(e.to_string()))?;

    let mut argv = vec![model.program.clone().unwrap_or_default()];
    let mut positionals: Vec<(usize, Vec<String>)> = Vec::new();

    for (name, value) in kwargs {
        let (index, option) = model
            .options
            .iter()
            .enumerate()
            .find(|(_, o)| o.name() == *name)
            .ok_or_else(|| InvokeError::UnknownArgument(name.clone()))?;

        match option.cli_kind {
            CliKind::Help | CliKind::Version => {}
            CliKind::StoreTrue | CliKind::StoreFalse | CliKind::StoreConst | CliKind::AppendConst => {
                if is_set(value) {
                    argv.push(switch(option)?);
                }
            }
            CliKind::Count => {
                // Clap stores counts as `u8`
                let times = match value {
                    Value::Flag(set) => u8::from(*set),
                    Value::Text(text) => text.trim().parse::<u8>().map_err(|_| InvokeError::InvalidCount {
                        name: name.clone(),
                        value: text.clone(),
                    })?,
                    Value::List(_) => {
                        return Err(InvokeError::InvalidCount {
                            name: name.clone(),
                            value: format!("{:?}", value),
                        });
                    }
                };
                for _ in 0..times {
                    argv.push(switch(option)?);
                }
            }
            CliKind::StoreSingle | CliKind::StoreMultiple | CliKind::Append => {
                let values = match value {
                    Value::Text(text) => vec![text.clone()],
                    Value::List(values) => values.clone(),
                    Value::Flag(flag) => vec![flag.to_string()],
                };
                if option.positional {
                    positionals.push((index, values));
                } else if option.cli_kind == CliKind::Append {
                    for value in &values {
                        push_option_value(&mut argv, option, std::slice::from_ref(value))?;
                    }
                } else {
                    push_option_value(&mut argv, option, &values)?;
                }
            }
        }
    }

    if !positionals.is_empty() {
        positionals.sort_by_key(|(index, _)| *index);
        argv.push("--".to_string());
        argv.extend(positionals.into_iter().flat_map(|(_, values)| values));
    }

    tracing::debug!("Rebuilt command line: {:?}", argv);
    Ok(argv)
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Flag(set) => *set,
        other => !other.is_empty(),
    }
}

fn switch(option: &OptionModel) -> Result<String, InvokeError> {
    if let Some(long) = &option.long {
        Ok(format!("--{}", long))
    } else if let Some(short) = option.short {
        Ok(format!("-{}", short))
    } else {
        Err(InvokeError::UnknownArgument(option.id.clone()))
    }
}

fn push_option_value(
    argv: &mut Vec<String>,
    option: &OptionModel,
    values: &[String],
) -> Result<(), InvokeError> {
    match (values, &option.long) {
        // `--name=value` keeps values starting with `-` intact
        ([single], Some(long)) => argv.push(format!("--{}={}", long, single)),
        _ => {
            argv.push(switch(option)?);
            argv.extend(values.iter().cloned());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ArgAction;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    #[command(name = "merge")]
    struct TestArgs {
        /// Input spreadsheet
        input: Option<String>,

        #[arg(short, long)]
        source: Vec<PathBuf>,

        #[arg(short, long, num_args = 1..)]
        languages: Vec<String>,

        #[arg(short, long)]
        outdir: String,

        #[arg(long)]
        carry: bool,

        #[arg(short, action = ArgAction::Count)]
        verbose: u8,
    }

    fn kwargs(pairs: &[(&str, Value)]) -> Kwargs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_argv_shape() {
        let kwargs = kwargs(&[
            ("source", Value::List(vec!["a.xlsx".into(), "b.xlsx".into()])),
            ("outdir", Value::from("/tmp/out")),
            ("carry", Value::Flag(true)),
            ("verbose", Value::from("2")),
            ("input", Value::from("-form.xlsx")),
        ]);
        let argv = kwargs_to_argv(&TestArgs::command(), &kwargs).unwrap();
        assert_eq!(
            argv,
            vec![
                "merge",
                "--carry",
                "--outdir=/tmp/out",
                "--source=a.xlsx",
                "--source=b.xlsx",
                "-v",
                "-v",
                "--",
                "-form.xlsx",
            ]
        );
    }

    #[test]
    fn test_parse_kwargs_round_trip() {
        let kwargs = kwargs(&[
            ("source", Value::List(vec!["a.xlsx".into()])),
            ("languages", Value::List(vec!["en".into(), "fr".into(), "de".into()])),
            ("outdir", Value::from("/tmp/out")),
            ("carry", Value::Flag(true)),
        ]);
        let args: TestArgs = parse_kwargs(&kwargs).unwrap();
        assert_eq!(args.source, vec![PathBuf::from("a.xlsx")]);
        assert_eq!(args.languages, vec!["en", "fr", "de"]);
        assert_eq!(args.outdir, "/tmp/out");
        assert!(args.carry);
        assert_eq!(args.verbose, 0);
        assert_eq!(args.input, None);
    }

    #[test]
    fn test_false_flag_is_left_out() {
        let kwargs = kwargs(&[("carry", Value::Flag(false)), ("outdir", Value::from("x"))]);
        let args: TestArgs = parse_kwargs(&kwargs).unwrap();
        assert!(!args.carry);
    }

    #[test]
    fn test_missing_required_argument_is_a_parse_error() {
        let kwargs = kwargs(&[("carry", Value::Flag(true))]);
        let err = parse_kwargs::<TestArgs>(&kwargs).unwrap_err();
        match err {
            InvokeError::Parse(message) => assert!(message.contains("--outdir")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_keyword() {
        let kwargs = kwargs(&[("nope", Value::from("x"))]);
        let err = kwargs_to_argv(&TestArgs::command(), &kwargs).unwrap_err();
        assert!(matches!(err, InvokeError::UnknownArgument(name) if name == "nope"));
    }

    #[test]
    fn test_invalid_count() {
        let kwargs = kwargs(&[("verbose", Value::from("lots"))]);
        let err = kwargs_to_argv(&TestArgs::command(), &kwargs).unwrap_err();
        assert!(matches!(err, InvokeError::InvalidCount { .. }));
    }

    #[test]
    fn test_count_above_u8_is_rejected() {
        let command = TestArgs::command();
        let argv = kwargs_to_argv(&command, &kwargs(&[("verbose", Value::from("255"))])).unwrap();
        assert_eq!(argv.len(), 256);

        for value in ["256", "5000000", "99999999999", "-1"] {
            let err = kwargs_to_argv(&command, &kwargs(&[("verbose", Value::from(value))])).unwrap_err();
            assert!(
                matches!(&err, InvokeError::InvalidCount { value: v, .. } if v == value),
                "count {value}"
            );
        }
    }

    #[test]
    fn test_closures_are_library_functions() {
        let function = |kwargs: &Kwargs| {
            if kwargs.contains_key("outdir") {
                Ok(())
            } else {
                Err(InvokeError::Failed("missing outdir".to_string()))
            }
        };
        let function: &dyn LibraryFunction = &function;
        assert!(function.call(&kwargs(&[("outdir", Value::from("x"))])).is_ok());
        assert!(function.call(&Kwargs::new()).is_err());
    }
}
