//! Merging translations between tab-separated form definitions.
//!
//! A form is a TSV file whose header names the source text column first and
//! one column per language after it:
//!
//! ```text
//! text    French    Swahili
//! Hello   Bonjour
//! ```
//!
//! Without target files the translations found in the sources are written
//! to a summary, `translations.tsv`. With target files each target gets a
//! merged copy, `<name>-merged.tsv`, with its empty cells filled in.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use clap_web_form::web_form_bind;
use thiserror::Error;

pub const SUMMARY_FILE_NAME: &str = "translations.tsv";

/// Generates translation summary files and merges translations between
/// tab-separated forms.
#[derive(Parser, Debug, Clone)]
#[command(name = "translation-merge", version)]
pub struct Opts {
    /// One or more forms to take translations from
    #[arg(required = true, num_args = 1.., value_hint = ValueHint::FilePath)]
    pub sources: Vec<PathBuf>,

    /// Forms that receive the translations
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub merge: Vec<PathBuf>,

    /// File names among the sources whose translations take precedence
    #[arg(short, long, num_args = 1..)]
    pub correct: Vec<String>,

    /// Exclude every translation of a text that has more than one
    #[arg(long)]
    pub no_diverse: bool,

    /// Write only the texts with differing translations in this language
    #[arg(short, long)]
    pub diverse: Option<String>,

    /// Languages to add a column for
    #[arg(short, long, num_args = 1..)]
    pub add: Vec<String>,

    /// Languages to leave out
    #[arg(short, long, num_args = 1..)]
    pub ignore: Vec<String>,

    /// Copy the source text into cells with no translation
    #[arg(short = 'C', long)]
    pub carry: bool,

    /// Row order of the summary
    #[arg(long, value_enum, default_value = "source")]
    pub order: RowOrder,

    /// Log progress; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory the results are written to
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    pub outdir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RowOrder {
    /// As first seen in the sources
    Source,
    Alphabetical,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("{0} has no header row")]
    MissingHeader(PathBuf),

    #[error("--diverse can only be used without target files")]
    DiverseWithTargets,
}

/// One parsed form
#[derive(Debug, Clone, PartialEq, Eq)]
struct Table {
    text_column: String,
    languages: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn read(path: &Path) -> Result<Self, MergeError> {
        let contents = fs::read_to_string(path).map_err(|source| MergeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).ok_or_else(|| MergeError::MissingHeader(path.to_path_buf()))
    }

    fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
        let mut header = lines.next()?.split('\t').map(|c| c.trim().to_string());
        let text_column = header.next()?;
        let languages: Vec<String> = header.collect();

        let rows = lines
            .map(|line| {
                let mut cells: Vec<String> = line.split('\t').map(str::to_string).collect();
                cells.resize(languages.len() + 1, String::new());
                cells
            })
            .collect();

        Some(Self {
            text_column,
            languages,
            rows,
        })
    }

    fn to_tsv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.text_column);
        for language in &self.languages {
            out.push('\t');
            out.push_str(language);
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    fn write(&self, path: &Path) -> Result<(), MergeError> {
        fs::write(path, self.to_tsv()).map_err(|source| MergeError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Translations gathered from the sources, keyed by text then language
#[derive(Debug, Default)]
struct Translations {
    texts: Vec<String>,
    languages: Vec<String>,
    found: BTreeMap<String, BTreeMap<String, Vec<(String, bool)>>>,
}

impl Translations {
    fn collect(tables: &[(Table, bool)], ignore: &[String]) -> Self {
        let mut translations = Self::default();
        for (table, trusted) in tables {
            for language in &table.languages {
                if !ignore.contains(language) && !translations.languages.contains(language) {
                    translations.languages.push(language.clone());
                }
            }

            for row in &table.rows {
                let text = &row[0];
                if text.is_empty() {
                    continue;
                }
                if !translations.found.contains_key(text) {
                    translations.texts.push(text.clone());
                }
                let by_language = translations.found.entry(text.clone()).or_default();
                for (language, cell) in table.languages.iter().zip(&row[1..]) {
                    if cell.is_empty() || ignore.contains(language) {
                        continue;
                    }
                    by_language
                        .entry(language.clone())
                        .or_default()
                        .push((cell.clone(), *trusted));
                }
            }
        }
        translations
    }

    /// Distinct candidates for `text` in `language`, trusted ones only when any exist.
    fn candidates(&self, text: &str, language: &str) -> Vec<&str> {
        let Some(found) = self.found.get(text).and_then(|l| l.get(language)) else {
            return Vec::new();
        };
        let any_trusted = found.iter().any(|(_, trusted)| *trusted);

        let mut seen = BTreeSet::new();
        found
            .iter()
            .filter(|(_, trusted)| *trusted || !any_trusted)
            .map(|(translation, _)| translation.as_str())
            .filter(|translation| seen.insert(*translation))
            .collect()
    }

    fn resolve(&self, text: &str, language: &str, opts: &Opts) -> Option<String> {
        match self.candidates(text, language).as_slice() {
            [] => None,
            [_, _, ..] if opts.no_diverse => None,
            [first, ..] => Some(first.to_string()),
        }
    }
}

fn languages_with_added(mut languages: Vec<String>, opts: &Opts) -> Vec<String> {
    for language in &opts.add {
        if !languages.contains(language) && !opts.ignore.contains(language) {
            languages.push(language.clone());
        }
    }
    languages
}

fn fill(translations: &Translations, text: &str, language: &str, opts: &Opts) -> String {
    translations
        .resolve(text, language, opts)
        .or_else(|| opts.carry.then(|| text.to_string()))
        .unwrap_or_default()
}

fn summary(translations: &Translations, opts: &Opts) -> Table {
    let languages = languages_with_added(translations.languages.clone(), opts);
    let mut texts = translations.texts.clone();
    if opts.order == RowOrder::Alphabetical {
        texts.sort();
    }

    let rows = texts
        .iter()
        .map(|text| {
            let mut row = vec![text.clone()];
            row.extend(languages.iter().map(|l| fill(translations, text, l, opts)));
            row
        })
        .collect();

    Table {
        text_column: "text".to_string(),
        languages,
        rows,
    }
}

fn diverse_report(translations: &Translations, language: &str) -> Table {
    let rows = translations
        .texts
        .iter()
        .filter_map(|text| {
            let candidates = translations.candidates(text, language);
            (candidates.len() > 1).then(|| {
                let mut row = vec![text.clone()];
                row.extend(candidates.iter().map(|c| c.to_string()));
                row
            })
        })
        .collect::<Vec<_>>();
    let width = rows.iter().map(|r| r.len() - 1).max().unwrap_or(0);

    Table {
        text_column: "text".to_string(),
        languages: (1..=width).map(|i| format!("{language} {i}")).collect(),
        rows: rows
            .into_iter()
            .map(|mut row| {
                row.resize(width + 1, String::new());
                row
            })
            .collect(),
    }
}

fn merged(target: &Table, translations: &Translations, opts: &Opts) -> Table {
    let languages = languages_with_added(target.languages.clone(), opts);
    let rows = target
        .rows
        .iter()
        .map(|row| {
            let text = &row[0];
            let mut merged = vec![text.clone()];
            for (i, language) in languages.iter().enumerate() {
                let existing = row.get(i + 1).filter(|cell| !cell.is_empty());
                merged.push(match existing {
                    Some(cell) => cell.clone(),
                    None if text.is_empty() || opts.ignore.contains(language) => String::new(),
                    None => fill(translations, text, language, opts),
                });
            }
            merged
        })
        .collect();

    Table {
        text_column: target.text_column.clone(),
        languages,
        rows,
    }
}

fn merged_file_name(target: &Path) -> String {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "form".to_string());
    format!("{stem}-merged.tsv")
}

/// Runs one merge and writes the results into `opts.outdir`.
#[web_form_bind]
pub fn merge(opts: &Opts) -> Result<(), MergeError> {
    if opts.diverse.is_some() && !opts.merge.is_empty() {
        return Err(MergeError::DiverseWithTargets);
    }

    let mut sources = Vec::new();
    for path in &opts.sources {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sources.push((Table::read(path)?, opts.correct.contains(&file_name)));
    }
    let translations = Translations::collect(&sources, &opts.ignore);
    if opts.verbose > 0 {
        tracing::info!(
            "Read {} texts in {} languages from {} sources",
            translations.texts.len(),
            translations.languages.len(),
            sources.len()
        );
    }

    fs::create_dir_all(&opts.outdir).map_err(|source| MergeError::Write {
        path: opts.outdir.clone(),
        source,
    })?;

    if opts.merge.is_empty() {
        let table = match &opts.diverse {
            Some(language) => diverse_report(&translations, language),
            None => summary(&translations, opts),
        };
        let file_name = match &opts.diverse {
            Some(language) => format!("diverse-{language}.tsv"),
            None => SUMMARY_FILE_NAME.to_string(),
        };
        return table.write(&opts.outdir.join(file_name));
    }

    for target in &opts.merge {
        let table = merged(&Table::read(target)?, &translations, opts);
        let path = opts.outdir.join(merged_file_name(target));
        table.write(&path)?;
        if opts.verbose > 1 {
            tracing::debug!("Wrote {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_web_form::{FormConfig, InputKind, Kwargs, Value};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn opts(outdir: &Path, sources: Vec<PathBuf>) -> Opts {
        Opts {
            sources,
            merge: vec![],
            correct: vec![],
            no_diverse: false,
            diverse: None,
            add: vec![],
            ignore: vec![],
            carry: false,
            order: RowOrder::Source,
            verbose: 0,
            outdir: outdir.to_path_buf(),
        }
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let table = Table::parse("text\tFrench\tSwahili\nHello\tBonjour\n").unwrap();
        assert_eq!(table.languages, vec!["French", "Swahili"]);
        assert_eq!(table.rows[0], vec!["Hello", "Bonjour", ""]);
        assert_eq!(Table::parse("\n\n"), None);
    }

    #[test]
    fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.tsv", "text\tFrench\nHello\tBonjour\nBye\t\n");
        let b = write(dir.path(), "b.tsv", "text\tSwahili\nHello\tJambo\n");
        let out = dir.path().join("out");

        let mut opts = opts(&out, vec![a, b]);
        opts.carry = true;
        merge(&opts).unwrap();

        let summary = fs::read_to_string(out.join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(
            summary,
            "text\tFrench\tSwahili\nHello\tBonjour\tJambo\nBye\tBye\tBye\n"
        );
    }

    #[test]
    fn test_merge_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "source.tsv", "text\tFrench\nHello\tBonjour\nYes\tOui\n");
        let target = write(dir.path(), "survey.tsv", "text\tFrench\nHello\t\nYes\tD'accord\nNo\t\n");

        let mut opts = opts(dir.path(), vec![source]);
        opts.merge = vec![target];
        opts.add = vec!["Swahili".to_string()];
        merge(&opts).unwrap();

        let merged = fs::read_to_string(dir.path().join("survey-merged.tsv")).unwrap();
        assert_eq!(
            merged,
            "text\tFrench\tSwahili\nHello\tBonjour\t\nYes\tD'accord\t\nNo\t\t\n"
        );
    }

    #[test]
    fn test_trusted_and_diverse_translations() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.tsv", "text\tFrench\nHello\tSalut\n");
        let b = write(dir.path(), "b.tsv", "text\tFrench\nHello\tBonjour\n");
        let sources = vec![(Table::read(&a).unwrap(), false), (Table::read(&b).unwrap(), true)];
        let translations = Translations::collect(&sources, &[]);
        let mut opts = opts(dir.path(), vec![]);

        assert_eq!(translations.resolve("Hello", "French", &opts).as_deref(), Some("Bonjour"));

        let untrusted = Translations::collect(
            &[(Table::read(&a).unwrap(), false), (Table::read(&b).unwrap(), false)],
            &[],
        );
        assert_eq!(untrusted.resolve("Hello", "French", &opts).as_deref(), Some("Salut"));
        opts.no_diverse = true;
        assert_eq!(untrusted.resolve("Hello", "French", &opts), None);

        let report = diverse_report(&untrusted, "French");
        assert_eq!(report.to_tsv(), "text\tFrench 1\tFrench 2\nHello\tSalut\tBonjour\n");
    }

    #[test]
    fn test_diverse_with_targets_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = opts(dir.path(), vec![]);
        opts.diverse = Some("French".to_string());
        opts.merge = vec![dir.path().join("survey.tsv")];
        assert!(matches!(merge(&opts), Err(MergeError::DiverseWithTargets)));
    }

    #[test]
    fn test_web_form_binding() {
        let form = merge_web_form(FormConfig::default()).unwrap();
        assert_eq!(form.destination(), "outdir");

        let sources = form.spec().field("sources").unwrap();
        assert_eq!(sources.input_kind, InputKind::File);
        assert!(sources.multiple);
        assert_eq!(form.spec().field("carry").unwrap().input_kind, InputKind::Checkbox);
        assert_eq!(form.spec().field("order").unwrap().input_kind, InputKind::Select);
        assert_eq!(form.spec().field("verbose").unwrap().input_kind, InputKind::Number);
    }

    #[test]
    fn test_bundled_form_config() {
        let config = FormConfig::from_toml_str(include_str!("../form.toml")).unwrap();
        let form = merge_web_form(config).unwrap();
        let spec = form.spec();

        assert_eq!(spec.title, "Translation Merge");
        let names: Vec<&str> = spec.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["sources", "merge"]);
        assert_eq!(spec.fields[1].label, "Target files");
        assert_eq!(spec.fields[1].input_kind, InputKind::File);
        assert_eq!(spec.advanced_fields.len(), 7);
        assert!(spec.field("outdir").is_none());
    }

    #[test]
    fn test_kwargs_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "source.tsv", "text\tFrench\nHello\tBonjour\n");
        let out = dir.path().join("out");

        let mut kwargs = Kwargs::new();
        kwargs.insert(
            "sources".to_string(),
            Value::List(vec![source.to_string_lossy().into_owned()]),
        );
        kwargs.insert("carry".to_string(), Value::Flag(true));
        kwargs.insert("add".to_string(), Value::List(vec!["Swahili".to_string()]));
        kwargs.insert("outdir".to_string(), Value::Text(out.to_string_lossy().into_owned()));
        merge_kwargs(&kwargs).unwrap();

        let summary = fs::read_to_string(out.join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(summary, "text\tFrench\tSwahili\nHello\tBonjour\tHello\n");

        kwargs.remove("sources");
        let err = merge_kwargs(&kwargs).unwrap_err();
        assert!(err.to_string().contains("SOURCES"));
    }
}
