// src/cli/args.rs

use crate::models::{HookPhase, LogLevel};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

lazy_static! {
    // `KEY=VALUE` where KEY is a valid shell variable name. The value may span lines.
    static ref ENV_RE: Regex = Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)=(.*)$")
        .expect("ENV_RE is a valid regex");
}

/// The values contributed by one occurrence of a list-valued option.
///
/// A single `--packages "a,b c"` yields several entries, while `--packages=`
/// yields none. Keeping the occurrence wrapper lets clap accumulate repeated
/// options before they are flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListArg(pub Vec<String>);

/// One entry per occurrence, no splitting. Used for hooks, apt/dpkg options
/// and keyrings, whose values may legitimately contain commas and spaces.
/// Only the surrounding whitespace is stripped.
pub fn parse_single(value: &str) -> Result<ListArg, String> {
    let value = value.trim();
    if value.is_empty() {
        Ok(ListArg(Vec::new()))
    } else {
        Ok(ListArg(vec![value.to_string()]))
    }
}

/// Splits on commas only. Mirror lines contain spaces, so whitespace is kept
/// inside an entry and only stripped at its ends.
pub fn parse_comma_list(value: &str) -> Result<ListArg, String> {
    Ok(ListArg(
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// Splits on commas and any whitespace.
pub fn parse_word_list(value: &str) -> Result<ListArg, String> {
    Ok(ListArg(
        value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// Parses an `--env KEY=VALUE` entry.
pub fn parse_env(value: &str) -> Result<(String, String), String> {
    let captures = ENV_RE.captures(value).ok_or_else(|| {
        format!(
            "Failed to parse '{}'. The environment variable must be specified as KEY=VALUE.",
            value
        )
    })?;
    let key = captures.get(1).map_or("", |m| m.as_str());
    let val = captures.get(2).map_or("", |m| m.as_str());
    Ok((key.to_string(), val.to_string()))
}

/// Concatenates all occurrences of a list option.
/// `None` stays `None`: the option was not given and must not override anything.
pub fn flatten(occurrences: Option<Vec<ListArg>>) -> Option<Vec<String>> {
    occurrences.map(|lists| lists.into_iter().flat_map(|list| list.0).collect())
}

/// The parsed command line in a flat, clap-independent form.
///
/// List fields distinguish "not given" (`None`) from "given but empty"
/// (`Some(vec![])`): the first leaves configuration file values alone, the
/// second clears them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineArgs {
    pub config: Vec<PathBuf>,
    pub name: Option<String>,
    pub env: Vec<(String, String)>,
    pub output: Option<PathBuf>,
    pub output_base_dir: PathBuf,
    pub force: bool,
    pub simulate: bool,
    pub tmpdir: Option<PathBuf>,
    pub log_level: LogLevel,

    pub variant: Option<String>,
    pub mode: Option<String>,
    pub format: Option<String>,
    pub hostname: Option<String>,
    pub suite: Option<String>,
    pub target: Option<String>,
    pub install_recommends: bool,

    pub aptopt: Option<Vec<String>>,
    pub keyring: Option<Vec<String>>,
    pub dpkgopt: Option<Vec<String>>,
    pub packages: Option<Vec<String>>,
    pub components: Option<Vec<String>>,
    pub architectures: Option<Vec<String>>,
    pub mirrors: Option<Vec<String>>,

    pub setup_hook: Option<Vec<String>>,
    pub extract_hook: Option<Vec<String>>,
    pub essential_hook: Option<Vec<String>>,
    pub customize_hook: Option<Vec<String>>,
    pub cleanup_hook: Option<Vec<String>>,
}

impl Default for CommandLineArgs {
    fn default() -> Self {
        Self {
            config: Vec::new(),
            name: None,
            env: Vec::new(),
            output: None,
            output_base_dir: PathBuf::from("."),
            force: false,
            simulate: false,
            tmpdir: None,
            log_level: LogLevel::default(),
            variant: None,
            mode: None,
            format: None,
            hostname: None,
            suite: None,
            target: None,
            install_recommends: false,
            aptopt: None,
            keyring: None,
            dpkgopt: None,
            packages: None,
            components: None,
            architectures: None,
            mirrors: None,
            setup_hook: None,
            extract_hook: None,
            essential_hook: None,
            customize_hook: None,
            cleanup_hook: None,
        }
    }
}

impl CommandLineArgs {
    /// Hooks given on the command line for one lifecycle phase.
    pub fn hooks(&self, phase: HookPhase) -> Option<&Vec<String>> {
        match phase {
            HookPhase::Setup => self.setup_hook.as_ref(),
            HookPhase::Extract => self.extract_hook.as_ref(),
            HookPhase::Essential => self.essential_hook.as_ref(),
            HookPhase::Customize => self.customize_hook.as_ref(),
            HookPhase::Cleanup => self.cleanup_hook.as_ref(),
        }
    }
}
