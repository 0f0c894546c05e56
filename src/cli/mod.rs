use crate::models::LogLevel;
use args::{ListArg, parse_comma_list, parse_env, parse_single, parse_word_list};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

pub mod args;
pub mod handlers;

pub use args::CommandLineArgs;

/// bdebstrap: YAML config based multi-mirror Debian chroot creation tool.
///
/// Configuration files are merged in the given order; command-line options are
/// applied on top. List options accumulate, single-valued options override.
#[derive(Parser, Debug)]
#[command(name = "bdebstrap", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("log_level").multiple(false)))]
pub struct Cli {
    /// Read configuration from the given YAML file (can be specified multiple times).
    #[arg(short = 'c', long = "config", value_name = "CONFIG", value_parser = parse_single)]
    pub config: Vec<ListArg>,

    /// Name of the generated golden image.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Add an additional environment variable (KEY=VALUE) for the hooks.
    #[arg(short = 'e', long = "env", value_name = "ENV", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// The output directory (default: output-base-dir + name).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// The base output directory.
    #[arg(short = 'b', long, default_value = ".")]
    pub output_base_dir: PathBuf,

    /// Remove existing output directory before creating a new one.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Run apt-get with --simulate (only the package cache is initialized).
    #[arg(long, visible_alias = "dry-run")]
    pub simulate: bool,

    /// Temporary directory for building the image.
    #[arg(short = 't', long)]
    pub tmpdir: Option<PathBuf>,

    /// In addition to the output of --verbose, write detailed debugging output.
    #[arg(long, group = "log_level")]
    pub debug: bool,

    /// Print more information.
    #[arg(short = 'v', long, group = "log_level")]
    pub verbose: bool,

    /// Do not write anything to standard error except errors.
    #[arg(short = 'q', long, group = "log_level")]
    pub quiet: bool,

    /// Same as --quiet.
    #[arg(short = 's', long, group = "log_level")]
    pub silent: bool,

    // --- mmdebstrap options ---
    /// Choose which package set to install.
    #[arg(long)]
    pub variant: Option<String>,

    /// Choose how to perform the chroot operation and create a filesystem with ownership information different from the current user.
    #[arg(long)]
    pub mode: Option<String>,

    /// Choose the output format.
    #[arg(long)]
    pub format: Option<String>,

    /// Pass arbitrary options to apt (can be specified multiple times).
    #[arg(long, value_name = "APTOPT", value_parser = parse_single)]
    pub aptopt: Option<Vec<ListArg>>,

    /// Change the default keyring to use by apt (can be specified multiple times).
    #[arg(long, value_name = "KEYRING", value_parser = parse_single)]
    pub keyring: Option<Vec<ListArg>>,

    /// Pass arbitrary options to dpkg (can be specified multiple times).
    #[arg(long, value_name = "DPKGOPT", value_parser = parse_single)]
    pub dpkgopt: Option<Vec<ListArg>>,

    /// Write the given hostname into /etc/hostname in the chroot.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Consider recommended packages as a dependency for installing.
    #[arg(long)]
    pub install_recommends: bool,

    /// Comma or whitespace separated list of packages to install.
    #[arg(long, visible_alias = "include", value_name = "PACKAGES", value_parser = parse_word_list)]
    pub packages: Option<Vec<ListArg>>,

    /// Comma or whitespace separated list of components like main, contrib and non-free.
    #[arg(long, value_parser = parse_word_list)]
    pub components: Option<Vec<ListArg>>,

    /// Comma or whitespace separated list of architectures.
    #[arg(long, value_parser = parse_word_list)]
    pub architectures: Option<Vec<ListArg>>,

    /// Execute arbitrary commands right after initial setup.
    #[arg(long, value_name = "COMMAND", value_parser = parse_single)]
    pub setup_hook: Option<Vec<ListArg>>,

    /// Execute arbitrary commands after the Essential:yes packages have been extracted.
    #[arg(long, value_name = "COMMAND", value_parser = parse_single)]
    pub extract_hook: Option<Vec<ListArg>>,

    /// Execute arbitrary commands after the Essential:yes packages have been installed.
    #[arg(long, value_name = "COMMAND", value_parser = parse_single)]
    pub essential_hook: Option<Vec<ListArg>>,

    /// Execute arbitrary commands after the chroot is set up and all packages got installed.
    #[arg(long, value_name = "COMMAND", value_parser = parse_single)]
    pub customize_hook: Option<Vec<ListArg>>,

    /// Execute arbitrary commands right before the output is created.
    #[arg(long, value_name = "COMMAND", value_parser = parse_single)]
    pub cleanup_hook: Option<Vec<ListArg>>,

    /// The suite may be a valid release code name (eg, sid, stretch, jessie) or a symbolic name (eg, unstable, testing, stable, oldstable).
    #[arg(long)]
    pub suite: Option<String>,

    /// The optional target argument can either be the path to a directory, the path to a tarball filename, the path to a squashfs image or '-'.
    #[arg(long)]
    pub target: Option<String>,

    /// Comma separated list of mirrors (can be specified multiple times).
    #[arg(long, value_parser = parse_comma_list)]
    pub mirrors: Option<Vec<ListArg>>,

    /// Suite (overrides --suite).
    #[arg(value_name = "SUITE")]
    pub suite_positional: Option<String>,

    /// Target (overrides --target).
    #[arg(value_name = "TARGET")]
    pub target_positional: Option<String>,

    /// Mirrors (appended to --mirrors).
    #[arg(value_name = "MIRRORS", value_parser = parse_comma_list)]
    pub mirrors_positional: Vec<ListArg>,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Info
        } else if self.quiet || self.silent {
            LogLevel::Error
        } else {
            LogLevel::Warning
        }
    }

    /// Normalises the clap result into `CommandLineArgs`.
    ///
    /// Positional arguments only win when they were actually given: an absent
    /// positional is `None` and never masks `--suite` or `--target`.
    pub fn into_args(self) -> CommandLineArgs {
        let log_level = self.log_level();

        let positional_mirrors = if self.mirrors_positional.is_empty() {
            None
        } else {
            args::flatten(Some(self.mirrors_positional))
        };
        let mirrors = match (args::flatten(self.mirrors), positional_mirrors) {
            (None, None) => None,
            (optional, positional) => {
                let mut all = optional.unwrap_or_default();
                all.extend(positional.unwrap_or_default());
                Some(all)
            }
        };

        CommandLineArgs {
            config: args::flatten(Some(self.config))
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            name: self.name,
            env: self.env,
            output: self.output,
            output_base_dir: self.output_base_dir,
            force: self.force,
            simulate: self.simulate,
            tmpdir: self.tmpdir,
            log_level,
            variant: self.variant,
            mode: self.mode,
            format: self.format,
            hostname: self.hostname,
            suite: self.suite_positional.or(self.suite),
            target: self.target_positional.or(self.target),
            install_recommends: self.install_recommends,
            aptopt: args::flatten(self.aptopt),
            keyring: args::flatten(self.keyring),
            dpkgopt: args::flatten(self.dpkgopt),
            packages: args::flatten(self.packages),
            components: args::flatten(self.components),
            architectures: args::flatten(self.architectures),
            mirrors,
            setup_hook: args::flatten(self.setup_hook),
            extract_hook: args::flatten(self.extract_hook),
            essential_hook: args::flatten(self.essential_hook),
            customize_hook: args::flatten(self.customize_hook),
            cleanup_hook: args::flatten(self.cleanup_hook),
        }
    }
}

/// Parses an argument vector (including the program name) into `CommandLineArgs`.
pub fn parse_args<I, T>(argv: I) -> Result<CommandLineArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(argv).map(Cli::into_args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(params: &[&str]) -> CommandLineArgs {
        let mut argv = vec!["bdebstrap"];
        argv.extend_from_slice(params);
        parse_args(argv).unwrap()
    }

    fn strings(items: &[&str]) -> Option<Vec<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_no_args() {
        assert_eq!(parse(&[]), CommandLineArgs::default());
    }

    #[test]
    fn test_debug() {
        assert_eq!(parse(&["--debug"]).log_level, LogLevel::Debug);
        assert_eq!(parse(&["-v"]).log_level, LogLevel::Info);
        assert_eq!(parse(&["--silent"]).log_level, LogLevel::Error);
    }

    #[test]
    fn test_conflicting_log_levels() {
        let result = parse_args(["bdebstrap", "--debug", "--quiet"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_args() {
        let args = parse(&[
            "--aptopt=",
            "--architectures=",
            "--cleanup-hook=",
            "--components=",
            "--config=",
            "--customize-hook=",
            "--dpkgopt=",
            "--essential-hook=",
            "--extract-hook=",
            "--keyring=",
            "--mirrors=",
            "--packages=",
            "--setup-hook=",
        ]);
        let empty = Some(Vec::new());
        assert_eq!(args.aptopt, empty);
        assert_eq!(args.architectures, empty);
        assert_eq!(args.cleanup_hook, empty);
        assert_eq!(args.components, empty);
        assert!(args.config.is_empty());
        assert_eq!(args.customize_hook, empty);
        assert_eq!(args.dpkgopt, empty);
        assert_eq!(args.essential_hook, empty);
        assert_eq!(args.extract_hook, empty);
        assert_eq!(args.keyring, empty);
        assert_eq!(args.mirrors, empty);
        assert_eq!(args.packages, empty);
        assert_eq!(args.setup_hook, empty);
    }

    #[test]
    fn test_parse_env() {
        let args = parse(&["-e", "KEY=VALUE", "--env", "FOO=bar"]);
        assert_eq!(
            args.env,
            vec![
                ("KEY".to_string(), "VALUE".to_string()),
                ("FOO".to_string(), "bar".to_string())
            ]
        );
    }

    #[test]
    fn test_malformed_env() {
        let err = parse_args(["bdebstrap", "--env", "invalid"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_mirrors_with_spaces() {
        let args = parse(&[
            "--mirrors",
            "  deb http://deb.debian.org/debian unstable main\t ,  \t, deb http://deb.debian.org/debian unstable non-free\t",
            "--mirrors",
            "\tdeb http://deb.debian.org/debian unstable contrib ",
        ]);
        assert_eq!(
            args.mirrors,
            strings(&[
                "deb http://deb.debian.org/debian unstable main",
                "deb http://deb.debian.org/debian unstable non-free",
                "deb http://deb.debian.org/debian unstable contrib",
            ])
        );
    }

    #[test]
    fn test_optional_args() {
        let args = parse(&[
            "--suite",
            "unstable",
            "--target",
            "unstable.tar",
            "--mirrors",
            "deb http://deb.debian.org/debian unstable main,deb http://deb.debian.org/debian unstable non-free",
            "--mirrors",
            "deb http://deb.debian.org/debian unstable contrib",
        ]);
        assert_eq!(args.suite.as_deref(), Some("unstable"));
        assert_eq!(args.target.as_deref(), Some("unstable.tar"));
        assert_eq!(
            args.mirrors,
            strings(&[
                "deb http://deb.debian.org/debian unstable main",
                "deb http://deb.debian.org/debian unstable non-free",
                "deb http://deb.debian.org/debian unstable contrib",
            ])
        );
    }

    #[test]
    fn test_positional_args() {
        let args = parse(&[
            "--suite",
            "bullseye",
            "--target",
            "bullseye.tar",
            "--mirrors",
            "deb http://deb.debian.org/debian unstable main,deb http://deb.debian.org/debian unstable non-free",
            "unstable",
            "unstable.tar",
            "deb http://deb.debian.org/debian unstable contrib",
        ]);
        assert_eq!(args.suite.as_deref(), Some("unstable"));
        assert_eq!(args.target.as_deref(), Some("unstable.tar"));
        assert_eq!(
            args.mirrors,
            strings(&[
                "deb http://deb.debian.org/debian unstable main",
                "deb http://deb.debian.org/debian unstable non-free",
                "deb http://deb.debian.org/debian unstable contrib",
            ])
        );
    }

    #[test]
    fn test_absent_positional_keeps_optional_value() {
        let args = parse(&["--suite", "bookworm", "--target", "bookworm.tar"]);
        assert_eq!(args.suite.as_deref(), Some("bookworm"));
        assert_eq!(args.target.as_deref(), Some("bookworm.tar"));

        let args = parse(&["--target", "bookworm.tar", "sid"]);
        assert_eq!(args.suite.as_deref(), Some("sid"));
        assert_eq!(args.target.as_deref(), Some("bookworm.tar"));
    }

    #[test]
    fn test_split() {
        let args = parse(&[
            "--packages",
            "distro-info ionit,netconsole",
            "--include",
            "openssh-server,restricted-ssh-commands",
            "--components",
            "main,non-free contrib",
            "--architectures",
            "amd64,i386",
        ]);
        assert_eq!(args.architectures, strings(&["amd64", "i386"]));
        assert_eq!(args.components, strings(&["main", "non-free", "contrib"]));
        assert_eq!(
            args.packages,
            strings(&[
                "distro-info",
                "ionit",
                "netconsole",
                "openssh-server",
                "restricted-ssh-commands",
            ])
        );
    }

    #[test]
    fn test_multiple_configs_keep_order() {
        let args = parse(&["-c", "base.yaml", "--config", "override.yaml"]);
        assert_eq!(
            args.config,
            vec![PathBuf::from("base.yaml"), PathBuf::from("override.yaml")]
        );
    }
}
