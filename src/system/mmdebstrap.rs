//! # mmdebstrap Command Renderer
//!
//! Turns a checked `Config` into the argument vector of one `mmdebstrap` call
//! and runs it. Besides the user's options and hooks the renderer adds its own
//! hooks: a staging directory is created inside the chroot before anything
//! else runs, the package manifest is written into it after all user
//! customisation, its content is synced out to the output directory, and it is
//! finally removed so it does not end up in the image.

use crate::constants::{MANIFEST_FILENAME, MMDEBSTRAP, OUTPUT_DIR, STDOUT_TARGET};
use crate::core::config::Config;
use crate::core::paths::clamp_tree;
use crate::models::{HookPhase, LogLevel};
use crate::system::executor::{ExecutionError, execute_command};
use crate::system::quoting::{double_quote, escape_cmd};
use std::path::{Path, PathBuf};

/// Hook phases in the order their user hooks are emitted after the options.
/// Essential hooks are emitted earlier, right after the staging hook.
const LATE_PHASES: [HookPhase; 4] = [
    HookPhase::Setup,
    HookPhase::Extract,
    HookPhase::Customize,
    HookPhase::Cleanup,
];

#[derive(Debug)]
pub struct Mmdebstrap<'a> {
    config: &'a Config,
    log_level: LogLevel,
    tmpdir: Option<PathBuf>,
}

impl<'a> Mmdebstrap<'a> {
    pub fn new(config: &'a Config, log_level: LogLevel) -> Self {
        Self {
            config,
            log_level,
            tmpdir: None,
        }
    }

    /// Exports `TMPDIR` to mmdebstrap.
    pub fn with_tmpdir(mut self, tmpdir: Option<PathBuf>) -> Self {
        self.tmpdir = tmpdir;
        self
    }

    fn verbosity_flag(&self) -> Option<&'static str> {
        match self.log_level {
            LogLevel::Debug => Some("--debug"),
            LogLevel::Info => Some("-v"),
            LogLevel::Warning => None,
            LogLevel::Error => Some("-q"),
        }
    }

    fn push_option(params: &mut Vec<String>, option: &str, value: &str) {
        params.push(format!("--{}={}", option, value));
    }

    /// Builds the full mmdebstrap argument vector. Has no side effects.
    pub fn construct_parameters(&self, output_dir: &Path, dry_run: bool) -> Vec<String> {
        let config = self.config;
        let mut params = vec![MMDEBSTRAP.to_string()];

        if dry_run {
            params.push("--simulate".to_string());
        } else if let Some(flag) = self.verbosity_flag() {
            params.push(flag.to_string());
        }

        for key in ["format", "variant", "mode"] {
            if let Some(value) = config.mmdebstrap_str(key) {
                Self::push_option(&mut params, key, value);
            }
        }
        for keyring in config.mmdebstrap_list("keyrings") {
            Self::push_option(&mut params, "keyring", keyring);
        }
        for architecture in config.mmdebstrap_list("architectures") {
            Self::push_option(&mut params, "architectures", architecture);
        }

        Self::push_option(
            &mut params,
            HookPhase::Essential.mmdebstrap_option(),
            &format!("mkdir -p \"$1{}\"", OUTPUT_DIR),
        );
        for hook in config.mmdebstrap_list(HookPhase::Essential.config_key()) {
            Self::push_option(&mut params, HookPhase::Essential.mmdebstrap_option(), hook);
        }

        for aptopt in config.mmdebstrap_list("aptopts") {
            Self::push_option(&mut params, "aptopt", aptopt);
        }
        if let Some(recommends) = config.mmdebstrap_bool("install-recommends") {
            Self::push_option(
                &mut params,
                "aptopt",
                &format!("Apt::Install-Recommends \"{}\"", recommends),
            );
        }
        for dpkgopt in config.mmdebstrap_list("dpkgopts") {
            Self::push_option(&mut params, "dpkgopt", dpkgopt);
        }

        let packages = config.mmdebstrap_list("packages");
        if !packages.is_empty() {
            Self::push_option(&mut params, "include", &packages.join(","));
        }
        let components = config.mmdebstrap_list("components");
        if !components.is_empty() {
            Self::push_option(&mut params, "components", &components.join(","));
        }

        for phase in LATE_PHASES {
            for hook in config.mmdebstrap_list(phase.config_key()) {
                Self::push_option(&mut params, phase.mmdebstrap_option(), hook);
            }
        }

        let customize = HookPhase::Customize.mmdebstrap_option();
        if let Some(hostname) = config.mmdebstrap_str("hostname") {
            Self::push_option(
                &mut params,
                customize,
                &format!("echo {} > \"$1/etc/hostname\"", double_quote(hostname)),
            );
        }
        Self::push_option(
            &mut params,
            customize,
            &format!(
                "chroot \"$1\" dpkg-query -f='${{Package}}\\t${{Version}}\\n' -W > \"$1{}/{}\"",
                OUTPUT_DIR, MANIFEST_FILENAME
            ),
        );
        Self::push_option(
            &mut params,
            customize,
            &format!(
                "sync-out {} {}",
                double_quote(OUTPUT_DIR),
                double_quote(&output_dir.display().to_string())
            ),
        );
        Self::push_option(
            &mut params,
            customize,
            &format!("rm -rf \"$1{}\"", OUTPUT_DIR),
        );

        let mirrors = config.mmdebstrap_list("mirrors");
        if let Some(suite) = config.mmdebstrap_str("suite") {
            params.push(suite.to_string());
        }
        match config.mmdebstrap_str("target") {
            Some(target) => params.push(target.to_string()),
            None if !mirrors.is_empty() => params.push(STDOUT_TARGET.to_string()),
            None => {}
        }
        params.extend(mirrors.into_iter().map(str::to_string));

        params
    }

    /// Environment passed to mmdebstrap and its hooks.
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = self.config.env_items();
        if let Some(tmpdir) = &self.tmpdir {
            env.push(("TMPDIR".to_string(), tmpdir.display().to_string()));
        }
        env
    }

    /// Runs mmdebstrap for `output_dir` and clamps the modification times of
    /// the produced files to `SOURCE_DATE_EPOCH` afterwards.
    ///
    /// mmdebstrap is started inside the output directory so that a relative
    /// target ends up there. In dry run nothing on disk is touched.
    pub fn call(&self, output_dir: &Path, dry_run: bool) -> Result<(), ExecutionError> {
        let output_dir =
            std::path::absolute(output_dir).unwrap_or_else(|_| output_dir.to_path_buf());
        let params = self.construct_parameters(&output_dir, dry_run);
        let env = self.env();

        let env_prefix: Vec<String> = env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        log::info!("Calling {} {}", escape_cmd(&env_prefix), escape_cmd(&params));

        let cwd = (!dry_run).then_some(output_dir.as_path());
        execute_command(&params, &env, cwd)?;

        if !dry_run {
            let epoch = match self.config.source_date_epoch() {
                Ok(epoch) => epoch,
                Err(e) => {
                    log::error!("{}", e);
                    None
                }
            };
            let clamped = clamp_tree(&output_dir, epoch);
            log::debug!("Clamped modification time of {} entries.", clamped);
        }
        Ok(())
    }
}
