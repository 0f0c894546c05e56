use crate::{
    cli::CommandLineArgs,
    constants::CONFIG_FILENAME,
    core::{
        config::Config,
        paths::{default_output_dir, prepare_output_dir},
    },
    system::{executor::ExecutionError, mmdebstrap::Mmdebstrap},
};
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

/// Assembles the configuration of one build without touching the disk
/// beyond reading the configuration files.
pub fn resolve_config(args: &CommandLineArgs) -> Result<Config> {
    let mut config = Config::new();
    config.add_command_line_arguments(args)?;
    config.check()?;
    config.sanitize_packages()?;

    if config.name().is_none() {
        return Err(anyhow!(
            "Missing mandatory option: name. \
             Please specify it via --name or in a configuration file."
        ));
    }

    if config.source_date_epoch()?.is_none() {
        config.set_source_date_epoch(None)?;
    }
    Ok(config)
}

/// The directory the build writes into.
pub fn output_dir(args: &CommandLineArgs, config: &Config) -> PathBuf {
    match &args.output {
        Some(output) => output.clone(),
        None => default_output_dir(&args.output_base_dir, config.name().unwrap_or_default()),
    }
}

///
/// Main entry point of a bdebstrap run: merge the configuration, prepare the
/// output directory, save the effective configuration and call mmdebstrap.
///
pub fn handle(args: CommandLineArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let output_dir = output_dir(&args, &config);
    log::debug!("Output directory: '{}'", output_dir.display());

    prepare_output_dir(&output_dir, args.force, args.simulate)?;

    config
        .save(&output_dir.join(CONFIG_FILENAME), args.simulate)
        .context("Failed to save the effective configuration")?;

    Mmdebstrap::new(&config, args.log_level)
        .with_tmpdir(args.tmpdir.clone())
        .call(&output_dir, args.simulate)?;
    Ok(())
}

/// Exit code of a run that failed after the command line was parsed.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// The message logged for a failed run.
///
/// mmdebstrap reports its own errors on stderr, so its failure only points
/// there; its exit code is not passed on.
pub fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ExecutionError>() {
        Some(ExecutionError::NonZeroExitStatus { code, .. }) => format!(
            "mmdebstrap failed with exit code {}. See above for details.",
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        ),
        _ => format!("{:#}", err),
    }
}

/// Logs a failed run and returns the exit code for the process.
pub fn report_failure(err: &anyhow::Error) -> i32 {
    log::error!("{}", failure_message(err));
    FAILURE_EXIT_CODE
}
