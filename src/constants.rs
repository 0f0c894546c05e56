// src/constants.rs

/// The name of the delegate program that builds the chroot.
pub const MMDEBSTRAP: &str = "mmdebstrap";

/// The key of the delegate tool's option namespace in the configuration.
pub const MMDEBSTRAP_KEY: &str = "mmdebstrap";

/// The top-level key holding the extra environment variables for hooks.
pub const ENV_KEY: &str = "env";

/// The top-level key holding the name of the build.
pub const NAME_KEY: &str = "name";

/// Staging directory inside the chroot where hooks collect build artifacts.
pub const OUTPUT_DIR: &str = "/tmp/bdebstrap-output";

/// Directory containing the hook scripts shipped with bdebstrap.
pub const HOOKS_DIR: &str = "/usr/share/bdebstrap/hooks";

/// The name of the effective configuration file written into the output directory.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// The name of the package manifest produced inside the staging directory.
pub const MANIFEST_FILENAME: &str = "manifest";

/// Prefix for the environment variables exported to the hooks.
pub const ENV_PREFIX: &str = "BDEBSTRAP_";

/// The environment variable carrying the reproducibility epoch.
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

/// Target token telling mmdebstrap to write the tarball to standard output.
pub const STDOUT_TARGET: &str = "-";
