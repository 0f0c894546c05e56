//! # System Interaction Layer
//!
//! The boundary between the configuration logic and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns an external program with an extra environment and
//!   inherited stdio, and reports a non-zero exit as a typed error.
//! - **`mmdebstrap`**: renders a `Config` into the `mmdebstrap` argument vector,
//!   runs it and clamps the modification times of the produced files.
//! - **`quoting`**: shell quoting for values embedded in hook command lines and
//!   for logging the executed command.

pub mod executor;
pub mod mmdebstrap;
pub mod quoting;
