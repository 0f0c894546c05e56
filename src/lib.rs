//! bdebstrap: build Debian chroots and golden images from layered YAML
//! configuration files by driving `mmdebstrap`.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
