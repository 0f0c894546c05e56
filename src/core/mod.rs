// src/core/mod.rs

pub mod config;
pub mod duration;
pub mod merge;
pub mod packages;
pub mod paths;
