//! CLI subcommands.

pub mod common;
pub mod config;
pub mod generate;
pub mod resynth;
pub mod track;
