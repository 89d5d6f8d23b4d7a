//! Subcommand implementations.

pub mod clear;
pub mod describe;
pub mod list;
pub mod logs;
pub mod merge;
pub mod run;
pub mod serve;
