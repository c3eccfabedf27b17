//! CLI library components for `imms-batch`.

pub mod cli;
pub mod commands;
pub mod logging;
