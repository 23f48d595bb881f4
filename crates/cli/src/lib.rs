//! `ricemill` command-line front end.

pub mod cli;
pub mod journal;
pub mod replay;
pub mod report;
