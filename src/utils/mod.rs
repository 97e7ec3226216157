//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process execution with error handling
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell quoting for echoed command lines

pub mod command;
pub mod io;
pub mod shell;
