//! Command-line interface components
//!
//! This module contains CLI-specific code for the weather cache: argument
//! parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, GlobalArgs, RefreshOnceArgs, ServeArgs};
pub use commands::{handle_locations, handle_refresh_once, handle_serve};
