// ABOUTME: Command-line interface module for the renewd application
// ABOUTME: Handles argument parsing, configuration, and application lifecycle

pub mod app;
pub mod args;
pub mod config;

pub use app::App;
pub use args::{AddArgs, Args, Command};
pub use config::Config;
