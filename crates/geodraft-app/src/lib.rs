//! GeoDraft Application
//!
//! Operator console for the GeoDraft digitizer: reads pointer and mode
//! commands from the terminal and drives the core workspace against a
//! remote feature store.

mod app;
mod commands;
mod console;

pub use app::{App, AppConfig, AppError};
pub use commands::{Command, CommandError, PointerAction, parse, print_help};
pub use console::ConsoleView;
