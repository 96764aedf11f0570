//! CLI command handlers, one file per command.

mod completions;
mod formats;
mod man;
mod serve;
mod worker;

pub use completions::run_completions;
pub use formats::run_formats;
pub use man::run_man;
pub use serve::run_serve;
pub use worker::run_worker;
