//! CLI command handlers, one file per subcommand.

mod inspect;
mod run;

pub use inspect::run_inspect;
pub use run::run_harvest;
