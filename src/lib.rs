pub use routine_cli::cli;
pub use routine_cli::commands;
pub use routine_cli::config;
pub use routine_cli::{run, run_blocking, AppConfig};

pub use routine_core as core;
pub use routine_core::model;
pub use routine_core::services;
