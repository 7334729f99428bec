pub use routine_core::config::*;

use anyhow::Result;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> Result<AppConfig> {
    let remote = match (&cli.remote_url, &cli.remote_key) {
        (Some(url), Some(key)) => Some(RemoteConfig::new(url.as_str(), key.as_str())?),
        _ => None,
    };
    AppConfig::discover(cli.data_dir.clone(), remote)
}
