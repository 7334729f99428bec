use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

use crate::pagination::DEFAULT_PAGE_SIZE;

static DEFAULT_DB_NAME: &str = "routine.sqlite3";
static ENV_DATA_DIR: &str = "ROUTINE_DATA_DIR";
static ENV_REMOTE_URL: &str = "ROUTINE_REMOTE_URL";
static ENV_REMOTE_KEY: &str = "ROUTINE_REMOTE_KEY";
static ENV_REMOTE_TOKEN: &str = "ROUTINE_REMOTE_TOKEN";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "weekly-routine", "weekly-routine"));

/// Connection details for the hosted REST backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    /// Signed-in user's session token; the anon key is used when absent.
    pub access_token: Option<String>,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into().trim().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("Remote url '{}' must start with http:// or https://", url);
        }
        if api_key.is_empty() {
            bail!("Remote api key cannot be empty");
        }
        Ok(Self {
            url,
            api_key,
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|token| !token.trim().is_empty());
        self
    }

    pub fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("access_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    remote: Option<RemoteConfig>,
    page_size: u32,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults. The remote backend comes from the
    /// override or `ROUTINE_REMOTE_URL` / `ROUTINE_REMOTE_KEY`.
    pub fn discover(
        data_dir_override: Option<PathBuf>,
        remote_override: Option<RemoteConfig>,
    ) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let remote = match remote_override {
            Some(remote) => Some(remote),
            None => remote_from_env()?,
        };
        Ok(Self::from_data_dir(data_dir)?.with_remote(remote))
    }

    /// Construct [`AppConfig`] directly from a resolved data directory, with no remote.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self {
            data_dir,
            db_path,
            remote: None,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_remote(mut self, remote: Option<RemoteConfig>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

fn remote_from_env() -> Result<Option<RemoteConfig>> {
    let url = env::var(ENV_REMOTE_URL).ok().filter(|v| !v.trim().is_empty());
    let key = env::var(ENV_REMOTE_KEY).ok().filter(|v| !v.trim().is_empty());
    match (url, key) {
        (Some(url), Some(key)) => {
            let token = env::var(ENV_REMOTE_TOKEN).ok();
            let remote = RemoteConfig::new(url, key)
                .with_context(|| format!("Invalid {ENV_REMOTE_URL}/{ENV_REMOTE_KEY}"))?;
            Ok(Some(remote.with_access_token(token)))
        }
        (Some(_), None) => bail!("{ENV_REMOTE_URL} is set but {ENV_REMOTE_KEY} is missing"),
        (None, Some(_)) => bail!("{ENV_REMOTE_KEY} is set but {ENV_REMOTE_URL} is missing"),
        (None, None) => Ok(None),
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-routine");
        return Ok(dev_dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(base) = BaseDirs::new() {
            return Ok(base.home_dir().join(".weekly-routine"));
        }
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".weekly-routine"));
    }

    Ok(env::current_dir()?.join(".weekly-routine"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_creates_missing_data_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let config = AppConfig::discover(Some(nested.clone()), None).unwrap();
        assert!(nested.exists());
        assert_eq!(config.db_path(), nested.join("routine.sqlite3"));
        assert_eq!(config.page_size(), 8);
    }

    #[test]
    fn remote_config_trims_trailing_slash() {
        let remote = RemoteConfig::new("https://example.supabase.co/", "anon").unwrap();
        assert_eq!(remote.url, "https://example.supabase.co");
        assert_eq!(remote.bearer(), "anon");
    }

    #[test]
    fn remote_config_prefers_session_token() {
        let remote = RemoteConfig::new("https://example.supabase.co", "anon")
            .unwrap()
            .with_access_token(Some("session".into()));
        assert_eq!(remote.bearer(), "session");
    }

    #[test]
    fn remote_config_rejects_bad_url() {
        assert!(RemoteConfig::new("example.supabase.co", "anon").is_err());
        assert!(RemoteConfig::new("https://example.supabase.co", "  ").is_err());
    }

    #[test]
    fn debug_output_hides_keys() {
        let remote = RemoteConfig::new("https://example.supabase.co", "secret-key").unwrap();
        assert!(!format!("{remote:?}").contains("secret-key"));
    }
}
