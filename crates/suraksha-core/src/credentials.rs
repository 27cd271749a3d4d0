//! Bearer credential of the acting user.
//!
//! The login flow (outside this crate) stores the session token; the monitor
//! only ever reads it, at the moment an alert is sent.

use std::path::PathBuf;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use crate::config::CredentialsConfig;

/// Source of the session token.
pub trait CredentialStore: Send + Sync {
    /// Current token, or `None` when the user is not logged in.
    fn auth_token(&self) -> BoxFuture<'_, Option<String>>;
}

/// Token held in memory (for example supplied through the environment).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Store holding `token`; blank tokens count as absent.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn auth_token(&self) -> BoxFuture<'_, Option<String>> {
        let token = self.token.clone();
        async move { token }.boxed()
    }
}

/// Token read from a file on every lookup, so a fresh login is picked up
/// without restarting.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store reading `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Platform default token location.
    ///
    /// On Linux: `/var/lib/suraksha/token`; elsewhere the per-user data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Some(PathBuf::from("/var/lib/suraksha/token"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "suraksha")
                .map(|dirs| dirs.data_dir().join("token"))
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn auth_token(&self) -> BoxFuture<'_, Option<String>> {
        async move {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => {
                    let token = content.trim();
                    (!token.is_empty()).then(|| token.to_string())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Cannot read credential file");
                    None
                }
            }
        }
        .boxed()
    }
}

/// Pick the credential source described by the configuration: an explicit
/// token wins over the token file.
#[must_use]
pub fn from_config(config: &CredentialsConfig) -> Box<dyn CredentialStore> {
    if config.token.is_some() {
        return Box::new(StaticCredentials::new(config.token.clone()));
    }
    match config.token_file.clone().or_else(FileCredentialStore::default_path) {
        Some(path) => Box::new(FileCredentialStore::new(path)),
        None => Box::new(StaticCredentials::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let store = StaticCredentials::new(Some("jwt".to_string()));
        assert_eq!(tokio_test::block_on(store.auth_token()), Some("jwt".to_string()));

        let store = StaticCredentials::new(Some("   ".to_string()));
        assert_eq!(tokio_test::block_on(store.auth_token()), None);
    }

    #[tokio::test]
    async fn test_file_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let store = FileCredentialStore::new(path.clone());

        assert_eq!(store.auth_token().await, None);

        std::fs::write(&path, "\n").unwrap();
        assert_eq!(store.auth_token().await, None);

        std::fs::write(&path, "eyJhbGciOiJIUzI1NiJ9.payload.sig\n").unwrap();
        assert_eq!(
            store.auth_token().await,
            Some("eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string())
        );
    }

    #[tokio::test]
    async fn test_explicit_token_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "from-file").unwrap();

        let store = from_config(&CredentialsConfig {
            token_file: Some(path.clone()),
            token: Some("from-env".to_string()),
        });
        assert_eq!(store.auth_token().await, Some("from-env".to_string()));

        let store = from_config(&CredentialsConfig {
            token_file: Some(path),
            token: None,
        });
        assert_eq!(store.auth_token().await, Some("from-file".to_string()));
    }
}
