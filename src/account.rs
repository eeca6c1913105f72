//! Local accounts linking a POP3 login to upstream token credentials

use crate::error::{Error, Result};
use crate::oauth::Credentials;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.-]+$").expect("username pattern is valid"));

/// Whether `username` may name an account.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

/// A linked account.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// Upstream screen name, also the POP3 user name.
    pub username: String,
    /// Password for the local POP3 service.
    pub password: String,
    pub token: String,
    pub token_secret: String,
}

impl Account {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// The upstream token credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.token.as_str(), self.token_secret.as_str())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Persistent account storage.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up `username` and check `password`.
    async fn get_account(&self, username: &str, password: &str) -> Result<Account>;

    /// Look up `username` without a password check.
    ///
    /// Never fails: an unknown or unreadable account comes back empty
    /// apart from its username, ready to be filled in and saved.
    async fn get_account_no_auth(&self, username: &str) -> Account;

    async fn save(&self, account: &Account) -> Result<()>;
}

/// One file per account under a directory.
///
/// `<dir>/<lower-cased username>.cred` holds the password, token and
/// token secret on consecutive lines.
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    dir: PathBuf,
}

impl FileAccountStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn account_file(&self, username: &str) -> PathBuf {
        self.dir
            .join(format!("{}.cred", username.to_ascii_lowercase()))
    }

    async fn load(&self, username: &str) -> Option<Account> {
        if !is_valid_username(username) {
            return None;
        }
        let contents = tokio::fs::read_to_string(self.account_file(username))
            .await
            .ok()?;
        let fields: Vec<&str> = contents.split('\n').collect();
        if fields.len() < 3 {
            return None;
        }
        Some(Account {
            username: username.to_string(),
            password: fields[0].trim_end_matches('\r').to_string(),
            token: fields[1].trim().to_string(),
            token_secret: fields[2].trim().to_string(),
        })
    }
}

#[async_trait]
impl AccountStore for FileAccountStore {
    async fn get_account(&self, username: &str, password: &str) -> Result<Account> {
        match self.load(username).await {
            Some(account) if !account.password.is_empty() && account.password == password => {
                Ok(account)
            }
            _ => Err(Error::AuthFailed),
        }
    }

    async fn get_account_no_auth(&self, username: &str) -> Account {
        self.load(username)
            .await
            .unwrap_or_else(|| Account::new(username))
    }

    async fn save(&self, account: &Account) -> Result<()> {
        if !is_valid_username(&account.username) {
            return Err(Error::InvalidUsername(account.username.clone()));
        }
        let contents = format!(
            "{}\n{}\n{}\n",
            account.password.replace('\n', ""),
            account.token,
            account.token_secret
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(self.account_file(&account.username)).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
