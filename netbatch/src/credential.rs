//! Credentials and credential resolution.
//!
//! The engine never stores credentials. A [`CredentialResolver`] is asked for
//! one right before connecting, the [`Credential`] is moved into the
//! connector and dropped once authentication is done. Secrets are held in
//! [`SecretString`], which is zeroised on drop and redacted in `Debug`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use secrecy::{ExposeSecret, SecretString};

use crate::error::CredentialError;

/// Opaque account identifier, used only as a key into a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Username and secret for a single connection attempt.
#[derive(Debug)]
pub struct Credential {
    username: String,
    secret: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Expose the secret for handing to the transport.
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Lookup of credentials by account.
///
/// `Ok(None)` means no credential is configured for the account; an `Err`
/// means the backend itself could not be queried. Both are fatal for a run
/// and are reported before any network attempt.
pub trait CredentialResolver: Send + Sync {
    fn resolve(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Option<Credential>, CredentialError>> + Send;
}

/// In-memory resolver.
///
/// Useful for embedding and tests. Secrets are stored as [`SecretString`]
/// and copied into a fresh [`Credential`] on every resolve.
#[derive(Default)]
pub struct MemoryResolver {
    entries: HashMap<AccountId, (String, SecretString)>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the credential for an account.
    pub fn with_account(
        mut self,
        account: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.entries.insert(
            AccountId::new(account),
            (username.into(), SecretString::from(secret.into())),
        );
        self
    }
}

impl CredentialResolver for MemoryResolver {
    async fn resolve(&self, account: &AccountId) -> Result<Option<Credential>, CredentialError> {
        Ok(self
            .entries
            .get(account)
            .map(|(user, secret)| Credential::new(user.clone(), secret.expose_secret())))
    }
}

/// Resolver reading `<PREFIX>_<ACCOUNT>_USERNAME` and `<PREFIX>_<ACCOUNT>_SECRET`
/// from the process environment.
///
/// The account is upper-cased and every character outside `[A-Z0-9]` becomes
/// `_`, so account `svc-core` with prefix `NETBATCH` reads
/// `NETBATCH_SVC_CORE_USERNAME`. Both variables must be set.
#[derive(Debug, Clone)]
pub struct EnvResolver {
    prefix: String,
}

impl EnvResolver {
    pub const DEFAULT_PREFIX: &'static str = "NETBATCH";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Names of the username and secret variables for an account.
    pub fn variable_names(&self, account: &AccountId) -> (String, String) {
        let key: String = account
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        (
            format!("{}_{}_USERNAME", self.prefix, key),
            format!("{}_{}_SECRET", self.prefix, key),
        )
    }

    fn read(name: &str) -> Result<Option<String>, CredentialError> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(CredentialError::Backend(format!(
                "environment variable {name} is not valid unicode"
            ))),
        }
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl CredentialResolver for EnvResolver {
    async fn resolve(&self, account: &AccountId) -> Result<Option<Credential>, CredentialError> {
        let (user_var, secret_var) = self.variable_names(account);
        let username = Self::read(&user_var)?;
        let secret = Self::read(&secret_var)?.map(SecretString::from);
        Ok(match (username, secret) {
            (Some(username), Some(secret)) => Some(Credential {
                username,
                secret,
            }),
            _ => None,
        })
    }
}
