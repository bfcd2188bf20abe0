//! The caller's session: which key scope to use and how to authenticate.

use sealdrop_remote::AccessToken;
use sealdrop_store::StorageScope;

/// Explicit session passed to every key store and pipeline call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    scope: StorageScope,
    access_token: Option<AccessToken>,
}

impl Session {
    /// A session whose keys live under `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: StorageScope::new(scope),
            access_token: None,
        }
    }

    /// Attach a bearer token for the transfer service.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(AccessToken::new(token));
        self
    }

    pub fn scope(&self) -> &StorageScope {
        &self.scope
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }
}
