//! Bearer-token providers.
//!
//! The engines never look tokens up themselves; callers resolve one through a
//! [`TokenProvider`] and put it on the [`RetrievalRequest`](crate::feed::RetrievalRequest).

use std::fmt;

use crate::feed::normalize_token;

/// Environment variable read by [`EnvToken::default`].
pub const TOKEN_ENV_VAR: &str = "FEED_SDK_TOKEN";

/// Source of an OAuth access token for the feed API.
pub trait TokenProvider: Send + Sync {
    /// Returns the `Authorization` header value (`Bearer ...`), if a token is available.
    fn bearer_token(&self) -> Option<String>;
}

/// A token known up front, e.g. from a command-line flag.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        normalize_token(&self.token)
    }
}

/// A token read from an environment variable on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvToken {
    variable: String,
}

impl EnvToken {
    #[must_use]
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }

    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

impl TokenProvider for EnvToken {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.variable)
            .ok()
            .and_then(|token| normalize_token(&token))
    }
}

/// First provider that yields a token wins.
#[derive(Default)]
pub struct TokenChain {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl TokenChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl TokenProvider for TokenChain {
    fn bearer_token(&self) -> Option<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.bearer_token())
    }
}
