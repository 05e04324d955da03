//! Basic-auth credentials.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Username and API key pair, fixed for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    api_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Base64 of the UTF-8 bytes of `username:api_key`.
    pub fn basic_token(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.api_key))
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.basic_token())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
