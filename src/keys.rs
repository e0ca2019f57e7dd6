//! Signing key material for access and refresh tokens.
//!
//! Access and refresh tokens are signed with two distinct asymmetric key
//! pairs. A [`KeyProvider`] hands out the PEM encoded halves of both pairs;
//! where they come from (environment, a key directory, a secret store) is up
//! to the implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;

/// Which token class a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Access,
    Refresh,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Access => "access",
            KeyKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while fetching key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("{kind} {half} key is not configured")]
    Missing { kind: KeyKind, half: &'static str },

    #[error("{kind} {half} key is not valid base64: {message}")]
    InvalidEncoding {
        kind: KeyKind,
        half: &'static str,
        message: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of the PEM encoded signing and verification keys.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// PEM encoded private key used to sign tokens of `kind`.
    async fn fetch_private_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError>;

    /// PEM encoded public key used to verify tokens of `kind`.
    async fn fetch_public_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError>;
}

/// PEM halves of one key pair.
#[derive(Clone)]
pub struct PemPair {
    pub private_pem: Vec<u8>,
    pub public_pem: Vec<u8>,
}

impl PemPair {
    pub fn new(private_pem: impl Into<Vec<u8>>, public_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            private_pem: private_pem.into(),
            public_pem: public_pem.into(),
        }
    }
}

/// Key material held in memory, usually loaded from configuration.
#[derive(Clone)]
pub struct StaticKeyProvider {
    access: PemPair,
    refresh: PemPair,
}

impl StaticKeyProvider {
    pub fn new(access: PemPair, refresh: PemPair) -> Self {
        Self { access, refresh }
    }

    /// Build from base64 encoded PEM strings, the format used for keys passed
    /// through environment variables.
    pub fn from_base64(
        access_private: &str,
        access_public: &str,
        refresh_private: &str,
        refresh_public: &str,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            access: PemPair::new(
                decode_base64(KeyKind::Access, "private", access_private)?,
                decode_base64(KeyKind::Access, "public", access_public)?,
            ),
            refresh: PemPair::new(
                decode_base64(KeyKind::Refresh, "private", refresh_private)?,
                decode_base64(KeyKind::Refresh, "public", refresh_public)?,
            ),
        })
    }

    fn pair(&self, kind: KeyKind) -> &PemPair {
        match kind {
            KeyKind::Access => &self.access,
            KeyKind::Refresh => &self.refresh,
        }
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn fetch_private_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError> {
        let pem = &self.pair(kind).private_pem;
        if pem.is_empty() {
            return Err(KeyError::Missing {
                kind,
                half: "private",
            });
        }
        Ok(pem.clone())
    }

    async fn fetch_public_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError> {
        let pem = &self.pair(kind).public_pem;
        if pem.is_empty() {
            return Err(KeyError::Missing {
                kind,
                half: "public",
            });
        }
        Ok(pem.clone())
    }
}

/// Reads `{kind}_private.pem` and `{kind}_public.pem` from a directory.
#[derive(Debug, Clone)]
pub struct DirectoryKeyProvider {
    dir: PathBuf,
}

impl DirectoryKeyProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, kind: KeyKind, half: &'static str) -> Result<Vec<u8>, KeyError> {
        let path = self.dir.join(format!("{}_{}.pem", kind.as_str(), half));
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Err(KeyError::Missing { kind, half }),
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(KeyError::Missing { kind, half })
            }
            Err(source) => Err(KeyError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl KeyProvider for DirectoryKeyProvider {
    async fn fetch_private_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError> {
        self.read(kind, "private").await
    }

    async fn fetch_public_key(&self, kind: KeyKind) -> Result<Vec<u8>, KeyError> {
        self.read(kind, "public").await
    }
}

fn decode_base64(kind: KeyKind, half: &'static str, value: &str) -> Result<Vec<u8>, KeyError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KeyError::Missing { kind, half });
    }
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| KeyError::InvalidEncoding {
            kind,
            half,
            message: e.to_string(),
        })
}
