//! JWT token generation and validation.
//!
//! Access tokens carry the user's role and live for 15 minutes. Refresh
//! tokens carry the user id, live for 12 to 24 hours and are tracked in the
//! credential store (one valid refresh token per user). Each class is signed
//! with its own asymmetric key pair, so a leaked key of one class cannot be
//! used to mint tokens of the other.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::UserRole;
use crate::keys::{KeyError, KeyKind, KeyProvider, PemPair};

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Default refresh token duration: 12 hours
pub const DEFAULT_REFRESH_TOKEN_DURATION_SECS: u64 = 12 * 60 * 60;

/// Shortest allowed refresh token duration
pub const MIN_REFRESH_TOKEN_DURATION_SECS: u64 = 12 * 60 * 60;

/// Longest allowed refresh token duration
pub const MAX_REFRESH_TOKEN_DURATION_SECS: u64 = 24 * 60 * 60;

/// How far in the future `nbf` may lie before a token is rejected.
pub const NOT_BEFORE_LEEWAY_SECS: u64 = 30;

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User role
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: u64,
    /// Not valid before (Unix timestamp)
    #[serde(rename = "nbf")]
    pub not_before: u64,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Id of the user the token was issued to
    #[serde(rename = "id")]
    pub user_id: String,
    /// Random token id, so two tokens issued in the same second differ
    #[serde(rename = "jti")]
    pub token_id: String,
    #[serde(rename = "iat")]
    pub issued_at: u64,
    #[serde(rename = "nbf")]
    pub not_before: u64,
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

/// Asymmetric signature scheme used for both token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SigningAlgorithm {
    /// Ed25519 signatures
    #[default]
    #[value(name = "eddsa")]
    EdDsa,
    /// RSA PKCS#1 v1.5 with SHA-256
    #[value(name = "rs256")]
    Rs256,
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(algorithm: SigningAlgorithm) -> Self {
        match algorithm {
            SigningAlgorithm::EdDsa => Algorithm::EdDSA,
            SigningAlgorithm::Rs256 => Algorithm::RS256,
        }
    }
}

/// Token lifetimes in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_secs: u64,
    pub refresh_secs: u64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_secs: ACCESS_TOKEN_DURATION_SECS,
            refresh_secs: DEFAULT_REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

impl TokenLifetimes {
    /// Lifetimes with the given refresh duration, clamped to 12..=24 hours.
    pub fn with_refresh_secs(refresh_secs: u64) -> Self {
        Self {
            access_secs: ACCESS_TOKEN_DURATION_SECS,
            refresh_secs: refresh_secs
                .clamp(MIN_REFRESH_TOKEN_DURATION_SECS, MAX_REFRESH_TOKEN_DURATION_SECS),
        }
    }
}

/// Errors that can occur during token operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token could not be parsed or lacks required claims
    #[error("malformed token")]
    Malformed,
    /// The token is past its `exp`
    #[error("token expired")]
    Expired,
    /// Any other validation failure (bad signature, wrong algorithm, ...)
    #[error("token rejected: {0}")]
    Unexpected(String),
    /// Signing or verification key could not be obtained or parsed
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),
    /// Encoding the token failed
    #[error("failed to sign token: {0}")]
    SigningFailure(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_) => Self::Malformed,
            _ => Self::Unexpected(err.to_string()),
        }
    }
}

#[derive(Clone)]
struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Stateless issuer and verifier for access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: SigningAlgorithm,
    access: ClassKeys,
    refresh: ClassKeys,
    lifetimes: TokenLifetimes,
}

impl TokenCodec {
    /// Build a codec from PEM encoded key pairs.
    ///
    /// Fails with `KeyUnavailable` if a key does not parse, if a public key
    /// does not belong to its private key, or if both token classes would be
    /// signed with the same key.
    pub fn from_pems(
        algorithm: SigningAlgorithm,
        access: &PemPair,
        refresh: &PemPair,
        lifetimes: TokenLifetimes,
    ) -> Result<Self, TokenError> {
        if access.private_pem == refresh.private_pem || access.public_pem == refresh.public_pem {
            return Err(TokenError::KeyUnavailable(
                "access and refresh tokens must use distinct key pairs".into(),
            ));
        }

        let codec = Self {
            algorithm,
            access: parse_keys(algorithm, KeyKind::Access, access)?,
            refresh: parse_keys(algorithm, KeyKind::Refresh, refresh)?,
            lifetimes,
        };
        codec.check_key_pairs()?;
        Ok(codec)
    }

    /// Fetch all four keys from a provider and build a codec. Each fetch is
    /// bounded by `timeout`.
    pub async fn load(
        provider: &dyn KeyProvider,
        algorithm: SigningAlgorithm,
        lifetimes: TokenLifetimes,
        timeout: Duration,
    ) -> Result<Self, TokenError> {
        let access = PemPair {
            private_pem: fetch_key(provider, KeyKind::Access, true, timeout).await?,
            public_pem: fetch_key(provider, KeyKind::Access, false, timeout).await?,
        };
        let refresh = PemPair {
            private_pem: fetch_key(provider, KeyKind::Refresh, true, timeout).await?,
            public_pem: fetch_key(provider, KeyKind::Refresh, false, timeout).await?,
        };
        Self::from_pems(algorithm, &access, &refresh, lifetimes)
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Issue an access token for `role`, valid from now.
    pub fn issue_access(&self, role: UserRole) -> Result<String, TokenError> {
        self.issue_access_at(role, unix_now().map_err(TokenError::SigningFailure)?)
    }

    /// Issue an access token as if the clock read `issued_at`.
    pub fn issue_access_at(&self, role: UserRole, issued_at: u64) -> Result<String, TokenError> {
        let claims = AccessClaims {
            role,
            issued_at,
            not_before: issued_at,
            expires_at: issued_at + self.lifetimes.access_secs,
        };
        self.encode(&claims, &self.access.encoding)
    }

    /// Issue a refresh token for the user with the given id, valid from now.
    pub fn issue_refresh(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_refresh_at(user_id, unix_now().map_err(TokenError::SigningFailure)?)
    }

    /// Issue a refresh token as if the clock read `issued_at`.
    pub fn issue_refresh_at(&self, user_id: &str, issued_at: u64) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            user_id: user_id.to_string(),
            token_id: uuid::Uuid::new_v4().to_string(),
            issued_at,
            not_before: issued_at,
            expires_at: issued_at + self.lifetimes.refresh_secs,
        };
        self.encode(&claims, &self.refresh.encoding)
    }

    /// Validate and decode an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode(token, &self.access.decoding)?;
        check_not_before(claims.not_before)?;
        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode(token, &self.refresh.decoding)?;
        check_not_before(claims.not_before)?;
        Ok(claims)
    }

    fn encode<T: Serialize>(&self, claims: &T, key: &EncodingKey) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(self.algorithm.into()), claims, key)
            .map_err(|e| TokenError::SigningFailure(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Result<T, TokenError> {
        // Only the configured algorithm is accepted; `nbf` is checked by hand
        // so that it alone gets a skew tolerance.
        let mut validation = Validation::new(self.algorithm.into());
        validation.leeway = 0;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "iat", "nbf"]);

        let token_data = jsonwebtoken::decode::<T>(token, key, &validation)?;
        Ok(token_data.claims)
    }

    /// Sign and verify a sample token with each pair so a public key that does
    /// not match its private key is caught at startup.
    fn check_key_pairs(&self) -> Result<(), TokenError> {
        let now = unix_now().map_err(TokenError::KeyUnavailable)?;

        let access = self.issue_access_at(UserRole::User, now)?;
        self.verify_access(&access).map_err(|e| {
            TokenError::KeyUnavailable(format!("access key pair does not verify: {}", e))
        })?;

        let refresh = self.issue_refresh_at("key-check", now)?;
        self.verify_refresh(&refresh).map_err(|e| {
            TokenError::KeyUnavailable(format!("refresh key pair does not verify: {}", e))
        })?;

        Ok(())
    }
}

fn parse_keys(
    algorithm: SigningAlgorithm,
    kind: KeyKind,
    pems: &PemPair,
) -> Result<ClassKeys, TokenError> {
    let (encoding, decoding) = match algorithm {
        SigningAlgorithm::EdDsa => (
            EncodingKey::from_ed_pem(&pems.private_pem),
            DecodingKey::from_ed_pem(&pems.public_pem),
        ),
        SigningAlgorithm::Rs256 => (
            EncodingKey::from_rsa_pem(&pems.private_pem),
            DecodingKey::from_rsa_pem(&pems.public_pem),
        ),
    };

    let encoding = encoding.map_err(|e| {
        TokenError::KeyUnavailable(format!("invalid {} private key: {}", kind, e))
    })?;
    let decoding = decoding.map_err(|e| {
        TokenError::KeyUnavailable(format!("invalid {} public key: {}", kind, e))
    })?;

    Ok(ClassKeys { encoding, decoding })
}

async fn fetch_key(
    provider: &dyn KeyProvider,
    kind: KeyKind,
    private: bool,
    timeout: Duration,
) -> Result<Vec<u8>, TokenError> {
    let fetch = async {
        if private {
            provider.fetch_private_key(kind).await
        } else {
            provider.fetch_public_key(kind).await
        }
    };

    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(pem)) => Ok(pem),
        Ok(Err(e)) => Err(TokenError::KeyUnavailable(e.to_string())),
        Err(_) => Err(TokenError::KeyUnavailable(format!(
            "timed out fetching {} key",
            kind
        ))),
    }
}

fn check_not_before(not_before: u64) -> Result<(), TokenError> {
    let now = unix_now().map_err(TokenError::Unexpected)?;
    if not_before > now + NOT_BEFORE_LEEWAY_SECS {
        return Err(TokenError::Unexpected("token not yet valid".into()));
    }
    Ok(())
}

fn unix_now() -> Result<u64, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| "system time error".to_string())
}

impl From<KeyError> for TokenError {
    fn from(err: KeyError) -> Self {
        TokenError::KeyUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const ACCESS_PRIVATE: &[u8] = include_bytes!("../testdata/keys/access_private.pem");
    const ACCESS_PUBLIC: &[u8] = include_bytes!("../testdata/keys/access_public.pem");
    const REFRESH_PRIVATE: &[u8] = include_bytes!("../testdata/keys/refresh_private.pem");
    const REFRESH_PUBLIC: &[u8] = include_bytes!("../testdata/keys/refresh_public.pem");
    const OTHER_PRIVATE: &[u8] = include_bytes!("../testdata/keys/other_private.pem");
    const OTHER_PUBLIC: &[u8] = include_bytes!("../testdata/keys/other_public.pem");
    const RSA_ACCESS_PRIVATE: &[u8] = include_bytes!("../testdata/keys/rsa_access_private.pem");
    const RSA_ACCESS_PUBLIC: &[u8] = include_bytes!("../testdata/keys/rsa_access_public.pem");
    const RSA_REFRESH_PRIVATE: &[u8] =
        include_bytes!("../testdata/keys/rsa_refresh_private.pem");
    const RSA_REFRESH_PUBLIC: &[u8] = include_bytes!("../testdata/keys/rsa_refresh_public.pem");

    fn codec() -> TokenCodec {
        TokenCodec::from_pems(
            SigningAlgorithm::EdDsa,
            &PemPair::new(ACCESS_PRIVATE, ACCESS_PUBLIC),
            &PemPair::new(REFRESH_PRIVATE, REFRESH_PUBLIC),
            TokenLifetimes::default(),
        )
        .unwrap()
    }

    fn now() -> u64 {
        unix_now().unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let codec = codec();

        for role in [UserRole::User, UserRole::Admin] {
            let token = codec.issue_access(role).unwrap();
            let claims = codec.verify_access(&token).unwrap();
            assert_eq!(claims.role, role);
            assert_eq!(claims.not_before, claims.issued_at);
            assert_eq!(
                claims.expires_at - claims.issued_at,
                ACCESS_TOKEN_DURATION_SECS
            );
        }
    }

    #[test]
    fn test_refresh_token_round_trip() {
        let codec = codec();

        let token = codec.issue_refresh("uuid-123").unwrap();
        let claims = codec.verify_refresh(&token).unwrap();

        assert_eq!(claims.user_id, "uuid-123");
        assert_eq!(
            claims.expires_at - claims.issued_at,
            DEFAULT_REFRESH_TOKEN_DURATION_SECS
        );
    }

    #[test]
    fn test_wire_format_uses_short_claim_names() {
        let codec = codec();
        let token = codec.issue_refresh("uuid-123").unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(json["id"], "uuid-123");
        assert!(json["jti"].is_string());
        assert!(json["iat"].is_u64());
        assert!(json["nbf"].is_u64());
        assert!(json["exp"].is_u64());
    }

    #[test]
    fn test_token_classes_not_interchangeable() {
        let codec = codec();

        let access = codec.issue_access(UserRole::Admin).unwrap();
        let refresh = codec.issue_refresh("uuid-123").unwrap();

        assert!(matches!(
            codec.verify_refresh(&access),
            Err(TokenError::Unexpected(_))
        ));
        assert!(matches!(
            codec.verify_access(&refresh),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_refresh_tokens_unique_within_same_second() {
        let codec = codec();
        let now = now();

        let first = codec.issue_refresh_at("uuid-123", now).unwrap();
        let second = codec.issue_refresh_at("uuid-123", now).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_access_token() {
        let codec = codec();
        let issued_at = now() - ACCESS_TOKEN_DURATION_SECS - 60;

        let token = codec.issue_access_at(UserRole::User, issued_at).unwrap();
        assert_eq!(codec.verify_access(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expired_refresh_token() {
        let codec = codec();
        let issued_at = now() - DEFAULT_REFRESH_TOKEN_DURATION_SECS - 1;

        let token = codec.issue_refresh_at("uuid-123", issued_at).unwrap();
        assert_eq!(codec.verify_refresh(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_not_before_within_leeway_accepted() {
        let codec = codec();

        let token = codec.issue_access_at(UserRole::User, now() + 10).unwrap();
        assert!(codec.verify_access(&token).is_ok());
    }

    #[test]
    fn test_not_before_beyond_leeway_rejected() {
        let codec = codec();

        let token = codec.issue_access_at(UserRole::User, now() + 600).unwrap();
        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();

        assert_eq!(codec.verify_access("invalid-token"), Err(TokenError::Malformed));
        assert_eq!(codec.verify_refresh(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        let codec = codec();
        let now = now();

        let claims = serde_json::json!({
            "role": "superuser",
            "iat": now,
            "nbf": now,
            "exp": now + 60,
        });
        let key = EncodingKey::from_ed_pem(ACCESS_PRIVATE).unwrap();
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();

        assert_eq!(codec.verify_access(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_missing_nbf_is_malformed() {
        let codec = codec();
        let now = now();

        let claims = serde_json::json!({ "role": "admin", "iat": now, "exp": now + 60 });
        let key = EncodingKey::from_ed_pem(ACCESS_PRIVATE).unwrap();
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();

        assert_eq!(codec.verify_access(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        let codec = codec();
        let now = now();

        // HMAC keyed with the public key: the classic algorithm confusion attack
        let claims = AccessClaims {
            role: UserRole::Admin,
            issued_at: now,
            not_before: now,
            expires_at: now + 60,
        };
        let key = EncodingKey::from_secret(ACCESS_PUBLIC);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();

        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_foreign_key_rejected() {
        let codec = codec();
        let now = now();

        let claims = AccessClaims {
            role: UserRole::Admin,
            issued_at: now,
            not_before: now,
            expires_at: now + 60,
        };
        let key = EncodingKey::from_ed_pem(OTHER_PRIVATE).unwrap();
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();

        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = codec.issue_access(UserRole::User).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["role"] = "admin".into();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            codec.verify_access(&forged),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_shared_key_pair_rejected() {
        let result = TokenCodec::from_pems(
            SigningAlgorithm::EdDsa,
            &PemPair::new(ACCESS_PRIVATE, ACCESS_PUBLIC),
            &PemPair::new(ACCESS_PRIVATE, ACCESS_PUBLIC),
            TokenLifetimes::default(),
        );
        assert!(matches!(result, Err(TokenError::KeyUnavailable(_))));
    }

    #[test]
    fn test_mismatched_public_key_rejected() {
        let result = TokenCodec::from_pems(
            SigningAlgorithm::EdDsa,
            &PemPair::new(ACCESS_PRIVATE, OTHER_PUBLIC),
            &PemPair::new(REFRESH_PRIVATE, REFRESH_PUBLIC),
            TokenLifetimes::default(),
        );
        assert!(matches!(result, Err(TokenError::KeyUnavailable(_))));
    }

    #[test]
    fn test_invalid_pem_rejected() {
        let result = TokenCodec::from_pems(
            SigningAlgorithm::EdDsa,
            &PemPair::new(b"not a pem".to_vec(), ACCESS_PUBLIC),
            &PemPair::new(REFRESH_PRIVATE, REFRESH_PUBLIC),
            TokenLifetimes::default(),
        );
        assert!(matches!(result, Err(TokenError::KeyUnavailable(_))));
    }

    #[test]
    fn test_rs256_round_trip() {
        let codec = TokenCodec::from_pems(
            SigningAlgorithm::Rs256,
            &PemPair::new(RSA_ACCESS_PRIVATE, RSA_ACCESS_PUBLIC),
            &PemPair::new(RSA_REFRESH_PRIVATE, RSA_REFRESH_PUBLIC),
            TokenLifetimes::with_refresh_secs(24 * 60 * 60),
        )
        .unwrap();

        let access = codec.issue_access(UserRole::Admin).unwrap();
        assert_eq!(codec.verify_access(&access).unwrap().role, UserRole::Admin);

        let refresh = codec.issue_refresh("uuid-123").unwrap();
        let claims = codec.verify_refresh(&refresh).unwrap();
        assert_eq!(claims.expires_at - claims.issued_at, 24 * 60 * 60);
    }

    #[test]
    fn test_algorithm_mismatch_between_codecs() {
        let rsa = TokenCodec::from_pems(
            SigningAlgorithm::Rs256,
            &PemPair::new(RSA_ACCESS_PRIVATE, RSA_ACCESS_PUBLIC),
            &PemPair::new(RSA_REFRESH_PRIVATE, RSA_REFRESH_PUBLIC),
            TokenLifetimes::default(),
        )
        .unwrap();

        let token = rsa.issue_access(UserRole::User).unwrap();
        assert!(matches!(
            codec().verify_access(&token),
            Err(TokenError::Unexpected(_))
        ));
    }

    #[test]
    fn test_key_of_wrong_type_rejected() {
        // Ed25519 keys do not parse as RSA
        let result = TokenCodec::from_pems(
            SigningAlgorithm::Rs256,
            &PemPair::new(RSA_ACCESS_PRIVATE, RSA_ACCESS_PUBLIC),
            &PemPair::new(OTHER_PRIVATE, OTHER_PUBLIC),
            TokenLifetimes::default(),
        );
        assert!(matches!(result, Err(TokenError::KeyUnavailable(_))));
    }

    #[test]
    fn test_refresh_lifetime_clamped() {
        assert_eq!(
            TokenLifetimes::with_refresh_secs(60).refresh_secs,
            MIN_REFRESH_TOKEN_DURATION_SECS
        );
        assert_eq!(
            TokenLifetimes::with_refresh_secs(48 * 60 * 60).refresh_secs,
            MAX_REFRESH_TOKEN_DURATION_SECS
        );
        assert_eq!(
            TokenLifetimes::with_refresh_secs(18 * 60 * 60).refresh_secs,
            18 * 60 * 60
        );
    }

    #[tokio::test]
    async fn test_load_from_provider() {
        use crate::keys::StaticKeyProvider;

        let provider = StaticKeyProvider::new(
            PemPair::new(ACCESS_PRIVATE, ACCESS_PUBLIC),
            PemPair::new(REFRESH_PRIVATE, REFRESH_PUBLIC),
        );
        let codec = TokenCodec::load(
            &provider,
            SigningAlgorithm::EdDsa,
            TokenLifetimes::default(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let token = codec.issue_access(UserRole::Admin).unwrap();
        assert_eq!(codec.verify_access(&token).unwrap().role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_load_missing_key_is_unavailable() {
        use crate::keys::StaticKeyProvider;

        let provider = StaticKeyProvider::new(
            PemPair::new(ACCESS_PRIVATE, ACCESS_PUBLIC),
            PemPair::new(Vec::new(), REFRESH_PUBLIC),
        );
        let result = TokenCodec::load(
            &provider,
            SigningAlgorithm::EdDsa,
            TokenLifetimes::default(),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(TokenError::KeyUnavailable(_))));
    }
}
