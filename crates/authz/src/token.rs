use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Claims carried by an access token. The subject is the user's email; roles
/// are resolved from storage on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header is missing")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    MalformedHeader,

    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and validates HS256 access tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiration_secs: u64,
}

impl TokenService {
    pub fn new(secret: &[u8], expiration_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            expiration_secs,
        }
    }

    /// Issue a token for `subject` valid from now.
    pub fn generate(&self, subject: &str) -> Result<String, TokenError> {
        self.generate_at(subject, jsonwebtoken::get_current_timestamp())
    }

    /// Issue a token as if the current time were `issued_at` (unix seconds).
    pub fn generate_at(&self, subject: &str, issued_at: u64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.expiration_secs),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify the signature and expiry of `token` and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiration_secs", &self.expiration_secs)
            .finish_non_exhaustive()
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, TokenError> {
    let header = header.ok_or(TokenError::MissingHeader)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(TokenError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(TokenError::MalformedHeader);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_validates_with_subject() {
        let service = TokenService::new(SECRET, 60);
        let token = service.generate("user1@email.com").unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, "user1@email.com");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn huge_lifetime_saturates_instead_of_overflowing() {
        let service = TokenService::new(SECRET, u64::MAX);
        let token = service.generate("user1@email.com").unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.exp, u64::MAX);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new(SECRET, 60);
        let long_ago = jsonwebtoken::get_current_timestamp() - 3600;
        let token = service.generate_at("user1@email.com", long_ago).unwrap();

        assert!(matches!(service.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new(b"another-secret-another-secret-000", 60);
        let verifier = TokenService::new(SECRET, 60);
        let token = issuer.generate("admin@admin.com").unwrap();

        assert!(matches!(verifier.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = TokenService::new(SECRET, 60);
        assert!(matches!(
            service.validate("not-a-jwt"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(
            extract_bearer(None),
            Err(TokenError::MissingHeader)
        ));
        assert!(matches!(
            extract_bearer(Some("Basic dXNlcjpwYXNz")),
            Err(TokenError::MalformedHeader)
        ));
        assert!(matches!(
            extract_bearer(Some("Bearer   ")),
            Err(TokenError::MalformedHeader)
        ));
    }
}
