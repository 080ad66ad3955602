use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims we read from the identity provider's access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdpClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Verifies an access token issued by the identity provider.
///
/// With a shared secret the HS256 signature is checked. Without one only
/// expiry is enforced and the remote store remains responsible for the
/// signature.
pub fn verify_token(token: &str, secret: Option<&str>) -> Result<IdpClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let key = match secret {
        Some(secret) => DecodingKey::from_secret(secret.as_bytes()),
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };

    decode::<IdpClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| e.to_string())
}
