use crate::auth::jwt::verify_token;
use crate::config::Config;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use tracing::debug;

/// Caller identity forwarded to the remote store.
///
/// Never rejects a request: anything short of a valid bearer token becomes
/// `Anonymous` and outbound calls go out without `Authorization`.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    Anonymous,
    Bearer { token: String, subject: String },
}

impl Credential {
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credential::Anonymous => None,
            Credential::Bearer { token, .. } => Some(token),
        }
    }

    pub fn from_header(header: Option<&str>, secret: Option<&str>) -> Self {
        let token = match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(t) if !t.trim().is_empty() => t.trim(),
            _ => return Credential::Anonymous,
        };

        match verify_token(token, secret) {
            Ok(claims) => Credential::Bearer {
                token: token.to_string(),
                subject: claims.sub,
            },
            Err(e) => {
                debug!(error = %e, "Ignoring invalid bearer token");
                Credential::Anonymous
            }
        }
    }
}

impl FromRequest for Credential {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(Ok(Credential::from_header(
            header,
            config.idp_jwt_secret.as_deref(),
        )))
    }
}
