// Access check for guarded routes
//
// The gate is a trait so deployments can swap in their own identity check;
// the default validates an HS256 bearer token against AUTH_JWT_SECRET.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::AppState;
use crate::types::{AppError, AppResult};

/// The caller an [`AccessGate`] let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

pub trait AccessGate: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> AppResult<Principal>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub struct JwtGate {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtGate {
    /// Without a secret every request is refused.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            key: secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl AccessGate for JwtGate {
    fn authorize(&self, headers: &HeaderMap) -> AppResult<Principal> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("access is not configured".to_string()))?;

        let token = bearer_token(headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized("invalid token".to_string())
        })?;

        Ok(Principal {
            subject: data.claims.sub,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Runs the configured gate and hands the [`Principal`] to the handler as an extension.
pub async fn require_access(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.access_gate.authorize(req.headers()) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => e.into_response_for(state.config.server.environment),
    }
}
