//! Bearer credential verification for the recruiter-facing routes.
//!
//! Tokens are HS256 JWTs issued by the HR backend's auth service. Issuance is
//! not handled here; this module only verifies and interprets the claims.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Recruiter,
    Employee,
}

impl Role {
    /// Roles allowed to start, read, message and close screening sessions.
    pub fn can_screen(self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::Recruiter)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User e-mail or id.
    pub sub: String,
    pub role: Role,
    pub tenant_id: Uuid,
    pub exp: usize,
}

impl Claims {
    /// Role and tenant check shared by every authenticated operation.
    pub fn authorize(&self, tenant_id: Uuid) -> Result<(), AppError> {
        if !self.role.can_screen() {
            debug!("Rejecting {}: role {:?} cannot screen", self.sub, self.role);
            return Err(AppError::Forbidden);
        }
        if self.tenant_id != tenant_id {
            debug!("Rejecting {}: tenant mismatch", self.sub);
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Bearer token rejected: {e}");
                AppError::Unauthorized
            })
    }
}

/// Extractor for an authenticated caller. Rejects with 401 on a missing or invalid token.
pub struct Bearer(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for Bearer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;
        Ok(Bearer(state.jwt.verify(token.trim())?))
    }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, role: Role, tenant_id: Uuid) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: "recruiter@example.com".to_string(),
        role,
        tenant_id,
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
