use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

// ============================================================================
// Session Authentication
// ============================================================================
//
// Session issuance belongs to the platform's auth service; this module only
// resolves a presented bearer token into a staff identity. A missing,
// unknown, or expired token is one uniform 401; role checks on specific
// restaurants happen later, against the order being touched.
//
// ============================================================================

/// The authenticated staff user behind a request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
}

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Resolve a bearer token to a principal, `None` if unknown or expired.
    async fn verify(&self, token: &str) -> anyhow::Result<Option<Principal>>;
}

pub struct PgSessionVerifier {
    pool: PgPool,
}

impl PgSessionVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESOLVE_SESSION_SQL: &str =
    "SELECT user_id FROM staff_sessions WHERE token = $1 AND expires_at > now()";

#[async_trait]
impl SessionVerifier for PgSessionVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<Option<Principal>> {
        let row = sqlx::query(RESOLVE_SESSION_SQL)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Principal {
                user_id: row.try_get("user_id")?,
            })),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Request Extraction
// ============================================================================

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

fn unauthenticated() -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "unauthenticated",
        HttpResponse::Unauthorized().json(serde_json::json!({"code": "UNAUTHENTICATED"})),
    )
    .into()
}

fn verification_failed() -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "session verification failed",
        HttpResponse::InternalServerError().json(serde_json::json!({"code": "INTERNAL_ERROR"})),
    )
    .into()
}

impl FromRequest for Principal {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Principal, actix_web::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let verifier = req
            .app_data::<web::Data<Arc<dyn SessionVerifier>>>()
            .cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let Some(verifier) = verifier else {
                tracing::error!("SessionVerifier is not wired into the app");
                return Err(verification_failed());
            };
            let Some(token) = token else {
                return Err(unauthenticated());
            };

            match verifier.verify(&token).await {
                Ok(Some(principal)) => Ok(principal),
                Ok(None) => Err(unauthenticated()),
                Err(error) => {
                    tracing::error!(error = %error, "Session verification failed");
                    Err(verification_failed())
                }
            }
        })
    }
}

// ============================================================================
// Test Support
// ============================================================================
