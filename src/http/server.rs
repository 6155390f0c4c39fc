use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use crate::domain::order::TransitionExecutor;
use crate::http::auth::SessionVerifier;
use crate::http::routes;
use crate::metrics::Metrics;
use crate::store::{OrderStore, TransitionAudit};

// ============================================================================
// API Server
// ============================================================================

/// Everything the request handlers need, shared across workers.
#[derive(Clone)]
pub struct ApiContext {
    pub executor: Arc<TransitionExecutor>,
    pub store: Arc<dyn OrderStore>,
    pub audit: Arc<dyn TransitionAudit>,
    pub verifier: Arc<dyn SessionVerifier>,
    pub metrics: Arc<Metrics>,
}

pub async fn run_api_server(ctx: ApiContext, host: &str, port: u16) -> std::io::Result<()> {
    tracing::info!("Serving order API on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ctx.executor.clone()))
            .app_data(web::Data::new(ctx.store.clone()))
            .app_data(web::Data::new(ctx.audit.clone()))
            .app_data(web::Data::new(ctx.verifier.clone()))
            .app_data(web::Data::new(ctx.metrics.clone()))
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
