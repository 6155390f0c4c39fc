use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

// ============================================================================
// Metrics Exposition Server
// ============================================================================
//
// Serves /metrics and /health on their own port, away from the order API,
// so scrapes and liveness probes never compete with request traffic. Runs
// from a dedicated thread with its own runtime.
//
// ============================================================================

pub async fn start_metrics_server(registry: Arc<Registry>, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Metrics server listening on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .route("/metrics", web::get().to(serve_metrics))
            .route("/health", web::get().to(serve_health))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn serve_metrics(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let mut body = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut body) {
        Ok(()) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(error) => {
            tracing::error!(error = %error, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn serve_health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-lifecycle",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
