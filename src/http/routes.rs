use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::order::{TransitionError, TransitionExecutor, TransitionRequest};
use crate::http::auth::Principal;
use crate::metrics::Metrics;
use crate::models::OrderRecord;
use crate::store::{OrderStore, TransitionAudit};

// ============================================================================
// HTTP Routes - Thin Adapter over the Transition Engine
// ============================================================================
//
// Handlers translate the request envelope into executor/store calls and map
// the closed result type to status codes. No state-machine logic lives here.
//
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub restaurant_id: Uuid,
    #[serde(default)]
    pub items: serde_json::Value,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/orders").route(web::post().to(create_order)))
        .service(web::resource("/api/orders/{order_id}").route(web::get().to(get_order)))
        .service(web::resource("/api/orders/{order_id}/status").route(web::patch().to(update_status)))
        .service(web::resource("/api/orders/{order_id}/events").route(web::get().to(list_events)));
}

// ============================================================================
// Handlers
// ============================================================================

async fn update_status(
    path: web::Path<String>,
    body: web::Json<UpdateStatusBody>,
    principal: Principal,
    executor: web::Data<Arc<TransitionExecutor>>,
) -> HttpResponse {
    let body = body.into_inner();
    let request = TransitionRequest {
        order_id: path.into_inner(),
        target: body.status,
        reason: body.reason,
        actor: principal.user_id,
    };

    match executor.execute(&request).await {
        Ok(order) => HttpResponse::Ok().json(json!({ "order": transition_view(&order) })),
        Err(err) => transition_error_response(&err),
    }
}

async fn create_order(
    body: web::Json<CreateOrderBody>,
    store: web::Data<Arc<dyn OrderStore>>,
    metrics: web::Data<Arc<Metrics>>,
) -> HttpResponse {
    let body = body.into_inner();

    match store.create_order(body.restaurant_id, body.items).await {
        Ok(order) => {
            metrics.record_order_created();
            tracing::info!(
                order_id = %order.id,
                restaurant_id = %order.restaurant_id,
                "Order accepted"
            );
            HttpResponse::Created().json(json!({ "order": order }))
        }
        Err(error) => {
            tracing::error!(error = %error, "Order intake failed");
            HttpResponse::InternalServerError().json(json!({"code": "INTERNAL_ERROR"}))
        }
    }
}

async fn get_order(
    path: web::Path<String>,
    principal: Principal,
    store: web::Data<Arc<dyn OrderStore>>,
) -> HttpResponse {
    let Ok(order_id) = Uuid::parse_str(&path.into_inner()) else {
        return HttpResponse::BadRequest().json(json!({"code": "INVALID_ORDER_ID"}));
    };

    match store.find_for_staff(order_id, principal.user_id).await {
        Ok(Some(view)) => HttpResponse::Ok().json(json!({ "order": view.order })),
        Ok(None) => HttpResponse::NotFound().json(json!({"code": "FORBIDDEN"})),
        Err(error) => {
            tracing::error!(order_id = %order_id, error = %error, "Order lookup failed");
            HttpResponse::InternalServerError().json(json!({"code": "INTERNAL_ERROR"}))
        }
    }
}

async fn list_events(
    path: web::Path<String>,
    principal: Principal,
    store: web::Data<Arc<dyn OrderStore>>,
    audit: web::Data<Arc<dyn TransitionAudit>>,
) -> HttpResponse {
    let Ok(order_id) = Uuid::parse_str(&path.into_inner()) else {
        return HttpResponse::BadRequest().json(json!({"code": "INVALID_ORDER_ID"}));
    };

    // Any staff role on the owning restaurant may read the trail; the same
    // fail-closed lookup hides foreign and missing orders alike.
    match store.find_for_staff(order_id, principal.user_id).await {
        Ok(Some(_)) => match audit.for_order(order_id).await {
            Ok(events) => HttpResponse::Ok().json(json!({ "events": events })),
            Err(error) => {
                tracing::error!(order_id = %order_id, error = %error, "Event trail lookup failed");
                HttpResponse::InternalServerError().json(json!({"code": "INTERNAL_ERROR"}))
            }
        },
        Ok(None) => HttpResponse::NotFound().json(json!({"code": "FORBIDDEN"})),
        Err(error) => {
            tracing::error!(order_id = %order_id, error = %error, "Order lookup failed");
            HttpResponse::InternalServerError().json(json!({"code": "INTERNAL_ERROR"}))
        }
    }
}

// ============================================================================
// Outcome Mapping
// ============================================================================

fn transition_view(order: &OrderRecord) -> serde_json::Value {
    json!({
        "id": order.id,
        "status": order.status,
        "restaurant_id": order.restaurant_id,
        "updated_at": order.updated_at,
    })
}

/// Pure mapping from the executor's closed result type to the wire contract.
fn transition_error_response(err: &TransitionError) -> HttpResponse {
    match err {
        TransitionError::InvalidOrderId => {
            HttpResponse::BadRequest().json(json!({"code": "INVALID_ORDER_ID"}))
        }
        TransitionError::InvalidStatus(_) => {
            HttpResponse::BadRequest().json(json!({"code": "INVALID_STATUS"}))
        }
        TransitionError::ReasonTooLong => {
            HttpResponse::BadRequest().json(json!({"code": "REASON_TOO_LONG"}))
        }
        // 404 rather than 403: a foreign tenant's order must look exactly
        // like a missing one.
        TransitionError::Forbidden => {
            HttpResponse::NotFound().json(json!({"code": "FORBIDDEN"}))
        }
        TransitionError::InvalidTransition { from, allowed, .. } => HttpResponse::Conflict().json(
            json!({"code": "INVALID_TRANSITION", "from": from, "allowed": allowed}),
        ),
        TransitionError::Conflict { current } => HttpResponse::Conflict()
            .json(json!({"code": "CONFLICT_STATUS_CHANGED", "current": current})),
        TransitionError::WriteDenied => {
            HttpResponse::Forbidden().json(json!({"code": "FORBIDDEN"}))
        }
        TransitionError::Internal(_) => {
            HttpResponse::InternalServerError().json(json!({"code": "INTERNAL_ERROR"}))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::http::auth::testing::MemorySessionVerifier;
    use crate::http::auth::SessionVerifier;
    use crate::models::StaffRole;
    use crate::store::memory::{MemoryAudit, MemoryStore};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    struct TestContext {
        store: Arc<MemoryStore>,
        audit: Arc<MemoryAudit>,
        executor: Arc<TransitionExecutor>,
        verifier: Arc<dyn SessionVerifier>,
        metrics: Arc<Metrics>,
        restaurant: Uuid,
        editor: Uuid,
    }

    const EDITOR_TOKEN: &str = "editor-session";

    fn context() -> TestContext {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAudit::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let executor = Arc::new(TransitionExecutor::new(
            store.clone(),
            audit.clone(),
            metrics.clone(),
        ));

        let restaurant = Uuid::new_v4();
        let editor = Uuid::new_v4();
        store.add_staff(restaurant, editor, StaffRole::Editor);

        let verifier: Arc<dyn SessionVerifier> =
            Arc::new(MemorySessionVerifier::default().with_session(EDITOR_TOKEN, editor));

        TestContext {
            store,
            audit,
            executor,
            verifier,
            metrics,
            restaurant,
            editor,
        }
    }

    macro_rules! app {
        ($ctx:expr) => {{
            let store: Arc<dyn OrderStore> = $ctx.store.clone();
            let audit: Arc<dyn TransitionAudit> = $ctx.audit.clone();
            test::init_service(
                App::new()
                    .app_data(web::Data::new($ctx.executor.clone()))
                    .app_data(web::Data::new(store))
                    .app_data(web::Data::new(audit))
                    .app_data(web::Data::new($ctx.verifier.clone()))
                    .app_data(web::Data::new($ctx.metrics.clone()))
                    .configure(configure),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_patch_commits_transition_and_returns_order() {
        let ctx = context();
        let app = app!(ctx);
        let order = ctx.store.insert_order(ctx.restaurant, OrderStatus::Pending);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .set_json(json!({"status": "paid"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["status"], "paid");
        assert_eq!(body["order"]["id"], order.id.to_string());
        assert_eq!(ctx.store.status_of(order.id), Some(OrderStatus::Paid));
    }

    #[actix_web::test]
    async fn test_patch_without_session_is_unauthenticated() {
        let ctx = context();
        let app = app!(ctx);
        let order = ctx.store.insert_order(ctx.restaurant, OrderStatus::Pending);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/orders/{}/status", order.id))
            .set_json(json!({"status": "paid"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert_eq!(ctx.store.status_of(order.id), Some(OrderStatus::Pending));
    }

    #[actix_web::test]
    async fn test_patch_foreign_order_looks_missing() {
        let ctx = context();
        let app = app!(ctx);
        let foreign_restaurant = Uuid::new_v4();
        let order = ctx
            .store
            .insert_order(foreign_restaurant, OrderStatus::Pending);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .set_json(json!({"status": "paid"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[actix_web::test]
    async fn test_patch_illegal_edge_reports_current_and_allowed() {
        let ctx = context();
        let app = app!(ctx);
        let order = ctx.store.insert_order(ctx.restaurant, OrderStatus::Paid);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .set_json(json!({"status": "completed"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_TRANSITION");
        assert_eq!(body["from"], "paid");
        assert_eq!(body["allowed"], json!(["preparing", "cancelled"]));
    }

    #[actix_web::test]
    async fn test_patch_malformed_id_is_bad_request() {
        let ctx = context();
        let app = app!(ctx);

        let req = test::TestRequest::patch()
            .uri("/api/orders/not-a-uuid/status")
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .set_json(json!({"status": "paid"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_ORDER_ID");
    }

    #[actix_web::test]
    async fn test_intake_creates_pending_order() {
        let ctx = context();
        let app = app!(ctx);

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(json!({
                "restaurant_id": ctx.restaurant,
                "items": [{"name": "green curry", "qty": 1}],
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["status"], "pending");
    }

    #[actix_web::test]
    async fn test_event_trail_lists_committed_transitions() {
        let ctx = context();
        let app = app!(ctx);
        let order = ctx.store.insert_order(ctx.restaurant, OrderStatus::Pending);

        let patch = test::TestRequest::patch()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .set_json(json!({"status": "cancelled", "reason": "customer called"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, patch).await.status(),
            StatusCode::OK
        );

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{}/events", order.id))
            .insert_header(("Authorization", format!("Bearer {EDITOR_TOKEN}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["from_status"], "pending");
        assert_eq!(events[0]["to_status"], "cancelled");
        assert_eq!(events[0]["reason"], "customer called");
        assert_eq!(events[0]["actor"], ctx.editor.to_string());
    }

    #[test]
    fn test_error_mapping_covers_the_wire_contract() {
        use OrderStatus::*;

        let cases = [
            (
                transition_error_response(&TransitionError::InvalidOrderId),
                StatusCode::BAD_REQUEST,
            ),
            (
                transition_error_response(&TransitionError::InvalidStatus("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                transition_error_response(&TransitionError::ReasonTooLong),
                StatusCode::BAD_REQUEST,
            ),
            (
                transition_error_response(&TransitionError::Forbidden),
                StatusCode::NOT_FOUND,
            ),
            (
                transition_error_response(&TransitionError::InvalidTransition {
                    from: Paid,
                    to: Completed,
                    allowed: &[Preparing, Cancelled],
                }),
                StatusCode::CONFLICT,
            ),
            (
                transition_error_response(&TransitionError::Conflict { current: Cancelled }),
                StatusCode::CONFLICT,
            ),
            (
                transition_error_response(&TransitionError::WriteDenied),
                StatusCode::FORBIDDEN,
            ),
            (
                transition_error_response(&TransitionError::Internal(anyhow::anyhow!("db down"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (response, expected) in cases {
            assert_eq!(response.status(), expected);
        }
    }
}
