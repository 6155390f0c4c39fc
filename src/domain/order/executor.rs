use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::metrics::Metrics;
use crate::models::{OrderRecord, TransitionEvent};
use crate::store::{OrderStore, TransitionAudit};
use crate::utils::{retry_with_backoff, RetryConfig};

use super::authorizer::TransitionAuthorizer;
use super::errors::{TransitionError, MAX_REASON_LEN};
use super::status::OrderStatus;
use super::transitions;

// ============================================================================
// Status Transition Executor
// ============================================================================
//
// The one path through which an order's status ever changes:
//
//   validate id/status/reason -> authorize (tenant-scoped read) ->
//   transition table -> conditional write -> audit -> result
//
// The conditional write pins the status observed during authorization, so
// two requests racing from the same observed status produce exactly one
// success and one Conflict. No in-process locks, no automatic retry of the
// primary write; a lost race is reported back with the now-current status
// and the caller decides again.
//
// ============================================================================

/// One inbound transition attempt, untrusted as received.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub order_id: String,
    pub target: String,
    pub reason: Option<String>,
    pub actor: Uuid,
}

pub struct TransitionExecutor {
    authorizer: TransitionAuthorizer,
    store: Arc<dyn OrderStore>,
    audit: Arc<dyn TransitionAudit>,
    metrics: Arc<Metrics>,
}

impl TransitionExecutor {
    pub fn new(
        store: Arc<dyn OrderStore>,
        audit: Arc<dyn TransitionAudit>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            authorizer: TransitionAuthorizer::new(store.clone()),
            store,
            audit,
            metrics,
        }
    }

    /// Attempt one status transition. Exactly one structured record and one
    /// metric observation are emitted per call, whatever the branch taken.
    pub async fn execute(&self, req: &TransitionRequest) -> Result<OrderRecord, TransitionError> {
        let started = Instant::now();
        let result = self.run(req).await;
        self.observe(req, &result, started.elapsed());
        result
    }

    async fn run(&self, req: &TransitionRequest) -> Result<OrderRecord, TransitionError> {
        // Input validation is local and side-effect-free; storage is not
        // touched until everything is syntactically sound.
        let order_id =
            Uuid::parse_str(&req.order_id).map_err(|_| TransitionError::InvalidOrderId)?;

        let target = OrderStatus::parse(&req.target)
            .ok_or_else(|| TransitionError::InvalidStatus(req.target.clone()))?;

        if let Some(reason) = &req.reason {
            if reason.chars().count() > MAX_REASON_LEN {
                return Err(TransitionError::ReasonTooLong);
            }
        }

        let order = self.authorizer.authorize_mutation(order_id, req.actor).await?;
        let current = order.status;

        if !transitions::is_allowed(current, target) {
            return Err(TransitionError::InvalidTransition {
                from: current,
                to: target,
                allowed: transitions::allowed_targets(current),
            });
        }

        let updated = self
            .store
            .compare_and_set_status(order_id, order.restaurant_id, current, target)
            .await
            .map_err(TransitionError::from_write)?;

        match updated {
            Some(updated) => {
                self.append_audit(&updated, current, target, req).await;
                Ok(updated)
            }
            None => {
                // Zero rows matched: someone else committed after our read.
                // Report the actual status so the caller can re-decide.
                let actual = self
                    .store
                    .current_status(order_id)
                    .await
                    .map_err(TransitionError::from_read)?;

                match actual {
                    Some(current_now) => Err(TransitionError::Conflict {
                        current: current_now,
                    }),
                    None => Err(TransitionError::Forbidden),
                }
            }
        }
    }

    /// Best-effort audit append. The transition is already committed; a
    /// failure here is escalated through logs and metrics, never through the
    /// caller's result.
    async fn append_audit(
        &self,
        order: &OrderRecord,
        from: OrderStatus,
        to: OrderStatus,
        req: &TransitionRequest,
    ) {
        let event = TransitionEvent::record(order, from, to, req.reason.clone(), req.actor);

        let outcome = retry_with_backoff(RetryConfig::conservative(), |_attempt| {
            let event = event.clone();
            async move { self.audit.append(&event).await }
        })
        .await;

        if let Err(error) = outcome {
            self.metrics.record_audit_failure();
            tracing::error!(
                order_id = %order.id,
                restaurant_id = %order.restaurant_id,
                from = %from,
                to = %to,
                error = %error,
                "Audit append failed after retries; transition itself is committed"
            );
        }
    }

    fn observe(
        &self,
        req: &TransitionRequest,
        result: &Result<OrderRecord, TransitionError>,
        elapsed: Duration,
    ) {
        let outcome = match result {
            Ok(_) => "success",
            Err(err) => err.outcome(),
        };
        self.metrics.record_transition(outcome, elapsed.as_secs_f64());

        match result {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    restaurant_id = %order.restaurant_id,
                    status = %order.status,
                    actor = %req.actor,
                    latency_ms = elapsed.as_millis() as u64,
                    "✅ Order status transition committed"
                );
            }
            Err(err @ TransitionError::Internal(_)) => {
                tracing::error!(
                    order_id = %req.order_id,
                    target = %req.target,
                    actor = %req.actor,
                    latency_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "Order status transition failed on storage"
                );
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %req.order_id,
                    target = %req.target,
                    actor = %req.actor,
                    outcome = outcome,
                    latency_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "Order status transition rejected"
                );
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
