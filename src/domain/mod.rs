// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Transition rules and their enforcement live here, independent of storage
// engines and transport. The HTTP layer adapts requests into this layer;
// the store module implements its ports.
//
// ============================================================================

pub mod order;
