//! Shared constants for end-to-end tests
//!
//! When test data changes (owners, topics, messages), update only this file.

#![allow(dead_code)]

// ============================================================================
// Test Data
// ============================================================================

/// First notification owner
pub const OWNER_1: &str = "user-1";

/// Second notification owner
pub const OWNER_2: &str = "user-2";

/// Explicit topic shared across owners
pub const TOPIC_ALERTS: &str = "alerts";

/// Message body used when the content doesn't matter
pub const MESSAGE: &str = "Your order has shipped";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to start answering
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Per-request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Delay between readiness probes
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
