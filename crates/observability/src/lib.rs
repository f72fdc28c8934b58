//! Tracing/logging setup shared by hosts embedding the catalog client.

/// Initialize process-wide tracing (JSON output).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize tracing for tests (human-readable, captured per test).
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
