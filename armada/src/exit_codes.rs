//! Stable exit codes for armada CLI commands.

/// Command succeeded with no per-repository failures.
pub const OK: i32 = 0;
/// Fatal error before any per-repository work (config, scope, state).
pub const INVALID: i32 = 1;
/// Batch completed but at least one per-repository task failed.
pub const PARTIAL: i32 = 2;
