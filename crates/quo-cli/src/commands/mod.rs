//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (rules and transaction file loading, JSON output)
//! - `classify` - Label classification and rules file inspection
//! - `reports` - Grouping, unknown breakdown, trends, savings, budget, analyze
//! - `subscriptions` - Subscription detection and health

pub mod classify;
pub mod core;
pub mod reports;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use reports::*;
pub use subscriptions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
