//! Size-budget evaluation for emitted artifacts.

use bundleplan_core::SizeLimits;
use serde::{Deserialize, Serialize};

/// Budget evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetVerdict {
    /// Whether the budget passed. Advisory breaches still pass.
    pub passed: bool,

    /// Breaches found (may be non-empty even when passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// Extension of emitted source maps, which never count against the budget.
const SOURCE_MAP_EXTENSION: &str = ".map";

/// Checks emitted artifact sizes against the descriptor's limits.
pub struct SizeBudget;

impl SizeBudget {
    /// Evaluate `(asset name, size in bytes)` pairs.
    ///
    /// Budget rule:
    /// - Source maps (`*.map`) are skipped
    /// - Every other asset must be at most `max_asset_bytes`
    /// - Their sum (the entry total) must be at most `max_entrypoint_bytes`
    /// - Breaches fail the verdict only when `enforce_as_error` is set
    pub fn evaluate(limits: &SizeLimits, assets: &[(String, u64)]) -> BudgetVerdict {
        let mut violations = Vec::new();
        let mut total: u64 = 0;

        for (name, size) in assets.iter().filter(|(name, _)| Self::is_budgeted(name)) {
            if *size > limits.max_asset_bytes {
                violations.push(format!(
                    "Asset '{}' is {} bytes, over the {} byte limit",
                    name, size, limits.max_asset_bytes
                ));
            }
            total = total.saturating_add(*size);
        }

        if total > limits.max_entrypoint_bytes {
            violations.push(format!(
                "Entrypoint is {} bytes, over the {} byte limit",
                total, limits.max_entrypoint_bytes
            ));
        }

        let passed = violations.is_empty() || !limits.enforce_as_error;
        let message = if violations.is_empty() {
            "All assets within budget".to_string()
        } else if passed {
            format!("{} budget warning(s)", violations.len())
        } else {
            format!("Budget failed with {} violation(s)", violations.len())
        };

        BudgetVerdict {
            passed,
            violations,
            message,
        }
    }

    fn is_budgeted(name: &str) -> bool {
        !name.ends_with(SOURCE_MAP_EXTENSION)
    }
}
