// Ether/wei conversion for user-facing amounts.

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;

/// Parse a decimal ether amount (e.g. `"0.001"`) into wei.
pub fn to_wei(ether: &str) -> Option<U256> {
    let ether = ether.trim();
    if ether.is_empty() || ether.starts_with('-') {
        return None;
    }
    parse_ether(ether).ok()
}

/// Render wei as a decimal ether string without trailing zeros.
pub fn from_wei(wei: U256) -> String {
    let formatted = format_ether(wei);
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
