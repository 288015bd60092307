//! Provider Attempt Order
//!
//! Pure domain logic for ordering the provider chain.

/// Effective order in which providers are attempted.
///
/// The primary always comes first, then the fallbacks in configured order with
/// the primary and any repeats removed.
///
/// # Example
/// ```
/// use geo_gate::domain::services::attempt_order;
///
/// let fallbacks = vec!["q".to_string(), "p".to_string(), "r".to_string()];
/// assert_eq!(attempt_order("p", &fallbacks), vec!["p", "q", "r"]);
/// ```
pub fn attempt_order(primary: &str, fallbacks: &[String]) -> Vec<String> {
    let mut order = vec![primary.to_string()];
    for name in fallbacks {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }
    order
}
