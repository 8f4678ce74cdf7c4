//! Utility functions for the search connector repository.

use std::time::Duration;

/// Format a keep-alive duration as a search engine time value.
///
/// Whole seconds are rendered as `"<n>s"`, anything finer as `"<n>ms"`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use search_connector_repository::utils::keep_alive_param;
///
/// assert_eq!(keep_alive_param(Duration::from_secs(60)), "60s");
/// assert_eq!(keep_alive_param(Duration::from_millis(1500)), "1500ms");
/// ```
pub fn keep_alive_param(keep_alive: Duration) -> String {
    if keep_alive.subsec_millis() == 0 {
        format!("{}s", keep_alive.as_secs())
    } else {
        format!("{}ms", keep_alive.as_millis())
    }
}
