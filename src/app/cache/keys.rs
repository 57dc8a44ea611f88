//! Cache key derivation
//!
//! Weather snapshots are keyed by alias and provider errors by display name.
//! The asymmetry is kept for compatibility with readers of existing caches.

use crate::constants::cache::{ERROR_KEY_PREFIX, WEATHER_KEY_PREFIX};

/// Key of the weather snapshot for an alias: `weather_<trimmed alias>`
pub fn weather_key(alias: &str) -> String {
    format!("{}{}", WEATHER_KEY_PREFIX, alias.trim())
}

/// Key of the provider error record for a display name: `weather_error_<name>`
pub fn error_key(display_name: &str) -> String {
    format!("{}{}", ERROR_KEY_PREFIX, display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_key_trims_alias() {
        assert_eq!(weather_key("stgo"), "weather_stgo");
        assert_eq!(weather_key("  stgo \n"), "weather_stgo");
    }

    #[test]
    fn test_error_key_uses_display_name_verbatim() {
        assert_eq!(error_key("Santiago"), "weather_error_Santiago");
        assert_eq!(error_key("San José "), "weather_error_San José ");
    }
}
