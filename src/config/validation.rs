//! Configuration validation.
//!
//! Semantic checks that run after serde has accepted the syntax. The
//! validator collects every problem it finds rather than stopping at the
//! first, so a bad config file can be fixed in one pass.

use crate::config::schema::CounterConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Table name violates the table service naming rules
    /// (letters and digits only, starts with a letter, 3..=63 chars).
    InvalidTableName(String),
    /// Partition or row key is empty or contains a forbidden character.
    InvalidEntityKey { field: &'static str, value: String },
    /// Counter route must start with '/'.
    InvalidRoute(String),
    /// Allow-origin value is not a legal header value.
    InvalidAllowOrigin(String),
    /// Request timeout must be non-zero.
    ZeroRequestTimeout,
    /// The connection string environment variable name is empty.
    EmptyConnectionStringEnv,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidTableName(name) => {
                write!(f, "invalid table name {name:?}")
            }
            ValidationError::InvalidEntityKey { field, value } => {
                write!(f, "invalid {field} {value:?}")
            }
            ValidationError::InvalidRoute(route) => {
                write!(f, "route {route:?} must start with '/'")
            }
            ValidationError::InvalidAllowOrigin(origin) => {
                write!(f, "allow_origin {origin:?} is not a valid header value")
            }
            ValidationError::ZeroRequestTimeout => {
                write!(f, "http.request_timeout_secs must be greater than zero")
            }
            ValidationError::EmptyConnectionStringEnv => {
                write!(f, "storage.connection_string_env must not be empty")
            }
        }
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &CounterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_table_name(&config.storage.table) {
        errors.push(ValidationError::InvalidTableName(
            config.storage.table.clone(),
        ));
    }
    if !is_valid_entity_key(&config.storage.partition_key) {
        errors.push(ValidationError::InvalidEntityKey {
            field: "partition_key",
            value: config.storage.partition_key.clone(),
        });
    }
    if !is_valid_entity_key(&config.storage.row_key) {
        errors.push(ValidationError::InvalidEntityKey {
            field: "row_key",
            value: config.storage.row_key.clone(),
        });
    }
    if config.storage.connection_string_env.is_empty() {
        errors.push(ValidationError::EmptyConnectionStringEnv);
    }
    if !config.http.route.starts_with('/') {
        errors.push(ValidationError::InvalidRoute(config.http.route.clone()));
    }
    if !is_valid_header_value(&config.http.allow_origin) {
        errors.push(ValidationError::InvalidAllowOrigin(
            config.http.allow_origin.clone(),
        ));
    }
    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Table service naming rule: `^[A-Za-z][A-Za-z0-9]{2,62}$`.
fn is_valid_table_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// Entity keys must be non-empty and free of the characters the table
/// service forbids in keys: `/`, `\`, `#`, `?`, and control characters.
fn is_valid_entity_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| !matches!(c, '/' | '\\' | '#' | '?') && !c.is_control())
}

/// Header values are visible ASCII plus space and tab.
fn is_valid_header_value(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b == b'\t' || (0x20..0x7f).contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CounterConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&CounterConfig::default()).is_ok());
    }

    #[test]
    fn table_name_rules() {
        assert!(is_valid_table_name("VisitorCount"));
        assert!(is_valid_table_name("abc"));
        assert!(!is_valid_table_name("ab"));
        assert!(!is_valid_table_name("1visitors"));
        assert!(!is_valid_table_name("visitor-count"));
        assert!(!is_valid_table_name(&"a".repeat(64)));
    }

    #[test]
    fn entity_key_rules() {
        assert!(is_valid_entity_key("visitor"));
        assert!(!is_valid_entity_key(""));
        assert!(!is_valid_entity_key("a/b"));
        assert!(!is_valid_entity_key("a#b"));
        assert!(!is_valid_entity_key("a\u{7}b"));
    }

    #[test]
    fn all_errors_are_reported_at_once() {
        let mut config = CounterConfig::default();
        config.storage.table = "!".to_string();
        config.storage.partition_key = String::new();
        config.http.route = "visitorcount".to_string();
        config.http.request_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroRequestTimeout));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidRoute(_))));
    }

    #[test]
    fn bad_allow_origin_is_rejected() {
        let mut config = CounterConfig::default();
        config.http.allow_origin = "https://example.com\r\nX-Bad: 1".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAllowOrigin(_))));
    }
}
