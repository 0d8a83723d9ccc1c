//! Checker configuration.
//!
//! Parsed from TOML, e.g.
//!
//! ```toml
//! [limits]
//! max_union_cases = 64
//! max_product_items = 16
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct TypeckConfig {
    #[serde(default)]
    pub limits: Limits,
}

/// Size limits imposed by the runtime's value representation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Limits {
    /// Most cases a union may declare.
    #[serde(default = "default_limit")]
    pub max_union_cases: usize,
    /// Most elements a tuple, or fields a bundle, may have.
    #[serde(default = "default_limit")]
    pub max_product_items: usize,
}

fn default_limit() -> usize {
    256
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_union_cases: default_limit(),
            max_product_items: default_limit(),
        }
    }
}

impl TypeckConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<TypeckConfig, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse checker config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = TypeckConfig::from_toml_str("").unwrap();
        assert_eq!(config, TypeckConfig::default());
        assert_eq!(config.limits.max_union_cases, 256);
    }

    #[test]
    fn partial_limits() {
        let config = TypeckConfig::from_toml_str(
            r#"
[limits]
max_product_items = 8
"#,
        )
        .unwrap();
        assert_eq!(config.limits.max_product_items, 8);
        assert_eq!(config.limits.max_union_cases, 256);
    }

    #[test]
    fn malformed_config_is_rejected() {
        let err = TypeckConfig::from_toml_str("[limits]\nmax_union_cases = \"many\"").unwrap_err();
        assert!(err.starts_with("Failed to parse checker config"));
    }
}
