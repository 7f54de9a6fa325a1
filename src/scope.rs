//! Resolved per-module severities.

use std::collections::HashMap;

use crate::config::Config;
use crate::level::Severity;

/// Immutable lookup table derived from a [`Config`].
///
/// A new table is built for every reconfiguration and swapped in whole,
/// so readers always see one config's defaults together with that same
/// config's overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeTable {
    config: Config,
    default: Severity,
    modules: HashMap<String, Severity>,
}

impl ScopeTable {
    pub fn build(config: Config) -> Self {
        let default = Severity::from_token(&config.log_level);
        // later duplicates overwrite earlier ones
        let modules = config
            .packages
            .iter()
            .map(|p| (p.name.clone(), Severity::from_token(&p.log_level)))
            .collect();
        Self {
            config,
            default,
            modules,
        }
    }

    /// The config this table was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_severity(&self) -> Severity {
        self.default
    }

    /// Threshold for `module`, or the global default when it has no override.
    pub fn threshold(&self, module: Option<&str>) -> Severity {
        module
            .and_then(|m| self.modules.get(m).copied())
            .unwrap_or(self.default)
    }

    pub fn override_for(&self, module: &str) -> Option<Severity> {
        self.modules.get(module).copied()
    }

    pub fn is_enabled(&self, module: Option<&str>, severity: Severity) -> bool {
        severity >= self.threshold(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::build(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_precedence() {
        let table = ScopeTable::build(Config::with_level("INFO").package("x", "ERROR"));

        assert!(!table.is_enabled(Some("x"), Severity::WARN));
        assert!(table.is_enabled(Some("x"), Severity::ERROR));
        assert!(table.is_enabled(Some("y"), Severity::WARN));
        assert!(table.is_enabled(None, Severity::WARN));
        assert!(!table.is_enabled(None, Severity::DEBUG));
    }

    #[test]
    fn test_duplicates_last_wins() {
        let table = ScopeTable::build(
            Config::with_level("INFO")
                .package("x", "ERROR")
                .package("x", "DEBUG-2"),
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.override_for("x"), Some(Severity::new(-6)));
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = Config::with_level("WARN").package("a", "DEBUG").package("b", "ERROR");
        assert_eq!(ScopeTable::build(config.clone()), ScopeTable::build(config));
    }

    #[test]
    fn test_bad_tokens_fall_back() {
        let table = ScopeTable::build(Config::with_level("loud").package("a", "???"));
        assert_eq!(table.default_severity(), Severity::INFO);
        assert_eq!(table.override_for("a"), Some(Severity::INFO));
        assert!(ScopeTable::default().is_empty());
    }
}
