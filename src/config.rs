//! Engine configuration (YAML)
//!
//! ```yaml
//! max_range_cells: 100000
//! plus_concatenates_text: false
//! float_tolerance: 1.0e-10
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{GridcalcError, GridcalcResult};

const DEFAULT_MAX_RANGE_CELLS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Largest range a formula may reference. Bigger ranges fail to compile.
    pub max_range_cells: usize,

    /// When set, `+` with a non-numeric text operand concatenates instead of
    /// failing with a type mismatch. `&` always concatenates.
    pub plus_concatenates_text: bool,

    /// Two numbers closer than this compare equal with `=` and `<>`.
    pub float_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            plus_concatenates_text: false,
            float_tolerance: 1e-10,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> GridcalcResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> GridcalcResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> GridcalcResult<()> {
        if self.max_range_cells == 0 {
            return Err(GridcalcError::Config(
                "max_range_cells must be at least 1".to_string(),
            ));
        }
        if !self.float_tolerance.is_finite() || self.float_tolerance < 0.0 {
            return Err(GridcalcError::Config(format!(
                "float_tolerance must be a non-negative number, got {}",
                self.float_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml_str("plus_concatenates_text: true\n").unwrap();
        assert!(config.plus_concatenates_text);
        assert_eq!(config.max_range_cells, DEFAULT_MAX_RANGE_CELLS);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = EngineConfig::from_yaml_str("max_cells: 10\n");
        assert!(matches!(result, Err(GridcalcError::Yaml(_))));
    }

    #[test]
    fn test_validation() {
        let result = EngineConfig::from_yaml_str("max_range_cells: 0\n");
        assert!(matches!(result, Err(GridcalcError::Config(_))));
        let result = EngineConfig::from_yaml_str("float_tolerance: -1.0\n");
        assert!(matches!(result, Err(GridcalcError::Config(_))));
    }
}
