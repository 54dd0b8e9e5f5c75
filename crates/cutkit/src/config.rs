//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CutError, Result};
use crate::groove::CUT_TOLERANCE;

/// Alignment dowel parameters for contour cuts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DowelSettings {
    /// Pin radius (mm).
    pub radius: f64,
    /// Pin length (mm), split evenly across the seam.
    pub height: f64,
    /// Number of sides of the pin and hole cylinders.
    pub segments: u32,
    /// Distance from the seam toward the part interior (mm); 0 uses twice
    /// the radius.
    pub inset: f64,
}

impl Default for DowelSettings {
    fn default() -> Self {
        Self {
            radius: 2.0,
            height: 8.0,
            segments: 24,
            inset: 0.0,
        }
    }
}

impl DowelSettings {
    /// Effective inset from the seam.
    pub fn effective_inset(&self) -> f64 {
        if self.inset > 0.0 {
            self.inset
        } else {
            2.0 * self.radius
        }
    }
}

/// Numeric policy of the cutting engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Clearance for connectors and allowed volume error (mm).
    pub tolerance: f64,
    /// Distance below which a vertex counts as on the cut surface (mm).
    pub seam_epsilon: f64,
    /// Distance below which input vertices are merged before cutting (mm).
    pub weld_tolerance: f64,
    /// Gap between the halves when they are laid out side by side (mm).
    pub plate_gap: f64,
    /// Dowel parameters.
    pub dowel: DowelSettings,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            tolerance: CUT_TOLERANCE,
            seam_epsilon: 1e-6,
            weld_tolerance: 1e-5,
            plate_gap: 5.0,
            dowel: DowelSettings::default(),
        }
    }
}

impl CutConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.tolerance,
            self.seam_epsilon,
            self.weld_tolerance,
            self.plate_gap,
            self.dowel.radius,
            self.dowel.height,
            self.dowel.inset,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(CutError::InvalidConfig("values must be finite".into()));
        }
        if self.tolerance < 0.0 {
            return Err(CutError::InvalidConfig(
                "tolerance must not be negative".into(),
            ));
        }
        if self.seam_epsilon <= 0.0 || self.weld_tolerance <= 0.0 {
            return Err(CutError::InvalidConfig(
                "seam_epsilon and weld_tolerance must be positive".into(),
            ));
        }
        if self.plate_gap < 0.0 {
            return Err(CutError::InvalidConfig(
                "plate_gap must not be negative".into(),
            ));
        }
        if self.dowel.radius <= 0.0 || self.dowel.height <= 0.0 {
            return Err(CutError::InvalidConfig(
                "dowel radius and height must be positive".into(),
            ));
        }
        if self.dowel.segments < 3 {
            return Err(CutError::InvalidConfig(
                "dowel needs at least 3 segments".into(),
            ));
        }
        if self.dowel.inset < 0.0 {
            return Err(CutError::InvalidConfig(
                "dowel inset must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CutError::InvalidConfig(format!("invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CutError::InvalidConfig(format!("failed to serialize config: {}", e)))
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CutError::InvalidConfig(format!("failed to read config file: {}", e)))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| CutError::InvalidConfig(format!("invalid JSON config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&content)
        } else {
            Err(CutError::InvalidConfig(
                "config file must be .json or .toml".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tolerance, CUT_TOLERANCE);
        assert_eq!(config.dowel.effective_inset(), 4.0);
    }

    #[test]
    fn test_rejects_negative_sizes() {
        let mut config = CutConfig::default();
        config.tolerance = -0.1;
        assert!(matches!(config.validate(), Err(CutError::InvalidConfig(_))));

        let mut config = CutConfig::default();
        config.dowel.radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = CutConfig::default();
        config.dowel.segments = 2;
        assert!(config.validate().is_err());

        let mut config = CutConfig::default();
        config.plate_gap = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = CutConfig::default();
        config.plate_gap = 12.5;
        config.dowel.radius = 3.0;
        let text = config.to_toml_string().unwrap();
        let parsed = CutConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed = CutConfig::from_toml_str("tolerance = 0.2\n[dowel]\nheight = 10.0\n").unwrap();
        assert_eq!(parsed.tolerance, 0.2);
        assert_eq!(parsed.dowel.height, 10.0);
        assert_eq!(parsed.dowel.radius, 2.0);
        assert_eq!(parsed.plate_gap, 5.0);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(CutConfig::from_toml_str("tolerance = -1.0").is_err());
        assert!(CutConfig::from_toml_str("tolerance = [").is_err());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = CutConfig::load_from_file(Path::new("cut.yaml"));
        assert!(err.is_err());
    }
}
