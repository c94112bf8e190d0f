use serde::{Deserialize, Serialize};

/// Tenant-scoped payroll/tax configuration. Stored as key/value rows but
/// always handled as this typed struct once loaded; the masters+owner
/// invariant is enforced at the write boundary, not by consumers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShopSettings {
    pub manager_percent: f64,
    pub masters_percent: f64,
    pub owner_percent: f64,
    pub kaspi_tax_percent: f64,
    pub charity_percent: f64,
    pub round_charity_to_nearest_1000: bool,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            manager_percent: 0.0,
            masters_percent: 50.0,
            owner_percent: 50.0,
            kaspi_tax_percent: 0.0,
            charity_percent: 0.0,
            round_charity_to_nearest_1000: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be between 0 and 100")]
    PercentOutOfRange { field: &'static str },

    #[error("masters_percent + owner_percent must equal 100, got {sum}")]
    SplitNotComplete { sum: f64 },
}

impl ShopSettings {
    /// Write-boundary validation: percent fields in [0, 100] and the
    /// masters/owner split summing to exactly 100 (within 0.01).
    pub fn validate(&self) -> Result<(), SettingsError> {
        let fields = [
            ("manager_percent", self.manager_percent),
            ("masters_percent", self.masters_percent),
            ("owner_percent", self.owner_percent),
            ("kaspi_tax_percent", self.kaspi_tax_percent),
            ("charity_percent", self.charity_percent),
        ];
        for (field, value) in fields {
            if !(0.0..=100.0).contains(&value) || !value.is_finite() {
                return Err(SettingsError::PercentOutOfRange { field });
            }
        }

        let sum = self.masters_percent + self.owner_percent;
        if (sum - 100.0).abs() > 0.01 {
            return Err(SettingsError::SplitNotComplete { sum });
        }
        Ok(())
    }
}

/// Numeric settings values arrive as strings; anything unparseable
/// coerces to zero rather than failing the whole computation.
pub fn coerce_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// The rounding flag historically held several truthy spellings.
pub fn coerce_flag(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1" | "1000" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_complete_split() {
        let settings = ShopSettings {
            manager_percent: 8.0,
            masters_percent: 60.0,
            owner_percent: 40.0,
            kaspi_tax_percent: 4.0,
            charity_percent: 10.0,
            round_charity_to_nearest_1000: true,
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_incomplete_split() {
        let settings = ShopSettings {
            masters_percent: 60.0,
            owner_percent: 50.0,
            ..ShopSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::SplitNotComplete { .. })
        ));
    }

    #[test]
    fn validate_tolerates_float_noise_in_split() {
        let settings = ShopSettings {
            masters_percent: 60.005,
            owner_percent: 39.999,
            ..ShopSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_percent() {
        let settings = ShopSettings {
            charity_percent: 101.0,
            ..ShopSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::PercentOutOfRange {
                field: "charity_percent"
            })
        ));
    }

    #[test]
    fn coerce_number_defaults_garbage_to_zero() {
        assert_eq!(coerce_number("12.5"), 12.5);
        assert_eq!(coerce_number(" 40 "), 40.0);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number(""), 0.0);
    }

    #[test]
    fn coerce_flag_accepts_legacy_spellings() {
        for truthy in ["true", "1", "1000", "yes"] {
            assert!(coerce_flag(truthy), "{truthy} should be truthy");
        }
        for falsy in ["false", "0", "no", "", "TRUE"] {
            assert!(!coerce_flag(falsy), "{falsy} should be falsy");
        }
    }
}
