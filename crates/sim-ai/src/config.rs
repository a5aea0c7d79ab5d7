//! Planner tuning loaded from YAML.

use serde::{Deserialize, Serialize};
use sim_core::ConfigError;
use sim_econ::{TradeValuation, DEFAULT_STOCK_HORIZON_DAYS};

/// Company planner parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// A new construction project replaces the current one only when its
    /// score exceeds the current score times this ratio.
    pub construction_switch_ratio: f64,
    /// Station prices are inflated by this factor when scoring and budgeting.
    pub construction_price_bonus: f64,
    /// Idle capacity withheld per unit of construction capacity still missing.
    pub construction_capacity_margin: f64,
    /// A ship is ordered only when the company holds more than its price
    /// times this margin.
    pub ship_price_margin: i64,
    /// Days of flow a stockpile may hold before the excess counts as spoken for.
    pub stock_horizon_days: i64,
    pub valuation: TradeValuation,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            construction_switch_ratio: 1.5,
            construction_price_bonus: 1.2,
            construction_capacity_margin: 1.5,
            ship_price_margin: 2,
            stock_horizon_days: DEFAULT_STOCK_HORIZON_DAYS,
            valuation: TradeValuation::default(),
        }
    }
}

impl AiConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AiConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.construction_switch_ratio.is_finite() && self.construction_switch_ratio >= 1.0) {
            return Err(ConfigError::Invalid {
                field: "construction_switch_ratio",
                reason: "must be finite and >= 1",
            });
        }
        if !(self.construction_price_bonus.is_finite() && self.construction_price_bonus > 0.0) {
            return Err(ConfigError::Invalid {
                field: "construction_price_bonus",
                reason: "must be finite and > 0",
            });
        }
        if !(self.construction_capacity_margin.is_finite() && self.construction_capacity_margin >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "construction_capacity_margin",
                reason: "must be finite and >= 0",
            });
        }
        if self.ship_price_margin < 1 {
            return Err(ConfigError::Invalid {
                field: "ship_price_margin",
                reason: "must be >= 1",
            });
        }
        if self.stock_horizon_days < 0 {
            return Err(ConfigError::Invalid {
                field: "stock_horizon_days",
                reason: "must be >= 0",
            });
        }
        let v = &self.valuation;
        if !(v.owned_sell_bonus.is_finite() && v.owned_buy_discount.is_finite())
            || v.owned_sell_bonus <= 0.0
            || v.owned_buy_discount <= 0.0
        {
            return Err(ConfigError::Invalid {
                field: "valuation",
                reason: "multipliers must be finite and > 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AiConfig::default().validate().unwrap();
    }

    #[test]
    fn nested_valuation_overrides() {
        let config = AiConfig::from_yaml_str(
            "construction_switch_ratio: 2.0\nvaluation:\n  owned_sell_bonus: 1.3\n",
        )
        .unwrap();
        assert_eq!(config.construction_switch_ratio, 2.0);
        assert_eq!(config.valuation.owned_sell_bonus, 1.3);
        assert_eq!(config.valuation.owned_buy_discount, 0.9);
        assert_eq!(config.ship_price_margin, 2);
    }

    #[test]
    fn rejects_switch_ratio_below_one() {
        assert!(matches!(
            AiConfig::from_yaml_str("construction_switch_ratio: 0.5"),
            Err(ConfigError::Invalid {
                field: "construction_switch_ratio",
                ..
            })
        ));
    }
}
