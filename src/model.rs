//! Output limits of the known DP700 models.

use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::error::UnsupportedModel;

/// Maximum settings accepted by a PSU model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelLimits {
    /// Volts.
    pub max_voltage: f64,
    /// Amps.
    pub max_current: f64,
}

/// All PSU models with known limits. Variant names match the model field of `*IDN?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
pub enum SupportedModel {
    /// 30V / 5A.
    DP711,
    /// 50V / 3A.
    DP712,
}

impl SupportedModel {
    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    pub const fn limits(&self) -> ModelLimits {
        match self {
            SupportedModel::DP711 => ModelLimits {
                max_voltage: 30.0,
                max_current: 5.0,
            },
            SupportedModel::DP712 => ModelLimits {
                max_voltage: 50.0,
                max_current: 3.0,
            },
        }
    }
}

impl ModelLimits {
    /// Look up the limits for a model name as reported by the PSU.
    pub fn lookup(model: &str) -> Result<Self, UnsupportedModel> {
        model
            .parse::<SupportedModel>()
            .map(|model| model.limits())
            .map_err(|_| UnsupportedModel(model.to_owned()))
    }
}
