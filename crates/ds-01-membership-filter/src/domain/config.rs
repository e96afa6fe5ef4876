//! Filter sizing configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use ds_01_membership_filter::FilterConfigBuilder;
//!
//! let config = FilterConfigBuilder::new()
//!     .expected_keys(10_000_000)
//!     .target_fpr(0.001)
//!     .build()?;
//! ```

use std::f64::consts::LN_2;

use crate::domain::parameters::FilterParams;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};

/// Default ceiling on filter size: 2^32 bits (512 MiB).
pub const DEFAULT_MAX_SIZE_BITS: u64 = 1 << 32;

/// Sizing configuration for a membership filter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Number of live keys the filter should hold at `target_fpr`
    pub expected_keys: u64,
    /// Target false positive rate, exclusive (0, 1)
    pub target_fpr: f64,
    /// Hard ceiling on the bit array size
    pub max_size_bits: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_keys: 100_000,
            target_fpr: 0.01,
            max_size_bits: DEFAULT_MAX_SIZE_BITS,
        }
    }
}

impl FilterConfig {
    /// Default FPR and ceiling, sized for `expected_keys`.
    pub fn for_capacity(expected_keys: u64) -> Self {
        Self {
            expected_keys,
            ..Self::default()
        }
    }

    /// Validate and compute the bit geometry.
    pub fn params(&self) -> Result<FilterParams, FilterError> {
        self.validate()?;
        let params = FilterParams::for_capacity(self.expected_keys, self.target_fpr);
        if params.size_bits as u64 > self.max_size_bits {
            return Err(FilterError::FilterTooLarge {
                size_bits: params.size_bits as u64,
                max_bits: self.max_size_bits,
            });
        }
        Ok(params)
    }

    /// Largest key count whose optimal filter at `target_fpr` fits in
    /// `max_size_bits`. Only meaningful for a config that validates.
    pub fn max_expected_keys(&self) -> u64 {
        let mut keys =
            (self.max_size_bits as f64 * LN_2 * LN_2 / -self.target_fpr.ln()).floor() as u64;
        while keys > 0
            && FilterParams::for_capacity(keys, self.target_fpr).size_bits as u64
                > self.max_size_bits
        {
            keys -= 1;
        }
        keys
    }

    /// Clamp `expected_keys` to [`max_expected_keys`](Self::max_expected_keys).
    /// A filter built from the result stays under the ceiling and runs above
    /// `target_fpr` once it holds more keys than it was sized for.
    pub fn capped_to_ceiling(mut self) -> Self {
        if self.validate().is_ok() {
            self.expected_keys = self.expected_keys.min(self.max_expected_keys());
        }
        self
    }

    /// Reject configurations that cannot produce a meaningful filter
    pub fn validate(&self) -> Result<(), FilterError> {
        if !(self.target_fpr > 0.0 && self.target_fpr < 1.0) {
            return Err(FilterError::InvalidFpr {
                fpr: self.target_fpr,
            });
        }
        if self.max_size_bits == 0 {
            return Err(FilterError::InvalidCapacity { capacity: 0 });
        }
        Ok(())
    }

    /// Builder-style method to set the target FPR
    pub fn with_target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = fpr;
        self
    }

    /// Builder-style method to set the expected key count
    pub fn with_expected_keys(mut self, keys: u64) -> Self {
        self.expected_keys = keys;
        self
    }
}

/// Builder for FilterConfig with validation on `build()`
#[derive(Default)]
pub struct FilterConfigBuilder {
    expected_keys: Option<u64>,
    target_fpr: Option<f64>,
    max_size_bits: Option<u64>,
}

impl FilterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_keys(mut self, keys: u64) -> Self {
        self.expected_keys = Some(keys);
        self
    }

    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    pub fn max_size_bits(mut self, bits: u64) -> Self {
        self.max_size_bits = Some(bits);
        self
    }

    pub fn build(self) -> Result<FilterConfig, FilterError> {
        let defaults = FilterConfig::default();
        let config = FilterConfig {
            expected_keys: self.expected_keys.unwrap_or(defaults.expected_keys),
            target_fpr: self.target_fpr.unwrap_or(defaults.target_fpr),
            max_size_bits: self.max_size_bits.unwrap_or(defaults.max_size_bits),
        };
        config.params()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FilterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_fpr() {
        for fpr in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            let config = FilterConfig::default().with_target_fpr(fpr);
            assert!(
                matches!(config.validate(), Err(FilterError::InvalidFpr { .. })),
                "fpr {} accepted",
                fpr
            );
        }
    }

    #[test]
    fn test_builder_enforces_size_ceiling() {
        let result = FilterConfigBuilder::new()
            .expected_keys(1_000_000)
            .target_fpr(0.01)
            .max_size_bits(1_000)
            .build();
        assert!(matches!(result, Err(FilterError::FilterTooLarge { .. })));
    }

    #[test]
    fn test_capped_config_fits_ceiling() {
        let config = FilterConfig {
            expected_keys: u64::MAX,
            target_fpr: 0.01,
            max_size_bits: 1 << 16,
        };
        assert!(matches!(config.params(), Err(FilterError::FilterTooLarge { .. })));

        let capped = config.clone().capped_to_ceiling();
        assert_eq!(capped.expected_keys, config.max_expected_keys());
        let params = capped.params().unwrap();
        assert!(params.size_bits as u64 <= 1 << 16);
        // One more key would not fit.
        let next = FilterParams::for_capacity(capped.expected_keys + 1, 0.01);
        assert!(next.size_bits as u64 > 1 << 16);
    }

    #[test]
    fn test_cap_leaves_small_configs_alone() {
        let config = FilterConfig::for_capacity(1_000);
        assert_eq!(config.clone().capped_to_ceiling(), config);
    }

    #[test]
    fn test_builder_fills_defaults() {
        let config = FilterConfigBuilder::new().expected_keys(42).build().unwrap();
        assert_eq!(config.expected_keys, 42);
        assert_eq!(config.target_fpr, FilterConfig::default().target_fpr);
    }
}
