//! Configuration for an OpenSettle engine.

use serde::{Deserialize, Serialize};

use crate::{constants, Address, OpensettleError, Result};

/// Configuration for a single settlement engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity the engine uses as caller for the transfers it dispatches.
    /// Must be authorized on the composite handler for bundled assets.
    pub engine_address: Address,
    /// Owner of the handler registry and of every authorization guard.
    pub admin_address: Address,
    /// Asset data (`[type tag][payload]`) of the token fees are paid in.
    /// Empty means fee legs are never dispatched; orders with fees then fail.
    #[serde(default)]
    pub fee_asset_data: Vec<u8>,
    /// Maximum nesting depth of composite asset data.
    #[serde(default = "default_max_composite_depth")]
    pub max_composite_depth: usize,
}

fn default_max_composite_depth() -> usize {
    constants::DEFAULT_MAX_COMPOSITE_DEPTH
}

impl EngineConfig {
    #[must_use]
    pub fn new(engine_address: Address, admin_address: Address) -> Self {
        Self {
            engine_address,
            admin_address,
            fee_asset_data: Vec::new(),
            max_composite_depth: constants::DEFAULT_MAX_COMPOSITE_DEPTH,
        }
    }

    #[must_use]
    pub fn with_fee_asset_data(mut self, fee_asset_data: Vec<u8>) -> Self {
        self.fee_asset_data = fee_asset_data;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_composite_depth == 0 {
            return Err(OpensettleError::Configuration(
                "max_composite_depth must be > 0".into(),
            ));
        }
        if !self.fee_asset_data.is_empty()
            && self.fee_asset_data.len() < constants::ASSET_TYPE_TAG_SIZE
        {
            return Err(OpensettleError::Configuration(format!(
                "fee_asset_data must start with a {}-byte type tag",
                constants::ASSET_TYPE_TAG_SIZE
            )));
        }
        if self.engine_address.is_zero() || self.admin_address.is_zero() {
            return Err(OpensettleError::Configuration(
                "engine and admin addresses must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> EngineConfig {
        EngineConfig::new(Address([1u8; 32]), Address([2u8; 32]))
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = make_config();
        assert_eq!(cfg.max_composite_depth, 8);
        assert!(cfg.fee_asset_data.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        let mut cfg = make_config();
        cfg.max_composite_depth = 0;
        assert!(matches!(
            cfg.validate(),
            Err(OpensettleError::Configuration(_))
        ));
    }

    #[test]
    fn short_fee_asset_data_rejected() {
        let cfg = make_config().with_fee_asset_data(vec![1, 2]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_roundtrip_fills_defaults() {
        let cfg = make_config();
        let mut value = serde_json::to_value(&cfg).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("max_composite_depth");
        obj.remove("fee_asset_data");
        let back = EngineConfig::from_json_str(&value.to_string()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, OpensettleError::Serialization(_)));
    }
}
