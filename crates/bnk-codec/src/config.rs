use std::path::Path;

use bnk_types::Endian;
use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};
use crate::layout::DEFAULT_ALIGNMENT;

/// Options for reading and writing a bank.
///
/// Loadable from TOML; every field is optional:
///
/// ```toml
/// endian = "big"
/// alignment = 16
/// decode_metadata = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BankConfig {
    /// Byte order of every integer in the file.
    pub endian: Endian,
    /// Boundary media offsets are rounded up to on write.
    pub alignment: u32,
    /// Whether `Sound` objects get a typed metadata view.
    pub decode_metadata: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            alignment: DEFAULT_ALIGNMENT,
            decode_metadata: true,
        }
    }
}

impl BankConfig {
    pub fn with_endian(endian: Endian) -> Self {
        Self {
            endian,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> BankResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| BankError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> BankResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> BankResult<()> {
        if !self.alignment.is_power_of_two() {
            return Err(BankError::InvalidConfig(format!(
                "alignment must be a non-zero power of two, got {}",
                self.alignment
            )));
        }
        Ok(())
    }
}
