//! Configuration types
//!
//! Board-agnostic configuration structures stored as postcard binary data.

pub mod types;

pub use types::*;

/// Configuration blob errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Serialization failed or buffer too small
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Stored layout version differs from [`CONFIG_VERSION`]
    VersionMismatch(u8),
}

/// Serialize a configuration into `buf`
///
/// Returns the used prefix of `buf`.
#[cfg(feature = "serde")]
pub fn encode_config<'a>(config: &SystemConfig, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
    postcard::to_slice(config, buf).map_err(|_| ConfigError::Serialize)
}

/// Deserialize a configuration and check its version
#[cfg(feature = "serde")]
pub fn decode_config(bytes: &[u8]) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::VersionMismatch(config.version));
    }
    Ok(config)
}
