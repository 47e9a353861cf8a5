//! Configuration persistence
//!
//! Loads the system configuration from flash. The first boot has nothing
//! stored, so the settings from the embedded show file are used and written
//! back for next time.

use defmt::*;

use cadence_core::config::{decode_config, encode_config, ConfigError, SystemConfig};
use cadence_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey};
// Import the FlashStorage trait to bring methods into scope
use cadence_hal_rp2040::FlashStorageTrait;

/// Maximum serialized config size (binary)
const MAX_CONFIG_SIZE: usize = 128;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoaderError {
    /// Flash operation failed
    Flash(FlashError),
    /// Stored blob is unreadable or from another layout version
    Config(ConfigError),
}

impl From<FlashError> for LoaderError {
    fn from(e: FlashError) -> Self {
        LoaderError::Flash(e)
    }
}

impl From<ConfigError> for LoaderError {
    fn from(e: ConfigError) -> Self {
        LoaderError::Config(e)
    }
}

/// Configuration persistence manager
pub struct ConfigPersistence<'a, 'd> {
    storage: &'a mut Rp2040FlashStorage<'d>,
}

impl<'a, 'd> ConfigPersistence<'a, 'd> {
    pub fn new(storage: &'a mut Rp2040FlashStorage<'d>) -> Self {
        Self { storage }
    }

    /// Load the stored configuration, falling back to `fallback`
    ///
    /// When flash holds no configuration the fallback is stored so later
    /// boots find it.
    pub async fn load_or_seed(&mut self, fallback: SystemConfig) -> SystemConfig {
        match self.load().await {
            Ok(config) => {
                info!("Loaded configuration from flash");
                log_config_summary(&config);
                config
            }
            Err(LoaderError::Flash(FlashError::NotFound)) => {
                info!("No configuration in flash, using show.toml settings");
                if let Err(e) = self.save(&fallback).await {
                    warn!("Failed to store configuration: {:?}", e);
                }
                log_config_summary(&fallback);
                fallback
            }
            Err(e) => {
                warn!("Stored configuration unusable ({:?}), using show.toml settings", e);
                log_config_summary(&fallback);
                fallback
            }
        }
    }

    /// Load configuration from binary postcard format
    pub async fn load(&mut self) -> Result<SystemConfig, LoaderError> {
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let len = self
            .storage
            .read(StorageKey::SystemConfig, &mut buffer)
            .await?;

        debug!("Read {} bytes of binary config from flash", len);

        Ok(decode_config(&buffer[..len])?)
    }

    pub async fn save(&mut self, config: &SystemConfig) -> Result<(), LoaderError> {
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = encode_config(config, &mut buffer)?;
        self.storage.write(StorageKey::SystemConfig, bytes).await?;
        debug!("Stored {} bytes of binary config", bytes.len());
        Ok(())
    }
}

/// Log a summary of the active configuration
fn log_config_summary(config: &SystemConfig) {
    debug!(
        "  motor link: {} baud, max {}%, crc={}, timeout {}ms",
        config.motor.baud_rate,
        config.motor.max_speed_percent,
        config.motor.crc_enabled,
        config.motor.read_timeout_ms
    );
    debug!("  relays at {:#x}", config.relay.i2c_address);
    debug!(
        "  dmx: {} channels every {}ms",
        config.dmx.channels, config.dmx.refresh_interval_ms
    );
    debug!(
        "  scheduler: tick {}ms, autostart={}",
        config.scheduler.tick_interval_ms, config.scheduler.autostart
    );
}
