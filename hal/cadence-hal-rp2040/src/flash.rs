//! Flash storage driver for RP2040
//!
//! Uses sequential-storage for wear-leveled key-value storage
//! in the last 64KB of flash.
//!
//! Implements the `FlashStorage` trait from `cadence-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use cadence_hal::flash::{FlashError, StorageKey};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB on the Pico
pub const SHOW_PARTITION_SIZE: usize = 64 * 1024;
pub const SHOW_PARTITION_START: usize = FLASH_SIZE - SHOW_PARTITION_SIZE;

/// Largest item the map can hold
///
/// A full schedule table in record text is the biggest item stored.
pub const MAX_ITEM_SIZE: usize = 4096;

/// Flash range for the show partition
pub const SHOW_RANGE: core::ops::Range<u32> = (SHOW_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// RP2040 flash storage
///
/// Holds the system configuration and the persisted show (schedule table
/// and sequences) as separate map items.
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
    scratch: [u8; MAX_ITEM_SIZE],
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
            scratch: [0; MAX_ITEM_SIZE],
        }
    }
}

impl<'d> cadence_hal::FlashStorage for Rp2040FlashStorage<'d> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            SHOW_RANGE,
            &mut NoCache::new(),
            &mut self.scratch,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(FlashError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(FlashError::NotFound),
            Err(sequential_storage::Error::Corrupted { .. }) => Err(FlashError::Corrupted),
            Err(_) => Err(FlashError::Storage),
        }
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if data.len() > MAX_ITEM_SIZE {
            return Err(FlashError::BufferTooSmall);
        }

        map::store_item(
            &mut self.flash,
            SHOW_RANGE,
            &mut NoCache::new(),
            &mut self.scratch,
            &key,
            &data,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => FlashError::Full,
            _ => FlashError::Storage,
        })
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        matches!(
            map::fetch_item::<StorageKey, &[u8], _>(
                &mut self.flash,
                SHOW_RANGE,
                &mut NoCache::new(),
                &mut self.scratch,
                &key,
            )
            .await,
            Ok(Some(_))
        )
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(SHOW_RANGE.start, SHOW_RANGE.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}
