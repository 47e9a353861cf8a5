//! Show persistence
//!
//! The show lives in flash as record text: the schedule table under one
//! key, each sequence under its own slot key, and a slot count so stale
//! slots from a larger previous show are ignored.

use alloc::string::String;
use alloc::vec;
use core::str;

use defmt::*;

use cadence_core::scheduler::{
    load_schedules, load_sequence, write_schedules, write_sequence, LoadError, SequenceStore,
};
use cadence_hal::flash::SEQUENCE_SLOTS;
use cadence_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey, MAX_ITEM_SIZE};
use cadence_hal_rp2040::FlashStorageTrait;
use cadence_protocol::record::sequence_file_name;

/// Show persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShowError {
    /// Flash operation failed
    Flash(FlashError),
    /// Stored text did not load
    Load(LoadError),
    /// Stored text is not UTF-8
    InvalidUtf8,
    /// Record text did not fit the item buffer
    TooLarge,
    /// More sequences than flash slots
    TooManySequences,
}

impl From<FlashError> for ShowError {
    fn from(e: FlashError) -> Self {
        ShowError::Flash(e)
    }
}

impl From<LoadError> for ShowError {
    fn from(e: LoadError) -> Self {
        ShowError::Load(e)
    }
}

/// Show persistence manager
pub struct ShowPersistence<'a, 'd> {
    storage: &'a mut Rp2040FlashStorage<'d>,
}

impl<'a, 'd> ShowPersistence<'a, 'd> {
    pub fn new(storage: &'a mut Rp2040FlashStorage<'d>) -> Self {
        Self { storage }
    }

    /// Whether a show has been stored
    pub async fn is_stored(&mut self) -> bool {
        self.storage.exists(StorageKey::ShowIndex).await
    }

    /// Replace the store contents with the stored show
    ///
    /// Returns the number of sequences loaded. On error the store is left
    /// empty.
    pub async fn load(&mut self, store: &mut SequenceStore) -> Result<usize, ShowError> {
        store.clear_all_schedules();
        store.clear_all_sequences();

        let result = self.load_into(store).await;
        if result.is_err() {
            store.clear_all_schedules();
            store.clear_all_sequences();
        }
        result
    }

    async fn load_into(&mut self, store: &mut SequenceStore) -> Result<usize, ShowError> {
        let mut count = [0u8; 1];
        self.storage.read(StorageKey::ShowIndex, &mut count).await?;
        let count = count[0];
        if count > SEQUENCE_SLOTS {
            return Err(ShowError::TooManySequences);
        }

        let mut buffer = vec![0u8; MAX_ITEM_SIZE];

        for slot in 0..count {
            let len = self
                .storage
                .read(StorageKey::SequenceSlot(slot), &mut buffer)
                .await?;
            let text = str::from_utf8(&buffer[..len]).map_err(|_| ShowError::InvalidUtf8)?;
            let id = load_sequence(store, text)?;
            trace!("Loaded {} from slot {}", sequence_file_name(id).as_str(), slot);
        }

        let len = self
            .storage
            .read(StorageKey::ScheduleTable, &mut buffer)
            .await?;
        let text = str::from_utf8(&buffer[..len]).map_err(|_| ShowError::InvalidUtf8)?;
        let schedules = load_schedules(store, text)?;

        info!(
            "Loaded show from flash: {} sequences, {} schedules",
            count, schedules
        );
        Ok(count as usize)
    }

    /// Write the whole store to flash
    pub async fn save(&mut self, store: &SequenceStore) -> Result<(), ShowError> {
        let sequences = store.sequences();
        if sequences.len() > SEQUENCE_SLOTS as usize {
            return Err(ShowError::TooManySequences);
        }

        let mut text = String::new();
        for (slot, sequence) in sequences.iter().enumerate() {
            text.clear();
            write_sequence(sequence, &mut text).map_err(|_| ShowError::TooLarge)?;
            self.store_text(StorageKey::SequenceSlot(slot as u8), &text)
                .await?;
        }

        text.clear();
        write_schedules(store, &mut text).map_err(|_| ShowError::TooLarge)?;
        self.store_text(StorageKey::ScheduleTable, &text).await?;

        // Written last so a partial save is never picked up as complete
        self.storage
            .write(StorageKey::ShowIndex, &[sequences.len() as u8])
            .await?;

        info!(
            "Stored show: {} sequences, {} schedules",
            sequences.len(),
            store.schedule_count()
        );
        Ok(())
    }

    async fn store_text(&mut self, key: StorageKey, text: &str) -> Result<(), ShowError> {
        if text.len() > MAX_ITEM_SIZE {
            return Err(ShowError::TooLarge);
        }
        self.storage.write(key, text.as_bytes()).await?;
        Ok(())
    }
}
