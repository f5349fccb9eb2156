use arduino_hal::Eeprom;
use smuff::{SnapshotStorage, StoreError, RECORD_LEN};

/// Position snapshot kept in the on-chip EEPROM.
pub struct EepromStorage {
    eeprom: Eeprom,
}
impl EepromStorage {
    /// Offset of the record in the EEPROM.
    const OFFSET: u16 = 0;

    pub fn new(eeprom: Eeprom) -> Self {
        Self { eeprom }
    }
}

impl SnapshotStorage for EepromStorage {
    fn read(&mut self, record: &mut [u8; RECORD_LEN]) -> Result<(), StoreError> {
        self.eeprom
            .read(Self::OFFSET, record)
            .map_err(|_| StoreError::Device)
    }

    fn write(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), StoreError> {
        self.eeprom
            .write(Self::OFFSET, record)
            .map_err(|_| StoreError::Device)
    }
}
