//! Controller settings
//!
//! Settings are stored in flash as postcard-serialized binary data under
//! [`StorageKey::Settings`]. A missing entry is not an error; the defaults
//! are used until the first save.

use esk8_hal::flash::{FlashError, FlashStorage, StorageKey};
use esk8_protocol::{Address, ParityMode};
use serde::{Deserialize, Serialize};

/// Current settings layout version
pub const SETTINGS_VERSION: u8 = 1;

/// Largest serialized settings blob
pub const MAX_SETTINGS_SIZE: usize = 64;

/// Shortest allowed bus poll interval
pub const MIN_POLL_INTERVAL_MS: u16 = 20;

/// Throttle range and key-press increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThrottleLimits {
    /// Idle level
    pub min: u8,
    /// Full-throttle level
    pub max: u8,
    /// Change per accelerate/brake key press
    pub step: u8,
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            min: 0,
            max: 255,
            step: 8,
        }
    }
}

/// Persisted controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Layout version, must equal [`SETTINGS_VERSION`]
    pub version: u8,
    /// Device polled for telemetry
    pub telemetry_source: Address,
    /// Delay between telemetry requests
    pub poll_interval_ms: u16,
    /// Throttle range
    pub throttle: ThrottleLimits,
    /// Parity convention of the remote peripheral
    pub remote_parity: ParityMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            telemetry_source: Address::Bms,
            poll_interval_ms: 250,
            throttle: ThrottleLimits::default(),
            remote_parity: ParityMode::Odd,
        }
    }
}

/// Settings loading and validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Underlying storage failed
    Flash(FlashError),
    /// Stored blob length does not match the settings layout
    WrongSize,
    /// Stored blob could not be decoded
    Decode,
    /// Settings could not be encoded
    Encode,
    /// Stored layout version differs from this firmware's
    VersionMismatch,
    /// Values are inconsistent
    Invalid,
}

impl From<FlashError> for SettingsError {
    fn from(e: FlashError) -> Self {
        SettingsError::Flash(e)
    }
}

impl Settings {
    /// Check values for consistency
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version != SETTINGS_VERSION {
            return Err(SettingsError::VersionMismatch);
        }
        if self.throttle.min > self.throttle.max || self.throttle.step == 0 {
            return Err(SettingsError::Invalid);
        }
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(SettingsError::Invalid);
        }
        Ok(())
    }

    /// Decode a stored blob, which must hold exactly one settings value
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        let (settings, rest): (Settings, _) =
            postcard::take_from_bytes(bytes).map_err(|e| match e {
                postcard::Error::DeserializeUnexpectedEnd => SettingsError::WrongSize,
                _ => SettingsError::Decode,
            })?;

        if !rest.is_empty() {
            return Err(SettingsError::WrongSize);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Encode into `buffer`, returning the used prefix
    pub fn to_bytes<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], SettingsError> {
        postcard::to_slice(self, buffer).map_err(|_| SettingsError::Encode)
    }
}

/// Settings persistence on top of a [`FlashStorage`]
pub struct SettingsStore<F> {
    storage: F,
}

impl<F: FlashStorage> SettingsStore<F> {
    /// Create a store over the given flash storage
    pub fn new(storage: F) -> Self {
        Self { storage }
    }

    /// Reclaim the underlying storage
    pub fn into_storage(self) -> F {
        self.storage
    }

    /// Load settings, falling back to defaults when nothing is stored
    pub async fn load(&mut self) -> Result<Settings, SettingsError> {
        let mut buffer = [0u8; MAX_SETTINGS_SIZE];

        match self.storage.read(StorageKey::Settings, &mut buffer).await {
            Ok(len) => Settings::from_bytes(&buffer[..len]),
            Err(FlashError::NotFound) => Ok(Settings::default()),
            Err(FlashError::BufferTooSmall) => Err(SettingsError::WrongSize),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate and persist settings
    pub async fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        settings.validate()?;

        let mut buffer = [0u8; MAX_SETTINGS_SIZE];
        let bytes = settings.to_bytes(&mut buffer)?;
        self.storage.write(StorageKey::Settings, bytes).await?;
        Ok(())
    }

    /// Wipe the settings partition and store the defaults
    pub async fn restore_defaults(&mut self) -> Result<Settings, SettingsError> {
        self.storage.erase_all().await?;

        let defaults = Settings::default();
        self.save(&defaults).await?;
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use heapless::Vec;

    /// In-memory single-slot flash
    #[derive(Default)]
    pub struct MemFlash {
        pub slot: Option<Vec<u8, MAX_SETTINGS_SIZE>>,
        pub full: bool,
    }

    impl FlashStorage for MemFlash {
        async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            assert_eq!(key, StorageKey::Settings);
            let data = self.slot.as_ref().ok_or(FlashError::NotFound)?;
            if buffer.len() < data.len() {
                return Err(FlashError::BufferTooSmall);
            }
            buffer[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            assert_eq!(key, StorageKey::Settings);
            if self.full {
                return Err(FlashError::Full);
            }
            self.slot = Some(Vec::from_slice(data).map_err(|_| FlashError::Full)?);
            Ok(())
        }

        async fn erase_all(&mut self) -> Result<(), FlashError> {
            self.slot = None;
            Ok(())
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn test_load_missing_gives_defaults() {
        let mut store = SettingsStore::new(MemFlash::default());
        assert_eq!(block_on(store.load()), Ok(Settings::default()));
    }

    #[test]
    fn test_save_then_load() {
        let mut store = SettingsStore::new(MemFlash::default());
        let settings = Settings {
            poll_interval_ms: 500,
            throttle: ThrottleLimits {
                min: 10,
                max: 200,
                step: 5,
            },
            remote_parity: ParityMode::Even,
            ..Settings::default()
        };

        block_on(store.save(&settings)).unwrap();
        assert_eq!(block_on(store.load()), Ok(settings));
    }

    #[test]
    fn test_save_rejects_invalid() {
        let mut store = SettingsStore::new(MemFlash::default());
        let settings = Settings {
            throttle: ThrottleLimits {
                min: 100,
                max: 50,
                step: 1,
            },
            ..Settings::default()
        };

        assert_eq!(block_on(store.save(&settings)), Err(SettingsError::Invalid));
        assert!(store.into_storage().slot.is_none());
    }

    #[test]
    fn test_short_blob_is_wrong_size() {
        let mut buffer = [0u8; MAX_SETTINGS_SIZE];
        let len = Settings::default().to_bytes(&mut buffer).unwrap().len();

        let flash = MemFlash {
            slot: Some(Vec::from_slice(&buffer[..len - 1]).unwrap()),
            full: false,
        };
        let mut store = SettingsStore::new(flash);
        assert_eq!(block_on(store.load()), Err(SettingsError::WrongSize));
    }

    #[test]
    fn test_trailing_bytes_are_wrong_size() {
        let mut buffer = [0u8; MAX_SETTINGS_SIZE];
        let len = Settings::default().to_bytes(&mut buffer).unwrap().len();

        assert_eq!(
            Settings::from_bytes(&buffer[..len + 1]),
            Err(SettingsError::WrongSize)
        );
    }

    #[test]
    fn test_version_mismatch() {
        let settings = Settings {
            version: SETTINGS_VERSION + 1,
            ..Settings::default()
        };
        let mut buffer = [0u8; MAX_SETTINGS_SIZE];
        let bytes = settings.to_bytes(&mut buffer).unwrap();

        assert_eq!(
            Settings::from_bytes(bytes),
            Err(SettingsError::VersionMismatch)
        );
    }

    #[test]
    fn test_flash_full() {
        let mut store = SettingsStore::new(MemFlash {
            slot: None,
            full: true,
        });
        assert_eq!(
            block_on(store.save(&Settings::default())),
            Err(SettingsError::Flash(FlashError::Full))
        );
    }

    #[test]
    fn test_restore_defaults() {
        let mut store = SettingsStore::new(MemFlash::default());
        let restored = block_on(store.restore_defaults()).unwrap();

        assert_eq!(restored, Settings::default());
        assert_eq!(block_on(store.load()), Ok(Settings::default()));
    }
}
