//! BMS telemetry decoding
//!
//! Read responses carry little-endian 16-bit words, one per register,
//! starting at the register named in the frame argument. A single response
//! can therefore update a run of consecutive registers.

use esk8_protocol::registers::CELL_COUNT;
use esk8_protocol::{Address, Command, Message, Register};

/// Length of the serial number block at [`Register::ManufactureInfo`]
pub const SERIAL_LEN: usize = 14;

/// Offset subtracted from raw temperature bytes
const TEMPERATURE_OFFSET_C: i16 = 20;

/// Errors while applying a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    /// Frame is not a read response
    NotAResponse,
    /// Response did not come from the telemetry source
    UnexpectedSource(u8),
    /// First register of the response is unknown
    UnknownRegister(u8),
    /// Payload holds no complete word
    ShortPayload,
}

/// Latest known battery state
///
/// Fields stay `None` until the matching register has been read once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Remaining capacity, percent
    pub capacity_pct: Option<u16>,
    /// Remaining capacity, mAh
    pub capacity_mah: Option<u16>,
    /// Pack current in 10 mA units, negative while charging
    pub current_10ma: Option<i16>,
    /// Pack voltage in 10 mV units
    pub voltage_10mv: Option<u16>,
    /// Two pack temperature sensors, °C
    pub temperatures_c: Option<[i16; 2]>,
    /// Battery health, percent
    pub health_pct: Option<u16>,
    /// Per-cell voltages, mV
    pub cell_mv: [Option<u16>; CELL_COUNT],
    /// ASCII serial number
    pub serial: [u8; SERIAL_LEN],
    /// BMS firmware version
    pub firmware_version: Option<u16>,
    /// Design capacity, mAh
    pub factory_capacity_mah: Option<u16>,
    /// Measured full capacity, mAh
    pub actual_capacity_mah: Option<u16>,
    /// Completed full charge cycles
    pub full_cycles: Option<u16>,
    /// Charge events
    pub charge_count: Option<u16>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Telemetry {
    /// Record with nothing read yet, usable in statics
    pub const EMPTY: Self = Self {
        capacity_pct: None,
        capacity_mah: None,
        current_10ma: None,
        voltage_10mv: None,
        temperatures_c: None,
        health_pct: None,
        cell_mv: [None; CELL_COUNT],
        serial: [0; SERIAL_LEN],
        firmware_version: None,
        factory_capacity_mah: None,
        actual_capacity_mah: None,
        full_cycles: None,
        charge_count: None,
    };

    /// Create an empty telemetry record
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Apply a read response from `source`
    ///
    /// Returns how many known registers were updated. Unknown registers
    /// inside a run are skipped.
    pub fn apply(&mut self, source: Address, msg: &Message) -> Result<usize, TelemetryError> {
        if msg.command != Command::ReadResponse.as_u8() {
            return Err(TelemetryError::NotAResponse);
        }
        if msg.src_address != source.as_u8() {
            return Err(TelemetryError::UnexpectedSource(msg.src_address));
        }
        if Register::from_u8(msg.argument).is_none() {
            return Err(TelemetryError::UnknownRegister(msg.argument));
        }
        if msg.payload.len() < 2 {
            return Err(TelemetryError::ShortPayload);
        }

        let mut updated = 0;
        for (i, word) in msg.payload.chunks_exact(2).enumerate() {
            let id = msg.argument.wrapping_add(i as u8);
            if self.apply_word(id, [word[0], word[1]]) {
                updated += 1;
            }
        }

        Ok(updated)
    }

    fn apply_word(&mut self, id: u8, word: [u8; 2]) -> bool {
        let serial_start = Register::ManufactureInfo.as_u8();
        if (serial_start..serial_start + (SERIAL_LEN / 2) as u8).contains(&id) {
            let at = 2 * (id - serial_start) as usize;
            self.serial[at..at + 2].copy_from_slice(&word);
            return true;
        }

        let Some(reg) = Register::from_u8(id) else {
            return false;
        };

        let value = u16::from_le_bytes(word);
        if let Some(cell) = reg.cell_index() {
            self.cell_mv[cell] = Some(value);
            return true;
        }

        match reg {
            Register::FirmwareVersion => self.firmware_version = Some(value),
            Register::FactoryCapacity => self.factory_capacity_mah = Some(value),
            Register::ActualCapacity => self.actual_capacity_mah = Some(value),
            Register::ChargeFullCycles => self.full_cycles = Some(value),
            Register::ChargeCount => self.charge_count = Some(value),
            Register::CapacityMah => self.capacity_mah = Some(value),
            Register::Capacity => self.capacity_pct = Some(value),
            Register::Current => self.current_10ma = Some(i16::from_le_bytes(word)),
            Register::Voltage => self.voltage_10mv = Some(value),
            Register::Temperature => {
                self.temperatures_c = Some([
                    word[0] as i16 - TEMPERATURE_OFFSET_C,
                    word[1] as i16 - TEMPERATURE_OFFSET_C,
                ])
            }
            Register::Health => self.health_pct = Some(value),
            // Serial block and cells are handled above
            _ => return false,
        }
        true
    }

    /// Lowest and highest known cell voltage, mV
    pub fn cell_spread(&self) -> Option<(u16, u16)> {
        let mut cells = self.cell_mv.iter().flatten().copied();
        let first = cells.next()?;
        Some(cells.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Serial number as text, if it has been read and is ASCII
    pub fn serial_str(&self) -> Option<&str> {
        let end = self
            .serial
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SERIAL_LEN);
        if end == 0 {
            return None;
        }
        core::str::from_utf8(&self.serial[..end]).ok()
    }
}
