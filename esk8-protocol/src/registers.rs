//! Bus vocabulary: node addresses, opcodes and BMS registers
//!
//! Registers are word-addressed: a read of N bytes starting at register R
//! returns the little-endian words of R, R+1, ... in order.

use crate::frame::{FrameError, Message, MAX_PAYLOAD_SIZE};

/// Bus node addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Address {
    /// Motor controller
    Esc = 0x20,
    /// This controller's Bluetooth bridge
    Ble = 0x21,
    /// Battery management system
    Bms = 0x22,
    /// Phone application
    App = 0x3E,
}

impl Address {
    /// Address this controller uses as the source of its requests
    pub const SELF: Address = Address::Ble;

    /// Get the address as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create an address from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x20 => Some(Address::Esc),
            0x21 => Some(Address::Ble),
            0x22 => Some(Address::Bms),
            0x3E => Some(Address::App),
            _ => None,
        }
    }
}

/// Bus opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Read `payload[0]` bytes starting at register `argument`
    ReadRegister = 0x01,
    /// Write the payload starting at register `argument`
    WriteRegister = 0x03,
    /// Response to [`Command::ReadRegister`], payload holds the data
    ReadResponse = 0x04,
    /// Acknowledgement of a register write
    WriteAck = 0x05,
}

impl Command {
    /// Get the opcode as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create an opcode from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Command::ReadRegister),
            0x03 => Some(Command::WriteRegister),
            0x04 => Some(Command::ReadResponse),
            0x05 => Some(Command::WriteAck),
            _ => None,
        }
    }
}

/// Telemetry and configuration registers exposed by the BMS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    // Manufacture metadata
    /// Serial number, 14 ASCII bytes spanning 0x10..=0x16
    ManufactureInfo = 0x10,
    FirmwareVersion = 0x17,
    FactoryCapacity = 0x18,
    ActualCapacity = 0x19,
    ChargeFullCycles = 0x1B,
    ChargeCount = 0x1C,

    // Status
    CapacityMah = 0x31,
    Capacity = 0x32,
    Current = 0x33,
    Voltage = 0x34,
    Temperature = 0x35,
    Health = 0x3B,

    // Deep status
    Cell0Voltage = 0x40,
    Cell1Voltage = 0x41,
    Cell2Voltage = 0x42,
    Cell3Voltage = 0x43,
    Cell4Voltage = 0x44,
    Cell5Voltage = 0x45,
    Cell6Voltage = 0x46,
    Cell7Voltage = 0x47,
    Cell8Voltage = 0x48,
    Cell9Voltage = 0x49,
}

/// Number of per-cell voltage registers
pub const CELL_COUNT: usize = 10;

impl Register {
    /// Get the register id as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a register from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        use Register::*;

        let reg = match value {
            0x10 => ManufactureInfo,
            0x17 => FirmwareVersion,
            0x18 => FactoryCapacity,
            0x19 => ActualCapacity,
            0x1B => ChargeFullCycles,
            0x1C => ChargeCount,
            0x31 => CapacityMah,
            0x32 => Capacity,
            0x33 => Current,
            0x34 => Voltage,
            0x35 => Temperature,
            0x3B => Health,
            0x40 => Cell0Voltage,
            0x41 => Cell1Voltage,
            0x42 => Cell2Voltage,
            0x43 => Cell3Voltage,
            0x44 => Cell4Voltage,
            0x45 => Cell5Voltage,
            0x46 => Cell6Voltage,
            0x47 => Cell7Voltage,
            0x48 => Cell8Voltage,
            0x49 => Cell9Voltage,
            _ => return None,
        };
        Some(reg)
    }

    /// Cell index for per-cell voltage registers
    pub fn cell_index(self) -> Option<usize> {
        let id = self.as_u8();
        let first = Register::Cell0Voltage.as_u8();
        if (first..first + CELL_COUNT as u8).contains(&id) {
            Some((id - first) as usize)
        } else {
            None
        }
    }
}

/// Build a request reading `read_len` bytes of `reg` from device `dst`
///
/// The request comes from [`Address::SELF`], carries the length as its
/// single payload byte, and has its checksum already set. The response
/// must fit a frame, so `read_len` has to be within `1..=MAX_PAYLOAD_SIZE`.
pub fn read_register(dst: Address, reg: Register, read_len: u8) -> Result<Message, FrameError> {
    if read_len == 0 || read_len as usize > MAX_PAYLOAD_SIZE {
        return Err(FrameError::InvalidParam);
    }

    let mut msg = Message::new(
        Address::SELF.as_u8(),
        dst.as_u8(),
        Command::ReadRegister.as_u8(),
        reg.as_u8(),
        &[read_len],
    )?;
    msg.set_checksum();

    Ok(msg)
}
