//! Register map definitions for the MMA7660 orientation/motion sensor.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

/// Fixed 7-bit I2C address of the MMA7660.
pub const DEFAULT_ADDRESS: u8 = 0x4C;

/// Access permissions encoded for each register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterAccess {
    /// Read-only register.
    ReadOnly,
    /// Read/write register.
    ReadWrite,
}

/// Addressable registers of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// X output (read only except in test mode).
    XOut = 0x00,
    /// Y output (read only except in test mode).
    YOut = 0x01,
    /// Z output (read only except in test mode).
    ZOut = 0x02,
    /// Tilt status.
    Tilt = 0x03,
    /// Sample rate status.
    SampleRateStatus = 0x04,
    /// Sleep count.
    SleepCount = 0x05,
    /// Interrupt setup.
    IntSetup = 0x06,
    /// Mode.
    Mode = 0x07,
    /// Auto-wake/sleep and portrait/landscape sample rate.
    SampleRate = 0x08,
    /// Tap/pulse detection.
    TapDetection = 0x09,
    /// Tap/pulse debounce count.
    TapDebounceCount = 0x0A,
}

impl Register {
    /// Register address as documented in the datasheet.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Access permission classification.
    pub const fn access(self) -> RegisterAccess {
        match self {
            Self::XOut | Self::YOut | Self::ZOut | Self::Tilt | Self::SampleRateStatus => {
                RegisterAccess::ReadOnly
            }
            _ => RegisterAccess::ReadWrite,
        }
    }
}

/// Bitfield representation of the `MODE` register (address `0x07`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    // Active mode (bit 0). Cleared means standby.
    pub active: bool,
    #[skip]
    __: B1,
    // Test mode (bit 2). Only valid while in standby.
    pub test: bool,
    // Auto-wake enable (bit 3).
    pub auto_wake: bool,
    // Auto-sleep enable (bit 4).
    pub auto_sleep: bool,
    // Sleep counter clock divided by 16 (bit 5).
    pub sleep_counter_prescale: bool,
    // INT output is push-pull when set, open-drain otherwise (bit 6).
    pub int_push_pull: bool,
    // INT output is active high when set (bit 7).
    pub int_active_high: bool,
}

impl Mode {
    /// Mode value with only the active bit set.
    pub fn active_only() -> Self {
        Self::new().with_active(true)
    }
}

impl From<u8> for Mode {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<Mode> for u8 {
    fn from(value: Mode) -> Self {
        value.into_bytes()[0]
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Mode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Mode({=u8:#x})", u8::from(*self));
    }
}

/// Bitfield representation of the `XOUT`/`YOUT`/`ZOUT` registers.
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOutput {
    // 6-bit two's complement sample (bits 5:0).
    pub raw: B6,
    // Register was read while the device was updating it (bit 6).
    pub alert: bool,
    #[skip]
    __: B1,
}

impl AxisOutput {
    /// Returns the sample sign-extended from 6 bits.
    pub fn sample(self) -> i8 {
        ((self.raw() << 2) as i8) >> 2
    }
}

impl From<u8> for AxisOutput {
    fn from(value: u8) -> Self {
        Self::from_bytes([value])
    }
}

impl From<AxisOutput> for u8 {
    fn from(value: AxisOutput) -> Self {
        value.into_bytes()[0]
    }
}

/// Fixed-width value that can be carried by a register transaction.
///
/// `WIDTH` is the number of payload bytes on the wire. Multi-byte values are
/// little-endian, matching the order the device auto-increments through
/// consecutive registers.
pub trait RegisterValue: Copy {
    /// Payload width in bytes.
    const WIDTH: usize;

    /// Writes the value into `bytes`, which holds exactly `WIDTH` bytes.
    fn encode(self, bytes: &mut [u8]);

    /// Reads a value from `bytes`, which holds exactly `WIDTH` bytes.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_register_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RegisterValue for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                fn encode(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_register_value!(u8, i8, u16, i16, u32, i32);

impl RegisterValue for Mode {
    const WIDTH: usize = 1;

    fn encode(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self::from(bytes[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates that Mode bitfields match the datasheet layout.
    #[test]
    fn mode_layout_matches_datasheet() {
        assert_eq!(u8::from(Mode::active_only()), 0b0000_0001);

        let mode = Mode::new()
            .with_test(true)
            .with_auto_wake(true)
            .with_auto_sleep(true)
            .with_sleep_counter_prescale(true)
            .with_int_push_pull(true)
            .with_int_active_high(true);
        assert_eq!(u8::from(mode), 0b1111_1100);

        let decoded = Mode::from(0b0100_1001);
        assert!(decoded.active());
        assert!(decoded.auto_wake());
        assert!(decoded.int_push_pull());
        assert!(!decoded.test());
    }

    #[test]
    fn axis_output_sign_extends_six_bit_samples() {
        assert_eq!(AxisOutput::from(0x1F).sample(), 31);
        assert_eq!(AxisOutput::from(0x20).sample(), -32);
        assert_eq!(AxisOutput::from(0x3F).sample(), -1);

        let alerted = AxisOutput::from(0x45);
        assert!(alerted.alert());
        assert_eq!(alerted.sample(), 5);
    }

    #[test]
    fn register_access_follows_map() {
        assert_eq!(Register::XOut.access(), RegisterAccess::ReadOnly);
        assert_eq!(Register::SampleRateStatus.access(), RegisterAccess::ReadOnly);
        assert_eq!(Register::Mode.access(), RegisterAccess::ReadWrite);
        assert_eq!(Register::TapDebounceCount.addr(), 0x0A);
    }

    #[test]
    fn multi_byte_values_are_little_endian() {
        let mut bytes = [0u8; 2];
        0x1234u16.encode(&mut bytes);
        assert_eq!(bytes, [0x34, 0x12]);
        assert_eq!(i16::decode(&[0xFE, 0xFF]), -2);
        assert_eq!(<u8 as RegisterValue>::WIDTH, 1);
        assert_eq!(<i32 as RegisterValue>::WIDTH, 4);
    }
}
