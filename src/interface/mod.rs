//! Bus interface abstraction for the MMA7660 driver.

use core::task::Poll;

pub mod i2c;

pub use i2c::I2cInterface;

/// Abstraction over the bus master the driver borrows for each exchange.
///
/// A transfer is begun with [`start_transfer`](Self::start_transfer) and then
/// polled with [`poll_transfer`](Self::poll_transfer) until it reports
/// `Ready`. Both calls receive the device's transaction buffer: the first
/// `write_len` bytes are sent, and once the transfer is ready the first
/// `read_len` bytes hold the response.
pub trait Mma7660Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Begins a write-then-read transfer to `address`.
    ///
    /// `write_len == 0` is a pure read, `read_len == 0` a pure write. With both
    /// zero only the address is sent.
    fn start_transfer<const N: usize>(
        &mut self,
        address: u8,
        buffer: &mut [u8; N],
        write_len: usize,
        read_len: usize,
    ) -> core::result::Result<(), Self::Error>;

    /// Reports whether the transfer begun last has finished.
    fn poll_transfer<const N: usize>(
        &mut self,
        buffer: &mut [u8; N],
    ) -> Poll<core::result::Result<(), Self::Error>>;
}

/// Interrupt-capable input the device's INT line is wired to.
pub trait IntPin {
    /// Configures the pin as an input with its pull-up enabled.
    fn set_input_pull_up(&mut self);
}

/// Placeholder for boards that leave the INT line unconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPin;

impl IntPin for NoPin {
    fn set_input_pull_up(&mut self) {}
}
