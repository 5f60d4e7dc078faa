//! I2C interface implementation built on top of `embedded-hal` `I2c`.

use core::task::Poll;

use embedded_hal::i2c::I2c;

use super::Mma7660Interface;

/// Blocking I2C interface for the MMA7660 driver.
///
/// The transfer runs to completion inside `start_transfer`, so polling always
/// reports `Ready`.
pub struct I2cInterface<I2C> {
    i2c: I2C,
}

impl<I2C> I2cInterface<I2C> {
    /// Creates a new interface from the provided I2C bus.
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Provides mutable access to the wrapped I2C bus.
    pub fn i2c_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Consumes the interface and returns the owned I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Mma7660Interface for I2cInterface<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn start_transfer<const N: usize>(
        &mut self,
        address: u8,
        buffer: &mut [u8; N],
        write_len: usize,
        read_len: usize,
    ) -> core::result::Result<(), Self::Error> {
        match (write_len, read_len) {
            (_, 0) => self.i2c.write(address, &buffer[..write_len]),
            (0, _) => self.i2c.read(address, &mut buffer[..read_len]),
            _ => {
                // The response overwrites the request in place.
                let request = *buffer;
                self.i2c
                    .write_read(address, &request[..write_len], &mut buffer[..read_len])
            }
        }
    }

    fn poll_transfer<const N: usize>(
        &mut self,
        _buffer: &mut [u8; N],
    ) -> Poll<core::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}
