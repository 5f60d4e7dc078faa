//! Typed register access layered on [`Channel`] exchanges.
//!
//! Buffer capacity is checked when the operation is instantiated, so a value
//! type wider than the transaction buffer fails to build:
//!
//! ```compile_fail
//! use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
//! use mma7660::channel::Channel;
//! use mma7660::interface::I2cInterface;
//! use mma7660::registers::Register;
//!
//! let expectations: [Transaction; 0] = [];
//! let i2c = Mock::new(&expectations);
//! let mut channel: Channel<_, 2> = Channel::new(I2cInterface::new(i2c), 0x4C);
//! // Two payload bytes plus the address byte do not fit in two bytes.
//! let _ = channel.write(Register::SleepCount, 0x0102u16);
//! ```
//!
//! ```compile_fail
//! use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
//! use mma7660::channel::Channel;
//! use mma7660::interface::I2cInterface;
//! use mma7660::registers::Register;
//!
//! let expectations: [Transaction; 0] = [];
//! let i2c = Mock::new(&expectations);
//! let mut channel: Channel<_, 2> = Channel::new(I2cInterface::new(i2c), 0x4C);
//! let _ = channel.read::<u32>(Register::XOut);
//! ```

use core::future::IntoFuture;
use core::marker::PhantomData;

use crate::channel::{Channel, Transfer};
use crate::error::Error;
use crate::interface::Mma7660Interface;
use crate::registers::{Register, RegisterValue};
use crate::resumable::{Progress, Resumable, ResumableFuture, State};

/// Build-time capacity checks for a value type against a buffer size.
struct Capacity<T, const N: usize>(PhantomData<T>);

impl<T: RegisterValue, const N: usize> Capacity<T, N> {
    // Address byte plus payload.
    const WRITE: () = assert!(
        T::WIDTH < N,
        "register write does not fit the transaction buffer"
    );
    // Address byte out, payload back over it.
    const READ: () = assert!(
        T::WIDTH <= N && N >= 1,
        "register read does not fit the transaction buffer"
    );
}

/// Step machine for a register write: address byte plus payload in one exchange.
pub(crate) struct RegisterWrite<T, const N: usize> {
    register: Register,
    value: T,
    staged: bool,
    transfer: Transfer,
}

impl<T: RegisterValue, const N: usize> RegisterWrite<T, N> {
    pub(crate) fn new(register: Register, value: T) -> Self {
        let () = Capacity::<T, N>::WRITE;
        Self {
            register,
            value,
            staged: false,
            transfer: Transfer::new(T::WIDTH + 1, 0),
        }
    }

    pub(crate) fn restart(&mut self) {
        self.staged = false;
        self.transfer.restart();
    }

    pub(crate) fn poll<IFACE>(
        &mut self,
        channel: &mut Channel<IFACE, N>,
    ) -> Progress<(), Error<IFACE::Error>>
    where
        IFACE: Mma7660Interface,
    {
        if !self.staged {
            let buffer = channel.buffer_mut();
            buffer[0] = self.register.addr();
            self.value.encode(&mut buffer[1..=T::WIDTH]);
            self.staged = true;
        }
        self.transfer.poll(channel)
    }
}

/// Step machine for a register read: address byte out, `T::WIDTH` bytes back.
pub(crate) struct RegisterRead<T, const N: usize> {
    register: Register,
    staged: bool,
    transfer: Transfer,
    _value: PhantomData<T>,
}

impl<T: RegisterValue, const N: usize> RegisterRead<T, N> {
    pub(crate) fn new(register: Register) -> Self {
        let () = Capacity::<T, N>::READ;
        Self {
            register,
            staged: false,
            transfer: Transfer::new(1, T::WIDTH),
            _value: PhantomData,
        }
    }

    pub(crate) fn restart(&mut self) {
        self.staged = false;
        self.transfer.restart();
    }

    pub(crate) fn poll<IFACE>(
        &mut self,
        channel: &mut Channel<IFACE, N>,
    ) -> Progress<T, Error<IFACE::Error>>
    where
        IFACE: Mma7660Interface,
    {
        if !self.staged {
            channel.buffer_mut()[0] = self.register.addr();
            self.staged = true;
        }
        match self.transfer.poll(channel) {
            Progress::Running => Progress::Running,
            Progress::Done(()) => Progress::Done(T::decode(&channel.buffer()[..T::WIDTH])),
            Progress::Failed(err) => Progress::Failed(err),
        }
    }
}

impl<IFACE, const N: usize> Channel<IFACE, N>
where
    IFACE: Mma7660Interface,
{
    /// Writes `value` to `register`.
    pub fn write<T: RegisterValue>(
        &mut self,
        register: Register,
        value: T,
    ) -> WriteRegister<'_, IFACE, T, N> {
        WriteRegister {
            channel: self,
            inner: RegisterWrite::new(register, value),
            state: State::NotStarted,
        }
    }

    /// Reads a `T` starting at `register`.
    pub fn read<T: RegisterValue>(&mut self, register: Register) -> ReadRegister<'_, IFACE, T, N> {
        ReadRegister {
            channel: self,
            inner: RegisterRead::new(register),
            state: State::NotStarted,
        }
    }
}

/// Resumable register write returned by [`Channel::write`].
#[must_use = "operations do nothing unless polled"]
pub struct WriteRegister<'c, IFACE, T, const N: usize> {
    channel: &'c mut Channel<IFACE, N>,
    inner: RegisterWrite<T, N>,
    state: State,
}

impl<IFACE, T, const N: usize> Resumable for WriteRegister<'_, IFACE, T, N>
where
    IFACE: Mma7660Interface,
    T: RegisterValue,
{
    type Output = ();
    type Error = Error<IFACE::Error>;

    fn start(&mut self) {
        self.inner.restart();
        self.state = State::NotStarted;
    }

    fn poll(&mut self) -> Progress<(), Self::Error> {
        let inner = &mut self.inner;
        let channel = &mut *self.channel;
        self.state.resume(Error::Finished, || inner.poll(channel))
    }

    fn state(&self) -> State {
        self.state
    }
}

impl<'c, IFACE, T, const N: usize> IntoFuture for WriteRegister<'c, IFACE, T, N>
where
    IFACE: Mma7660Interface,
    T: RegisterValue + Unpin,
{
    type Output = Result<(), Error<IFACE::Error>>;
    type IntoFuture = ResumableFuture<Self>;

    fn into_future(self) -> Self::IntoFuture {
        ResumableFuture::new(self)
    }
}

/// Resumable register read returned by [`Channel::read`].
#[must_use = "operations do nothing unless polled"]
pub struct ReadRegister<'c, IFACE, T, const N: usize> {
    channel: &'c mut Channel<IFACE, N>,
    inner: RegisterRead<T, N>,
    state: State,
}

impl<IFACE, T, const N: usize> Resumable for ReadRegister<'_, IFACE, T, N>
where
    IFACE: Mma7660Interface,
    T: RegisterValue,
{
    type Output = T;
    type Error = Error<IFACE::Error>;

    fn start(&mut self) {
        self.inner.restart();
        self.state = State::NotStarted;
    }

    fn poll(&mut self) -> Progress<T, Self::Error> {
        let inner = &mut self.inner;
        let channel = &mut *self.channel;
        self.state.resume(Error::Finished, || inner.poll(channel))
    }

    fn state(&self) -> State {
        self.state
    }
}

impl<'c, IFACE, T, const N: usize> IntoFuture for ReadRegister<'c, IFACE, T, N>
where
    IFACE: Mma7660Interface,
    T: RegisterValue + Unpin,
{
    type Output = Result<T, Error<IFACE::Error>>;
    type IntoFuture = ResumableFuture<Self>;

    fn into_future(self) -> Self::IntoFuture {
        ResumableFuture::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::{Nack, ScriptedBus};
    use crate::interface::I2cInterface;
    use crate::registers::Mode;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    #[test]
    fn write_prefixes_payload_with_register_address() {
        let expectations = [I2cTrans::write(0x4C, vec![0x07, 0b0000_0001])];
        let mut i2c = I2cMock::new(&expectations);
        let mut channel: Channel<_, 2> = Channel::new(I2cInterface::new(i2c.clone()), 0x4C);

        channel
            .write(Register::Mode, Mode::active_only())
            .run_blocking()
            .unwrap();
        i2c.done();
    }

    #[test]
    fn read_selects_register_then_decodes_response() {
        let expectations = [I2cTrans::write_read(0x4C, vec![0x07], vec![0b0100_0001])];
        let mut i2c = I2cMock::new(&expectations);
        let mut channel: Channel<_, 2> = Channel::new(I2cInterface::new(i2c.clone()), 0x4C);

        let mode: Mode = channel.read(Register::Mode).run_blocking().unwrap();
        assert!(mode.active());
        assert!(mode.int_push_pull());
        i2c.done();
    }

    #[test]
    fn wide_values_use_little_endian_payload() {
        let expectations = [
            I2cTrans::write(0x4C, vec![0x05, 0x34, 0x12]),
            I2cTrans::write_read(0x4C, vec![0x05], vec![0x34, 0x12]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut channel: Channel<_, 3> = Channel::new(I2cInterface::new(i2c.clone()), 0x4C);

        channel
            .write(Register::SleepCount, 0x1234u16)
            .run_blocking()
            .unwrap();
        let value = channel.read::<u16>(Register::SleepCount).run_blocking().unwrap();
        assert_eq!(value, 0x1234);
        i2c.done();
    }

    #[test]
    fn widest_fitting_values_build_and_transfer() {
        let mut channel: Channel<_, 2> =
            Channel::new(ScriptedBus::new(0, &[&[], &[0xCD, 0xAB]]), 0x4C);

        channel.write(Register::SleepCount, 0x7Fu8).run_blocking().unwrap();
        let value = channel.read::<u16>(Register::SleepCount).run_blocking().unwrap();
        assert_eq!(value, 0xABCD);

        let bus = channel.release();
        assert_eq!(bus.requests[0], (0x4C, vec![0x05, 0x7F], 0));
        assert_eq!(bus.requests[1], (0x4C, vec![0x05], 2));
    }

    #[test]
    fn read_suspends_while_bus_is_busy() {
        let mut channel: Channel<_, 2> = Channel::new(ScriptedBus::new(1, &[&[0x2A]]), 0x4C);

        let mut read = channel.read::<u8>(Register::YOut);
        assert_eq!(read.poll(), Progress::Running);
        assert_eq!(read.state(), State::Running);
        assert_eq!(read.poll(), Progress::Done(0x2A));

        let bus = channel.release();
        assert_eq!(bus.requests, vec![(0x4C, vec![0x01], 1)]);
    }

    #[test]
    fn failed_write_reports_interface_error() {
        let mut bus = ScriptedBus::new(0, &[]);
        bus.fail_on = Some(0);
        let mut channel: Channel<_, 2> = Channel::new(bus, 0x4C);

        let result = channel.write(Register::Mode, 0x01u8).run_blocking();
        assert_eq!(result, Err(Error::Interface(Nack)));
    }

    #[test]
    fn restarted_read_stages_address_again() {
        let mut channel: Channel<_, 2> =
            Channel::new(ScriptedBus::new(0, &[&[0x11], &[0x22]]), 0x4C);

        let mut read = channel.read::<u8>(Register::ZOut);
        assert_eq!(read.run_blocking(), Ok(0x11));
        read.start();
        assert_eq!(read.run_blocking(), Ok(0x22));

        let bus = channel.release();
        assert_eq!(bus.requests[1], (0x4C, vec![0x02], 1));
    }
}
