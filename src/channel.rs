//! Write-then-read exchanges over a shared, fixed-size transaction buffer.

use core::future::IntoFuture;
use core::task::Poll;

use crate::error::Error;
use crate::interface::Mma7660Interface;
use crate::log::{trace, warning};
use crate::resumable::{Progress, Resumable, ResumableFuture, State};

/// Bus endpoint for one device: its address, the interface it talks through,
/// and the buffer every exchange reuses.
pub struct Channel<IFACE, const N: usize> {
    interface: IFACE,
    address: u8,
    buffer: [u8; N],
}

impl<IFACE, const N: usize> Channel<IFACE, N> {
    /// Creates a channel addressing `address` through `interface`.
    pub const fn new(interface: IFACE, address: u8) -> Self {
        Self {
            interface,
            address,
            buffer: [0; N],
        }
    }

    /// 7-bit bus address of the device.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Contents of the transaction buffer as left by the last exchange.
    pub fn buffer(&self) -> &[u8; N] {
        &self.buffer
    }

    /// Mutable access to the transaction buffer for staging a request.
    pub fn buffer_mut(&mut self) -> &mut [u8; N] {
        &mut self.buffer
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }

    /// Consumes the channel and returns the owned interface.
    pub fn release(self) -> IFACE {
        self.interface
    }
}

impl<IFACE, const N: usize> Channel<IFACE, N>
where
    IFACE: Mma7660Interface,
{
    /// Sends the first `write_len` buffer bytes, then reads `read_len` bytes
    /// back into the front of the buffer.
    ///
    /// # Panics
    ///
    /// If either length exceeds the buffer capacity.
    pub fn exchange(&mut self, write_len: usize, read_len: usize) -> Exchange<'_, IFACE, N> {
        assert!(
            write_len <= N && read_len <= N,
            "exchange larger than transaction buffer"
        );
        Exchange {
            channel: self,
            transfer: Transfer::new(write_len, read_len),
            state: State::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferStep {
    Idle,
    InFlight,
    Complete,
}

/// Single exchange step machine, polled against a channel it does not own.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transfer {
    write_len: usize,
    read_len: usize,
    step: TransferStep,
}

impl Transfer {
    pub(crate) const fn new(write_len: usize, read_len: usize) -> Self {
        Self {
            write_len,
            read_len,
            step: TransferStep::Idle,
        }
    }

    pub(crate) fn restart(&mut self) {
        self.step = TransferStep::Idle;
    }

    pub(crate) fn poll<IFACE, const N: usize>(
        &mut self,
        channel: &mut Channel<IFACE, N>,
    ) -> Progress<(), Error<IFACE::Error>>
    where
        IFACE: Mma7660Interface,
    {
        loop {
            match self.step {
                TransferStep::Idle => {
                    trace!(
                        "start transfer to {=u8:#x}: write {=usize}, read {=usize}",
                        channel.address,
                        self.write_len,
                        self.read_len
                    );
                    if let Err(err) = channel.interface.start_transfer(
                        channel.address,
                        &mut channel.buffer,
                        self.write_len,
                        self.read_len,
                    ) {
                        warning!("transfer to {=u8:#x} was not accepted", channel.address);
                        self.step = TransferStep::Complete;
                        return Progress::Failed(Error::Interface(err));
                    }
                    self.step = TransferStep::InFlight;
                }
                TransferStep::InFlight => {
                    return match channel.interface.poll_transfer(&mut channel.buffer) {
                        Poll::Pending => Progress::Running,
                        Poll::Ready(Ok(())) => {
                            self.step = TransferStep::Complete;
                            Progress::Done(())
                        }
                        Poll::Ready(Err(err)) => {
                            warning!("transfer to {=u8:#x} failed", channel.address);
                            self.step = TransferStep::Complete;
                            Progress::Failed(Error::Interface(err))
                        }
                    };
                }
                TransferStep::Complete => return Progress::Failed(Error::Finished),
            }
        }
    }
}

/// Resumable write-then-read exchange returned by [`Channel::exchange`].
#[must_use = "operations do nothing unless polled"]
pub struct Exchange<'c, IFACE, const N: usize> {
    channel: &'c mut Channel<IFACE, N>,
    transfer: Transfer,
    state: State,
}

impl<IFACE, const N: usize> Resumable for Exchange<'_, IFACE, N>
where
    IFACE: Mma7660Interface,
{
    type Output = ();
    type Error = Error<IFACE::Error>;

    fn start(&mut self) {
        self.transfer.restart();
        self.state = State::NotStarted;
    }

    fn poll(&mut self) -> Progress<(), Self::Error> {
        let transfer = &mut self.transfer;
        let channel = &mut *self.channel;
        self.state.resume(Error::Finished, || transfer.poll(channel))
    }

    fn state(&self) -> State {
        self.state
    }
}

impl<'c, IFACE, const N: usize> IntoFuture for Exchange<'c, IFACE, N>
where
    IFACE: Mma7660Interface,
{
    type Output = Result<(), Error<IFACE::Error>>;
    type IntoFuture = ResumableFuture<Self>;

    fn into_future(self) -> Self::IntoFuture {
        ResumableFuture::new(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scripted bus that stays busy for a fixed number of polls per transfer
    /// and records every request it was handed.
    pub(crate) struct ScriptedBus {
        pub(crate) busy_polls: u8,
        pub(crate) remaining: u8,
        pub(crate) responses: &'static [&'static [u8]],
        pub(crate) fail_on: Option<usize>,
        pub(crate) requests: Vec<(u8, Vec<u8>, usize)>,
        pub(crate) in_flight: bool,
    }

    impl ScriptedBus {
        pub(crate) fn new(busy_polls: u8, responses: &'static [&'static [u8]]) -> Self {
            Self {
                busy_polls,
                remaining: 0,
                responses,
                fail_on: None,
                requests: Vec::new(),
                in_flight: false,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Nack;

    impl Mma7660Interface for ScriptedBus {
        type Error = Nack;

        fn start_transfer<const M: usize>(
            &mut self,
            address: u8,
            buffer: &mut [u8; M],
            write_len: usize,
            read_len: usize,
        ) -> core::result::Result<(), Nack> {
            assert!(!self.in_flight, "transfer started while another is in flight");
            self.requests
                .push((address, buffer[..write_len].to_vec(), read_len));
            self.remaining = self.busy_polls;
            self.in_flight = true;
            Ok(())
        }

        fn poll_transfer<const M: usize>(
            &mut self,
            buffer: &mut [u8; M],
        ) -> Poll<core::result::Result<(), Nack>> {
            assert!(self.in_flight, "polled without a transfer in flight");
            if self.remaining > 0 {
                self.remaining -= 1;
                return Poll::Pending;
            }

            self.in_flight = false;
            let index = self.requests.len() - 1;
            if self.fail_on == Some(index) {
                return Poll::Ready(Err(Nack));
            }

            let (_, _, read_len) = self.requests[index];
            if read_len > 0 {
                let response = self.responses[index];
                buffer[..read_len].copy_from_slice(&response[..read_len]);
            }
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn exchange_suspends_until_bus_completes() {
        let mut channel: Channel<_, 2> = Channel::new(ScriptedBus::new(2, &[&[0x5A]]), 0x4C);
        channel.buffer_mut()[0] = 0x03;

        let mut exchange = channel.exchange(1, 1);
        assert_eq!(exchange.state(), State::NotStarted);
        assert_eq!(exchange.poll(), Progress::Running);
        assert_eq!(exchange.state(), State::Running);
        assert_eq!(exchange.poll(), Progress::Running);
        assert_eq!(exchange.poll(), Progress::Done(()));
        assert_eq!(exchange.state(), State::Done);

        assert_eq!(channel.buffer()[0], 0x5A);
        let bus = channel.release();
        assert_eq!(bus.requests, vec![(0x4C, vec![0x03], 1)]);
    }

    #[test]
    fn failed_exchange_is_terminal() {
        let mut bus = ScriptedBus::new(0, &[]);
        bus.fail_on = Some(0);
        let mut channel: Channel<_, 2> = Channel::new(bus, 0x4C);

        let mut exchange = channel.exchange(2, 0);
        assert_eq!(exchange.poll(), Progress::Failed(Error::Interface(Nack)));
        assert_eq!(exchange.poll(), Progress::Failed(Error::Finished));

        exchange.start();
        assert_eq!(exchange.state(), State::NotStarted);
    }

    #[test]
    fn restarted_exchange_reissues_transfer() {
        let mut channel: Channel<_, 2> = Channel::new(ScriptedBus::new(0, &[]), 0x4C);
        *channel.buffer_mut() = [0x07, 0x01];

        let mut exchange = channel.exchange(2, 0);
        assert_eq!(exchange.run_blocking(), Ok(()));
        exchange.start();
        assert_eq!(exchange.run_blocking(), Ok(()));

        let bus = channel.release();
        assert_eq!(bus.requests.len(), 2);
        assert_eq!(bus.requests[0], bus.requests[1]);
    }

    #[test]
    #[should_panic(expected = "exchange larger than transaction buffer")]
    fn oversized_exchange_panics() {
        let mut channel: Channel<_, 2> = Channel::new(ScriptedBus::new(0, &[]), 0x4C);
        let _ = channel.exchange(3, 0);
    }
}
