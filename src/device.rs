//! High-level MMA7660 device driver implementation.

use core::future::IntoFuture;

use crate::channel::{Channel, Exchange};
use crate::config::Config;
use crate::error::{Error, Fault};
use crate::interface::{I2cInterface, IntPin, Mma7660Interface};
use crate::log::{debug, error};
use crate::protocol::{ReadRegister, RegisterRead, WriteRegister};
use crate::registers::{AxisOutput, Mode, Register, RegisterValue};
use crate::resumable::{Progress, Resumable, ResumableFuture, State};
use embedded_hal::i2c::I2c;

/// Capacity of the transaction buffer shared by every exchange of a device:
/// one address byte plus one payload byte.
pub const BUFFER_LEN: usize = 2;

// Diagnostic tags carried by initialization faults.
const TAG_CONFIG: &str = "mma7660.cfg";
const TAG_TRANSACTION: &str = "mma7660.rt";

/// Resumable driver for the MMA7660 3-axis orientation/motion sensor.
///
/// Every operation borrows the driver mutably until it is dropped, so a second
/// operation cannot touch the transaction buffer while one is in flight:
///
/// ```compile_fail
/// use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
/// use mma7660::{Config, Mma7660};
/// use mma7660::interface::NoPin;
/// use mma7660::resumable::Resumable;
///
/// let expectations: [Transaction; 0] = [];
/// let mut accel = Mma7660::new_i2c(Mock::new(&expectations), NoPin, Config::default());
/// let mut first = accel.read();
/// let mut second = accel.read();
/// let _ = first.poll();
/// let _ = second.poll();
/// ```
pub struct Mma7660<IFACE, INT> {
    channel: Channel<IFACE, BUFFER_LEN>,
    int: INT,
    config: Config,
}

/// One sample of the three axis output registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Raw `XOUT` register value.
    pub x: i8,
    /// Raw `YOUT` register value.
    pub y: i8,
    /// Raw `ZOUT` register value.
    pub z: i8,
}

impl Reading {
    /// Returns the axes decoded as 6-bit two's complement samples.
    pub fn axes(&self) -> [i8; 3] {
        [self.x, self.y, self.z].map(|raw| AxisOutput::from(raw as u8).sample())
    }

    /// Returns `true` if any axis was read while the device was updating it.
    ///
    /// `read()` does not retry on its own; callers that care re-read.
    pub fn alert(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .any(|raw| AxisOutput::from(*raw as u8).alert())
    }
}

impl<IFACE, INT> Mma7660<IFACE, INT> {
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates a new driver instance from the provided bus interface and INT pin.
    pub fn new(interface: IFACE, int: INT, config: Config) -> Self {
        Self {
            channel: Channel::new(interface, config.address),
            int,
            config,
        }
    }

    /// Consumes the driver and returns the owned interface, pin and configuration.
    pub fn release(self) -> (IFACE, INT, Config) {
        (self.channel.release(), self.int, self.config)
    }

    /// Provides mutable access to the underlying interface.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        self.channel.interface_mut()
    }

    /// Returns a shared reference to the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<I2C, INT> Mma7660<I2cInterface<I2C>, INT>
where
    I2C: I2c,
{
    // ==================================================================
    // == I2C Convenience Constructors ==================================
    // ==================================================================
    /// Convenience constructor for blocking I2C buses.
    pub fn new_i2c(i2c: I2C, int: INT, config: Config) -> Self {
        Self::new(I2cInterface::new(i2c), int, config)
    }

    /// Releases the driver, returning the I2C bus, pin and configuration.
    pub fn release_i2c(self) -> (I2C, INT, Config) {
        let (iface, int, config) = self.release();
        (iface.release(), int, config)
    }
}

impl<IFACE, INT, CommE> Mma7660<IFACE, INT>
where
    IFACE: Mma7660Interface<Error = CommE>,
    INT: IntPin,
{
    // ==================================================================
    // == Initialization ================================================
    // ==================================================================
    /// Configures the INT pin and writes the configured mode, blocking until
    /// the write completes.
    ///
    /// A failed transaction leaves the sensor in an unknown mode and is
    /// returned as a [`Fault`]. Nothing is retried.
    pub fn initialize(&mut self) -> core::result::Result<(), Fault<CommE>> {
        self.initialize_with(core::hint::spin_loop)
    }

    /// Same as [`initialize`](Self::initialize), calling `idle` while the bus
    /// is busy.
    pub fn initialize_with<F>(&mut self, idle: F) -> core::result::Result<(), Fault<CommE>>
    where
        F: FnMut(),
    {
        if self.config.validate().is_err() {
            error!("invalid configuration");
            return Err(Fault::new(TAG_CONFIG, Register::Mode, Error::InvalidConfig));
        }

        self.int.set_input_pull_up();

        let mode = self.config.mode;
        debug!("initializing with mode {=u8:#x}", u8::from(mode));
        self.channel
            .write(Register::Mode, mode)
            .run_blocking_with(idle)
            .map_err(|err| {
                error!("mode write failed");
                Fault::new(TAG_TRANSACTION, Register::Mode, err)
            })
    }

    // ==================================================================
    // == Data Acquisition ==============================================
    // ==================================================================
    /// Reads `XOUT`, `YOUT` and `ZOUT`, one write-then-read round trip each.
    pub fn read(&mut self) -> ReadAxes<'_, IFACE> {
        ReadAxes::new(&mut self.channel)
    }

    /// Probes the device address with an empty write.
    pub fn ping(&mut self) -> Exchange<'_, IFACE, BUFFER_LEN> {
        self.channel.exchange(0, 0)
    }

    // ==================================================================
    // == Register Access ===============================================
    // ==================================================================
    /// Writes the mode register.
    ///
    /// Does not change the mode [`initialize`](Self::initialize) applies.
    pub fn set_mode(&mut self, mode: Mode) -> WriteRegister<'_, IFACE, Mode, BUFFER_LEN> {
        self.channel.write(Register::Mode, mode)
    }

    /// Reads the mode register.
    pub fn mode(&mut self) -> ReadRegister<'_, IFACE, Mode, BUFFER_LEN> {
        self.channel.read(Register::Mode)
    }

    /// Writes a raw value to `register`.
    pub fn write_register<T: RegisterValue>(
        &mut self,
        register: Register,
        value: T,
    ) -> WriteRegister<'_, IFACE, T, BUFFER_LEN> {
        self.channel.write(register, value)
    }

    /// Reads a raw value from `register`.
    pub fn read_register<T: RegisterValue>(
        &mut self,
        register: Register,
    ) -> ReadRegister<'_, IFACE, T, BUFFER_LEN> {
        self.channel.read(register)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    const fn register(self) -> Register {
        match self {
            Self::X => Register::XOut,
            Self::Y => Register::YOut,
            Self::Z => Register::ZOut,
        }
    }

    const fn next(self) -> Option<Self> {
        match self {
            Self::X => Some(Self::Y),
            Self::Y => Some(Self::Z),
            Self::Z => None,
        }
    }
}

/// Resumable three-axis read returned by [`Mma7660::read`].
#[must_use = "operations do nothing unless polled"]
pub struct ReadAxes<'d, IFACE> {
    channel: &'d mut Channel<IFACE, BUFFER_LEN>,
    axis: Axis,
    sample: RegisterRead<i8, BUFFER_LEN>,
    reading: Reading,
    state: State,
}

impl<'d, IFACE> ReadAxes<'d, IFACE>
where
    IFACE: Mma7660Interface,
{
    fn new(channel: &'d mut Channel<IFACE, BUFFER_LEN>) -> Self {
        Self {
            channel,
            axis: Axis::X,
            sample: RegisterRead::new(Axis::X.register()),
            reading: Reading::default(),
            state: State::NotStarted,
        }
    }
}

fn step_axes<IFACE>(
    channel: &mut Channel<IFACE, BUFFER_LEN>,
    axis: &mut Axis,
    sample: &mut RegisterRead<i8, BUFFER_LEN>,
    reading: &mut Reading,
) -> Progress<Reading, Error<IFACE::Error>>
where
    IFACE: Mma7660Interface,
{
    loop {
        let value = match sample.poll(channel) {
            Progress::Running => return Progress::Running,
            Progress::Failed(err) => return Progress::Failed(err),
            Progress::Done(value) => value,
        };

        match axis {
            Axis::X => reading.x = value,
            Axis::Y => reading.y = value,
            Axis::Z => reading.z = value,
        }

        match axis.next() {
            Some(next) => {
                *axis = next;
                *sample = RegisterRead::new(next.register());
            }
            None => return Progress::Done(*reading),
        }
    }
}

impl<IFACE> Resumable for ReadAxes<'_, IFACE>
where
    IFACE: Mma7660Interface,
{
    type Output = Reading;
    type Error = Error<IFACE::Error>;

    fn start(&mut self) {
        self.axis = Axis::X;
        self.sample = RegisterRead::new(Axis::X.register());
        self.reading = Reading::default();
        self.state = State::NotStarted;
    }

    fn poll(&mut self) -> Progress<Reading, Self::Error> {
        let channel = &mut *self.channel;
        let axis = &mut self.axis;
        let sample = &mut self.sample;
        let reading = &mut self.reading;
        self.state
            .resume(Error::Finished, || step_axes(channel, axis, sample, reading))
    }

    fn state(&self) -> State {
        self.state
    }
}

impl<'d, IFACE> IntoFuture for ReadAxes<'d, IFACE>
where
    IFACE: Mma7660Interface,
{
    type Output = Result<Reading, Error<IFACE::Error>>;
    type IntoFuture = ResumableFuture<Self>;

    fn into_future(self) -> Self::IntoFuture {
        ResumableFuture::new(self)
    }
}
