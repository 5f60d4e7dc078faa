//! Error handling primitives for the MMA7660 driver.

use crate::registers::Register;

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus layer reported that the exchange did not complete.
    Interface(E),
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// The operation was polled again after reaching a terminal state.
    Finished,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}

/// Unrecoverable driver fault raised while bringing the sensor up.
///
/// The driver never halts on its own. A caller that cannot continue with the
/// sensor in an unknown mode calls [`Fault::escalate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault<E> {
    /// Diagnostic tag identifying the failing step.
    pub tag: &'static str,
    /// Register the failing transaction addressed.
    pub register: Register,
    /// Underlying error.
    pub error: Error<E>,
}

impl<E> Fault<E> {
    pub(crate) const fn new(tag: &'static str, register: Register, error: Error<E>) -> Self {
        Self {
            tag,
            register,
            error,
        }
    }

    /// Halts the program with the fault's tag and register address.
    pub fn escalate(self) -> ! {
        crate::log::error!("fault {=str} at register {=u8:#x}", self.tag, self.register.addr());
        panic!(
            "{}: transaction failed at register {:#04x}",
            self.tag,
            self.register.addr()
        )
    }
}
