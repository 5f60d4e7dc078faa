//! `no_std` resumable driver for the MMA7660 orientation/motion sensor.

#![cfg_attr(not(test), no_std)]

mod error;
mod log;

pub mod channel;
pub mod config;
pub mod device;
pub mod interface;
pub mod protocol;
pub mod registers;
pub mod resumable;

pub use crate::config::Config;
pub use crate::device::{Mma7660, Reading};
pub use crate::error::{Error, Fault, Result};
pub use crate::resumable::{Progress, Resumable};
