#![doc = include_str!("../README.md")]

mod error;

pub mod carrier;
#[cfg(feature = "serde")]
pub mod config;
pub mod decoder;
pub mod frame;
pub mod link;
pub mod telemetry;

pub use error::{Error, Result};

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}
