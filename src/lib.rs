#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

pub mod error;
pub mod events;
pub mod path;
pub mod session;
pub mod settings;
pub mod storage;
#[cfg(test)]
mod testutil;
