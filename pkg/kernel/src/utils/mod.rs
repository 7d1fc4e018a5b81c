#[macro_use]
mod macros;
pub mod logger;

pub use macros::*;
