mod block;
mod device;
mod error;

pub use block::*;
pub use device::*;
pub use error::*;
