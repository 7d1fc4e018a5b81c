pub mod fat;

pub use fat::*;
