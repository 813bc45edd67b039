//! Data types shared across the storage and fetch layers.

pub mod candle;
pub mod records;

pub use candle::*;
pub use records::*;
