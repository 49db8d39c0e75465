//! Speech model implementations.

pub mod tdt;
