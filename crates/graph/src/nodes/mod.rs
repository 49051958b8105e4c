//! Built-in node types
//!
//! The hardware driver zoo lives outside the core; these are the types the
//! runtime always compiles in.

pub mod analog;
pub mod none;
pub mod wave;

#[cfg(test)]
mod analog_test;
#[cfg(test)]
mod wave_test;
