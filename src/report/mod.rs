//! Report compilation and rendering.

pub mod generator;

pub use generator::*;
