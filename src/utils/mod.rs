//! Utility functions for vidq

pub mod filename;

pub use filename::*;
