//! Artifact saving

pub mod saver;

pub use saver::*;
