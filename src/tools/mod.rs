//! Standalone utilities for finished tracks: validation, shifting, text export

pub mod cli;
pub mod export;
pub mod shift;
pub mod validate;
