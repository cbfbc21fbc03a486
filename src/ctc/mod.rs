//! CTC greedy decoding.
//!
//! This module contains the arg-max kernel, the per-sequence decode loop and the
//! batch scheduler that runs it over every sequence of a batch.

mod argmax;
mod batch;
mod decoder;

pub use argmax::argmax;
pub use decoder::GreedyDecoder;
