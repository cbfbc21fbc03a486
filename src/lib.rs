//! The `ctc_greedy_decoder` core library.
//!
//! This crate provides a batched CTC (Connectionist Temporal Classification) greedy
//! decoder: per-timestep arg-max, blank removal, optional repeat merging, and
//! sentinel-padded output rows with optional per-sequence decoded lengths.
//!
//! ```
//! use ctc_greedy_decoder::{DecodedBatch, DecoderConfig, GreedyDecoder, SequenceLengths, Shape4};
//!
//! # fn main() -> ctc_greedy_decoder::error::Result<()> {
//! let config = DecoderConfig::builder().blank_index(0).build()?;
//! let decoder = GreedyDecoder::new(config)?;
//!
//! // One sequence, three timesteps, two classes: path 1 1 0
//! let data = [0.2f32, 0.8, 0.1, 0.9, 0.7, 0.3];
//! let scores = decoder.view(&data, Shape4::new(1, 3, 2))?;
//! let decoded: DecodedBatch = decoder.decode(&scores, &SequenceLengths::full(1, 3))?;
//!
//! assert_eq!(decoded.row(0), &[1, -1, -1]);
//! assert_eq!(decoded.decoded_lengths(), &[1]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod ctc;
pub mod error;
pub mod request;
pub mod telemetry;
pub mod types;

pub use config::{DecoderConfig, ExecutionMode};
pub use ctc::GreedyDecoder;
pub use error::{DecoderError, ErrorKind};
pub use types::{DecodedBatch, Label, Score, ScoreTensor, SequenceLengths, Shape4, TensorLayout};
