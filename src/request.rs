//! JSON request/response types used by the `ctc-decode` binary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ctc::GreedyDecoder;
use crate::error::Result;
use crate::types::{DecodedBatch, SequenceLengths, Shape4};

/// A batch to decode, as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeRequest {
    /// Score tensor dims, `[N, T, 1, C]`.
    pub shape: Vec<usize>,
    /// Flat score buffer in the configured layout.
    pub scores: Vec<f32>,
    /// Valid timesteps per sequence. Omitted means every sequence is full length.
    #[serde(default)]
    pub sequence_lengths: Option<Vec<i32>>,
}

/// Decoded labels per sequence, without sentinel padding, plus the padded tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub labels: Vec<Vec<i32>>,
    pub decoded_lengths: Vec<i32>,
    /// Full `[N, T_out]` output including `-1` padding.
    pub padded: Vec<Vec<i32>>,
}

impl DecodeRequest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let request: DecodeRequest = serde_json::from_str(&content)?;
        debug!(
            shape = ?request.shape,
            scores = request.scores.len(),
            "Loaded decode request"
        );
        Ok(request)
    }

    /// Validate the request and run it through `decoder`.
    pub fn run(&self, decoder: &GreedyDecoder) -> Result<DecodeResponse> {
        let shape = Shape4::from_dims(&self.shape)?;
        let scores = decoder.view(&self.scores, shape)?;
        let lengths = match &self.sequence_lengths {
            Some(lengths) => SequenceLengths::from_slice(lengths)?,
            None => SequenceLengths::full(shape.batch, shape.time),
        };

        let decoded: DecodedBatch = decoder.decode(&scores, &lengths)?;
        Ok(DecodeResponse::from(&decoded))
    }
}

impl From<&DecodedBatch> for DecodeResponse {
    fn from(batch: &DecodedBatch) -> Self {
        let n = batch.batch();
        Self {
            labels: (0..n).map(|i| batch.labels(i).to_vec()).collect(),
            decoded_lengths: batch.decoded_lengths().to_vec(),
            padded: (0..n).map(|i| batch.row(i).to_vec()).collect(),
        }
    }
}
