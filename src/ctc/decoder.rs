//! CTC greedy decoder.
//!
//! Each sequence is decoded independently: take the arg-max class at every valid
//! timestep, drop the blank class, optionally collapse consecutive repeats, then pad
//! the rest of the output row with the sentinel. Everything is validated before the
//! first write, so a failed call leaves the output buffers untouched.

use tracing::{debug, debug_span, trace};

use crate::config::DecoderConfig;
use crate::ctc::argmax::argmax;
use crate::ctc::batch::BatchExecutor;
use crate::error::{DecoderError, Result};
use crate::types::{DecodedBatch, Label, Score, ScoreTensor, SequenceLengths, Shape4};

/// Label carried from one timestep to the next.
///
/// `Reset` is the state at the start of a sequence and after every blank, so the
/// first symbol after it is never treated as a repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviousLabel {
    Reset,
    Holding(usize),
}

/// Per-call values resolved against the input shape.
#[derive(Debug, Clone, Copy)]
struct DecodePlan {
    blank: usize,
    merge_repeated: bool,
    output_time: usize,
    /// `N * T_out`, checked for overflow.
    label_len: usize,
}

/// Batched CTC greedy decoder.
///
/// The decoder holds no per-call state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct GreedyDecoder {
    config: DecoderConfig,
    executor: BatchExecutor,
}

impl GreedyDecoder {
    /// Create a decoder. Fails if the configuration is invalid or a dedicated worker
    /// pool cannot be started.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let executor = BatchExecutor::new(&config)?;
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Wrap a flat score buffer using the configured layout.
    pub fn view<'a, S: Score>(
        &self,
        data: &'a [S],
        shape: Shape4,
    ) -> Result<ScoreTensor<'a, S>> {
        ScoreTensor::with_layout(data, shape, self.config.layout)
    }

    /// Decode a batch into freshly allocated buffers.
    pub fn decode<S: Score, L: Label>(
        &self,
        scores: &ScoreTensor<'_, S>,
        seq_lengths: &SequenceLengths,
    ) -> Result<DecodedBatch<L>> {
        let shape = scores.shape();
        let plan = self.plan(&shape, seq_lengths)?;
        let mut labels = vec![L::SENTINEL; plan.label_len];
        let mut decoded_lengths = vec![0i32; shape.batch];

        self.decode_into(
            scores,
            seq_lengths,
            &mut labels,
            Some(decoded_lengths.as_mut_slice()),
        )?;
        Ok(DecodedBatch::new(labels, decoded_lengths, plan.output_time))
    }

    /// Decode a batch into caller-owned buffers.
    ///
    /// `labels` is the `[N, T_out]` output, where `T_out` is `output_time_dim` or the
    /// input's `T`. `decoded_lengths`, when given, receives one count per sequence.
    pub fn decode_into<S: Score, L: Label>(
        &self,
        scores: &ScoreTensor<'_, S>,
        seq_lengths: &SequenceLengths,
        labels: &mut [L],
        decoded_lengths: Option<&mut [i32]>,
    ) -> Result<()> {
        let shape = scores.shape();
        let plan = self.plan(&shape, seq_lengths)?;

        if labels.len() != plan.label_len {
            return Err(DecoderError::invalid(format!(
                "label buffer holds {} values but [N={}, T_out={}] needs {}",
                labels.len(),
                shape.batch,
                plan.output_time,
                plan.label_len
            )));
        }
        if let Some(lengths) = decoded_lengths.as_deref() {
            if lengths.len() != shape.batch {
                return Err(DecoderError::invalid(format!(
                    "decoded-length buffer holds {} values but the batch has {} sequences",
                    lengths.len(),
                    shape.batch
                )));
            }
        }

        let span = debug_span!(
            "ctc_greedy_decode",
            batch = shape.batch,
            time = shape.time,
            classes = shape.classes,
            blank = plan.blank,
            merge_repeated = plan.merge_repeated,
        );
        let _guard = span.enter();

        let parallel = self.executor.is_parallel(&shape);
        debug!(parallel, output_time = plan.output_time, "Decoding batch");

        self.executor.run(
            &shape,
            labels,
            plan.output_time,
            decoded_lengths,
            |n, row| {
                let valid = seq_lengths.as_slice()[n];
                let written = decode_row(scores, n, valid, &plan, row);
                trace!(sequence = n, valid, written, "Decoded sequence");
                written
            },
        );

        Ok(())
    }

    /// Decode the single sequence `n` into `row` and return its decoded length.
    ///
    /// `row` must hold exactly the output time extent. The whole batch's lengths are
    /// validated, the same as for a full decode.
    pub fn decode_sequence<S: Score, L: Label>(
        &self,
        scores: &ScoreTensor<'_, S>,
        seq_lengths: &SequenceLengths,
        n: usize,
        row: &mut [L],
    ) -> Result<usize> {
        let shape = scores.shape();
        let plan = self.plan(&shape, seq_lengths)?;

        if n >= shape.batch {
            return Err(DecoderError::invalid(format!(
                "sequence {} outside batch of {}",
                n, shape.batch
            )));
        }
        if row.len() != plan.output_time {
            return Err(DecoderError::invalid(format!(
                "output row holds {} values but T_out is {}",
                row.len(),
                plan.output_time
            )));
        }

        Ok(decode_row(scores, n, seq_lengths.as_slice()[n], &plan, row))
    }

    /// Resolve and check everything that depends on the input shape.
    fn plan(&self, shape: &Shape4, seq_lengths: &SequenceLengths) -> Result<DecodePlan> {
        shape.validate()?;
        let blank = self.config.resolve_blank(shape)?;
        seq_lengths.validate(shape)?;

        let output_time = self.config.resolve_output_time(shape);
        let label_len = shape.batch.checked_mul(output_time).ok_or_else(|| {
            DecoderError::invalid(format!(
                "output [N={}, T_out={}] overflows usize",
                shape.batch, output_time
            ))
        })?;
        if let Some((sequence, &required)) = seq_lengths
            .as_slice()
            .iter()
            .enumerate()
            .find(|&(_, &len)| len > output_time)
        {
            return Err(DecoderError::OutputTooSmall {
                sequence,
                required,
                available: output_time,
            });
        }

        Ok(DecodePlan {
            blank,
            merge_repeated: self.config.merge_repeated,
            output_time,
            label_len,
        })
    }
}

/// Decode one sequence into its output row. Reads only timesteps `0..valid`.
fn decode_row<S: Score, L: Label>(
    scores: &ScoreTensor<'_, S>,
    n: usize,
    valid: usize,
    plan: &DecodePlan,
    row: &mut [L],
) -> usize {
    let mut write_pos = 0;
    let mut previous = PreviousLabel::Reset;

    for t in 0..valid {
        // Frames are never empty: C >= 1 is checked before decoding starts.
        let best = match argmax(scores.frame(n, t)) {
            Some((class, _)) => class,
            None => continue,
        };

        if best == plan.blank {
            previous = PreviousLabel::Reset;
            continue;
        }
        if plan.merge_repeated && previous == PreviousLabel::Holding(best) {
            continue;
        }

        row[write_pos] = L::from_class(best);
        write_pos += 1;
        previous = PreviousLabel::Holding(best);
    }

    row[write_pos..].fill(L::SENTINEL);
    write_pos
}
