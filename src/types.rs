//! Tensor views and strong types for the decoder's inputs and outputs.
//!
//! The score tensor is always borrowed, never copied: [`ScoreTensor`] only computes
//! offsets into the caller's flat buffer, the way a graph runtime hands over
//! already-materialized memory.

use serde::{Deserialize, Serialize};

use crate::constants::output::{SENTINEL as LABEL_SENTINEL, SENTINEL_F32};
use crate::constants::tensor::{MAX_DIM, SCORE_HEIGHT, SCORE_RANK};
use crate::error::{DecoderError, Result};

/// Element type of the score tensor.
///
/// Comparisons go through [`PartialOrd`], so NaN never compares greater than anything.
pub trait Score: Copy + PartialOrd + Send + Sync + std::fmt::Debug {
    /// Whether this value counts as "valid" in a legacy sequence mask.
    fn is_set(self) -> bool;
}

impl Score for f32 {
    fn is_set(self) -> bool {
        self != 0.0
    }
}

impl Score for f64 {
    fn is_set(self) -> bool {
        self != 0.0
    }
}

/// Element type of the decoded label tensor.
pub trait Label: Copy + PartialEq + Send + Sync + std::fmt::Debug {
    /// Padding value for slots past the decoded length.
    const SENTINEL: Self;

    /// Convert a class index into this representation. Indices are below
    /// `MAX_DIM`, so the `i32` conversion is exact.
    fn from_class(class: usize) -> Self;
}

impl Label for i32 {
    const SENTINEL: Self = LABEL_SENTINEL;

    fn from_class(class: usize) -> Self {
        class as i32
    }
}

impl Label for i64 {
    const SENTINEL: Self = LABEL_SENTINEL as i64;

    fn from_class(class: usize) -> Self {
        class as i64
    }
}

impl Label for f32 {
    const SENTINEL: Self = SENTINEL_F32;

    fn from_class(class: usize) -> Self {
        class as f32
    }
}

impl Label for f64 {
    const SENTINEL: Self = LABEL_SENTINEL as f64;

    fn from_class(class: usize) -> Self {
        class as f64
    }
}

/// Memory order of the score tensor's first two axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `[N, T, 1, C]`: all timesteps of a sequence are contiguous.
    #[default]
    BatchMajor,
    /// `[T, N, 1, C]`: all sequences of a timestep are contiguous.
    TimeMajor,
}

/// Logical shape `[N, T, 1, C]` of a score tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape4 {
    /// Number of sequences (`N`).
    pub batch: usize,
    /// Timesteps per sequence (`T`).
    pub time: usize,
    /// Singleton axis; must be 1.
    pub height: usize,
    /// Class scores per timestep (`C`).
    pub classes: usize,
}

impl Shape4 {
    /// Shape with the singleton axis filled in.
    pub fn new(batch: usize, time: usize, classes: usize) -> Self {
        Self {
            batch,
            time,
            height: SCORE_HEIGHT,
            classes,
        }
    }

    /// Build from dims listed as `[N, T, 1, C]`.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        match *dims {
            [batch, time, height, classes] => {
                let shape = Self {
                    batch,
                    time,
                    height,
                    classes,
                };
                shape.validate()?;
                Ok(shape)
            }
            _ => Err(DecoderError::invalid(format!(
                "score tensor must have rank {}, got {:?}",
                SCORE_RANK, dims
            ))),
        }
    }

    /// Check that every dimension is positive, the third axis is a singleton, `T` and
    /// `C` fit an `i32` and the element count fits a `usize`.
    pub fn validate(&self) -> Result<()> {
        if self.batch == 0 || self.time == 0 || self.classes == 0 {
            return Err(DecoderError::invalid(format!(
                "dimensions must be positive, got N={} T={} C={}",
                self.batch, self.time, self.classes
            )));
        }
        if self.height != SCORE_HEIGHT {
            return Err(DecoderError::invalid(format!(
                "third score axis must be {}, got {}",
                SCORE_HEIGHT, self.height
            )));
        }
        if self.time > MAX_DIM || self.classes > MAX_DIM {
            return Err(DecoderError::invalid(format!(
                "T={} and C={} must not exceed {}",
                self.time, self.classes, MAX_DIM
            )));
        }
        self.numel()?;
        Ok(())
    }

    /// Total number of scores. Fails if the product overflows `usize`.
    pub fn numel(&self) -> Result<usize> {
        self.batch
            .checked_mul(self.time)
            .and_then(|v| v.checked_mul(self.height))
            .and_then(|v| v.checked_mul(self.classes))
            .ok_or_else(|| DecoderError::invalid(format!("shape {:?} overflows usize", self)))
    }
}

/// Zero-copy view over a flat score buffer.
#[derive(Debug, Clone, Copy)]
pub struct ScoreTensor<'a, S: Score> {
    data: &'a [S],
    shape: Shape4,
    layout: TensorLayout,
}

impl<'a, S: Score> ScoreTensor<'a, S> {
    /// Wrap a batch-major `[N, T, 1, C]` buffer.
    pub fn new(data: &'a [S], shape: Shape4) -> Result<Self> {
        Self::with_layout(data, shape, TensorLayout::BatchMajor)
    }

    /// Wrap a buffer stored in the given layout.
    pub fn with_layout(data: &'a [S], shape: Shape4, layout: TensorLayout) -> Result<Self> {
        shape.validate()?;
        let expected = shape.numel()?;
        if data.len() != expected {
            return Err(DecoderError::invalid(format!(
                "score buffer holds {} values but shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self {
            data,
            shape,
            layout,
        })
    }

    pub fn shape(&self) -> Shape4 {
        self.shape
    }

    /// The `C` class scores of sequence `n` at timestep `t`.
    ///
    /// Panics if `n` or `t` is out of range; callers index within a validated shape.
    pub fn frame(&self, n: usize, t: usize) -> &'a [S] {
        let Shape4 {
            batch,
            time,
            classes,
            ..
        } = self.shape;
        debug_assert!(n < batch && t < time);
        let row = match self.layout {
            TensorLayout::BatchMajor => n * time + t,
            TensorLayout::TimeMajor => t * batch + n,
        };
        let start = row * classes;
        &self.data[start..start + classes]
    }
}

/// Validated per-sequence valid lengths (`[N]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceLengths(Vec<usize>);

impl SequenceLengths {
    /// From the integer tensor a graph supplies. Negative values are rejected.
    pub fn from_slice(lengths: &[i32]) -> Result<Self> {
        lengths
            .iter()
            .enumerate()
            .map(|(n, &len)| {
                usize::try_from(len).map_err(|_| {
                    DecoderError::invalid(format!(
                        "sequence {} has negative length {}",
                        n, len
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn from_lengths(lengths: Vec<usize>) -> Self {
        Self(lengths)
    }

    /// Every sequence uses all `time` steps.
    pub fn full(batch: usize, time: usize) -> Self {
        Self(vec![time; batch])
    }

    /// From a legacy `[T, N]` sequence mask: the length of sequence `n` is the number of
    /// leading set entries in column `n`. Anything after the first unset entry is ignored.
    pub fn from_mask<S: Score>(mask: &[S], time: usize, batch: usize) -> Result<Self> {
        let expected = time.checked_mul(batch).ok_or_else(|| {
            DecoderError::invalid(format!("mask [T={}, N={}] overflows usize", time, batch))
        })?;
        if mask.len() != expected {
            return Err(DecoderError::invalid(format!(
                "sequence mask holds {} values but [T={}, N={}] needs {}",
                mask.len(),
                time,
                batch,
                expected
            )));
        }
        let lengths = (0..batch)
            .map(|n| {
                (0..time)
                    .take_while(|&t| mask[t * batch + n].is_set())
                    .count()
            })
            .collect();
        Ok(Self(lengths))
    }

    /// Check the vector against the score tensor's shape.
    pub fn validate(&self, shape: &Shape4) -> Result<()> {
        if self.0.len() != shape.batch {
            return Err(DecoderError::invalid(format!(
                "expected {} sequence lengths, got {}",
                shape.batch,
                self.0.len()
            )));
        }
        if let Some((n, &len)) = self.0.iter().enumerate().find(|&(_, &len)| len > shape.time) {
            return Err(DecoderError::invalid(format!(
                "sequence {} has length {} outside [0, {}]",
                n, len, shape.time
            )));
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Longest declared length, or 0 for an empty vector.
    pub fn max(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

/// Owned result of decoding one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch<L: Label = i32> {
    labels: Vec<L>,
    decoded_lengths: Vec<i32>,
    time: usize,
}

impl<L: Label> DecodedBatch<L> {
    pub(crate) fn new(labels: Vec<L>, decoded_lengths: Vec<i32>, time: usize) -> Self {
        Self {
            labels,
            decoded_lengths,
            time,
        }
    }

    /// Number of sequences.
    pub fn batch(&self) -> usize {
        self.decoded_lengths.len()
    }

    /// Output time extent.
    pub fn time(&self) -> usize {
        self.time
    }

    /// Full padded row for sequence `n`.
    pub fn row(&self, n: usize) -> &[L] {
        &self.labels[n * self.time..(n + 1) * self.time]
    }

    /// Only the decoded labels of sequence `n`, without sentinel padding.
    pub fn labels(&self, n: usize) -> &[L] {
        &self.row(n)[..self.decoded_lengths[n] as usize]
    }

    pub fn decoded_lengths(&self) -> &[i32] {
        &self.decoded_lengths
    }

    /// Flat `[N, T_out]` label buffer.
    pub fn as_flat(&self) -> &[L] {
        &self.labels
    }
}
