//! Per-timestep arg-max over class scores.
//!
//! The scan is seeded with class 0 and only moves on a strict `>`, so among equal
//! maxima the lowest class index wins. NaN follows from the same rule: `x > NaN` and
//! `NaN > x` are both false, so a NaN never takes over the running maximum, and a NaN
//! at class 0 is never displaced.

use crate::types::Score;

/// Index and value of the highest score, or `None` for an empty slice.
pub fn argmax<S: Score>(scores: &[S]) -> Option<(usize, S)> {
    let (&first, rest) = scores.split_first()?;

    let mut max_idx = 0;
    let mut max_val = first;

    // Unrolled in class order; every lane is compared sequentially so ties keep the
    // earliest index.
    let chunks = rest.chunks_exact(4);
    let remainder = chunks.remainder();

    let mut base_idx = 1;
    for chunk in chunks {
        if chunk[0] > max_val {
            max_val = chunk[0];
            max_idx = base_idx;
        }
        if chunk[1] > max_val {
            max_val = chunk[1];
            max_idx = base_idx + 1;
        }
        if chunk[2] > max_val {
            max_val = chunk[2];
            max_idx = base_idx + 2;
        }
        if chunk[3] > max_val {
            max_val = chunk[3];
            max_idx = base_idx + 3;
        }
        base_idx += 4;
    }

    for (i, &val) in remainder.iter().enumerate() {
        if val > max_val {
            max_val = val;
            max_idx = base_idx + i;
        }
    }

    Some((max_idx, max_val))
}

/// Straight-line reference scan, kept for cross-checking the unrolled version.
#[cfg(test)]
fn argmax_scalar<S: Score>(scores: &[S]) -> Option<(usize, S)> {
    let mut iter = scores.iter().copied().enumerate();
    let (mut max_idx, mut max_val) = iter.next()?;
    for (i, val) in iter {
        if val > max_val {
            max_val = val;
            max_idx = i;
        }
    }
    Some((max_idx, max_val))
}
