//! Domain constants for the CTC decoder.
//!
//! Compile-time values only; anything a deployment may want to tune lives in
//! [`crate::config::DecoderConfig`].

/// Decoder output constants.
pub mod output {
    /// Integral value written to every unused trailing output slot.
    pub const SENTINEL: i32 = -1;

    /// Real-valued form of [`SENTINEL`] for graphs that carry labels as floats.
    pub const SENTINEL_F32: f32 = -1.0;
}

/// Input tensor constants.
pub mod tensor {
    /// Rank of the score tensor (`[N, T, 1, C]`).
    pub const SCORE_RANK: usize = 4;

    /// Required extent of the singleton third axis.
    pub const SCORE_HEIGHT: usize = 1;

    /// Largest `T` or `C` accepted. Class indices and decoded lengths are emitted as `i32`.
    pub const MAX_DIM: usize = i32::MAX as usize;
}

/// Batch execution constants.
pub mod execution {
    /// Minimum number of scores (`N * T * C`) before `Auto` mode fans out to worker threads.
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64 * 1024;
}

/// Configuration source names.
pub mod sources {
    /// TOML configuration file looked up in the working directory.
    pub const CONFIG_TOML: &str = "ctc_decoder.toml";

    /// YAML configuration file looked up in the working directory.
    pub const CONFIG_YAML: &str = "ctc_decoder.yaml";

    /// Prefix for environment variable overrides.
    pub const ENV_PREFIX: &str = "CTC_";
}
