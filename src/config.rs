//! Decoder configuration.
//!
//! A [`DecoderConfig`] can be built in code or loaded from multiple sources with
//! figment, following the same precedence as the rest of the toolchain:
//! environment variables over YAML over TOML over built-in defaults.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{execution::DEFAULT_PARALLEL_THRESHOLD, sources};
use crate::error::{DecoderError, ErrorContext, Result};
use crate::types::{Shape4, TensorLayout};

/// How the batch loop is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One sequence after another on the calling thread.
    Sequential,
    /// Always fan sequences out to worker threads.
    Parallel,
    /// Parallel once the batch reaches `parallel_threshold` scores.
    #[default]
    Auto,
}

fn default_merge_repeated() -> bool {
    true
}
fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

/// Greedy decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Class treated as "no output". `None` selects the last class (`C - 1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank_index: Option<usize>,

    /// Collapse consecutive equal non-blank labels into one.
    #[serde(default = "default_merge_repeated")]
    pub merge_repeated: bool,

    /// Time extent of the output label tensor. `None` means the input's `T`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_time_dim: Option<usize>,

    /// Memory order of the score tensor.
    #[serde(default)]
    pub layout: TensorLayout,

    /// Batch scheduling.
    #[serde(default)]
    pub execution: ExecutionMode,

    /// Batch size, in scores, at which `Auto` switches to parallel execution.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Size of a dedicated worker pool. `None` uses rayon's global pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            blank_index: None,
            merge_repeated: default_merge_repeated(),
            output_time_dim: None,
            layout: TensorLayout::default(),
            execution: ExecutionMode::default(),
            parallel_threshold: default_parallel_threshold(),
            worker_threads: None,
        }
    }
}

impl DecoderConfig {
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    /// Load configuration with precedence:
    /// 1. `CTC_`-prefixed environment variables (highest priority)
    /// 2. `ctc_decoder.yaml` (if exists)
    /// 3. `ctc_decoder.toml` (if exists)
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        let config: DecoderConfig = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(sources::CONFIG_TOML))
            .merge(Yaml::file(sources::CONFIG_YAML))
            .merge(Env::prefixed(sources::ENV_PREFIX))
            .extract()
            .config_context("Failed to load configuration")?;

        config.validate()?;
        debug!(?config, "Loaded decoder configuration");
        Ok(config)
    }

    /// Load from one explicit TOML or YAML file over the defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
            _ => {
                return Err(DecoderError::Configuration(format!(
                    "unsupported configuration file {:?}, expected .toml or .yaml",
                    path
                )))
            }
        };

        let config: DecoderConfig = figment
            .extract()
            .config_context("Failed to load configuration")?;
        config.validate()?;
        debug!(?config, ?path, "Loaded decoder configuration from file");
        Ok(config)
    }

    /// Validate values that do not depend on a particular input tensor.
    pub fn validate(&self) -> Result<()> {
        if self.output_time_dim == Some(0) {
            return Err(DecoderError::Configuration(
                "output_time_dim must be positive".to_string(),
            ));
        }
        if self.parallel_threshold == 0 {
            return Err(DecoderError::Configuration(
                "parallel_threshold must be positive".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(DecoderError::Configuration(
                "worker_threads must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Blank class for an input with the given shape, checked against `[0, C)`.
    pub fn resolve_blank(&self, shape: &Shape4) -> Result<usize> {
        let blank = self.blank_index.unwrap_or(shape.classes.saturating_sub(1));
        if blank >= shape.classes {
            return Err(DecoderError::invalid(format!(
                "blank_index {} outside [0, {})",
                blank, shape.classes
            )));
        }
        Ok(blank)
    }

    /// Output time extent for an input with the given shape.
    pub fn resolve_output_time(&self, shape: &Shape4) -> usize {
        self.output_time_dim.unwrap_or(shape.time)
    }

    /// Export configuration to TOML format
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).config_context("Failed to serialize to TOML")
    }

    /// Export configuration to YAML format
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).config_context("Failed to serialize to YAML")
    }
}

/// Fluent builder for [`DecoderConfig`].
#[derive(Debug, Clone, Default)]
pub struct DecoderConfigBuilder {
    config: DecoderConfig,
}

impl DecoderConfigBuilder {
    pub fn blank_index(mut self, blank: usize) -> Self {
        self.config.blank_index = Some(blank);
        self
    }

    pub fn merge_repeated(mut self, merge: bool) -> Self {
        self.config.merge_repeated = merge;
        self
    }

    pub fn output_time_dim(mut self, time: usize) -> Self {
        self.config.output_time_dim = Some(time);
        self
    }

    pub fn layout(mut self, layout: TensorLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn execution(mut self, mode: ExecutionMode) -> Self {
        self.config.execution = mode;
        self
    }

    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = Some(threads);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<DecoderConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.blank_index, None);
        assert!(config.merge_repeated);
        assert_eq!(config.output_time_dim, None);
        assert_eq!(config.layout, TensorLayout::BatchMajor);
        assert_eq!(config.execution, ExecutionMode::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_blank() {
        let shape = Shape4::new(2, 8, 11);
        assert_eq!(DecoderConfig::default().resolve_blank(&shape).unwrap(), 10);

        let config = DecoderConfig::builder().blank_index(5).build().unwrap();
        assert_eq!(config.resolve_blank(&shape).unwrap(), 5);

        let config = DecoderConfig::builder().blank_index(11).build().unwrap();
        let err = config.resolve_blank(&shape).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_resolve_output_time() {
        let shape = Shape4::new(2, 8, 11);
        assert_eq!(DecoderConfig::default().resolve_output_time(&shape), 8);
        let config = DecoderConfig::builder().output_time_dim(12).build().unwrap();
        assert_eq!(config.resolve_output_time(&shape), 12);
    }

    #[test]
    fn test_builder_rejects_zero_values() {
        assert!(DecoderConfig::builder().output_time_dim(0).build().is_err());
        assert!(DecoderConfig::builder().parallel_threshold(0).build().is_err());
        assert!(DecoderConfig::builder().worker_threads(0).build().is_err());
    }

    #[test]
    fn test_load_layers_sources_in_order() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                sources::CONFIG_TOML,
                "blank_index = 1\nmerge_repeated = false\nparallel_threshold = 100\nlayout = \"time_major\"",
            )?;
            jail.create_file(sources::CONFIG_YAML, "blank_index: 2\nparallel_threshold: 200")?;
            jail.set_env("CTC_BLANK_INDEX", 3);

            let config = DecoderConfig::load().map_err(|e| e.to_string())?;
            // env over yaml over toml
            assert_eq!(config.blank_index, Some(3));
            assert_eq!(config.parallel_threshold, 200);
            // toml over defaults
            assert!(!config.merge_repeated);
            assert_eq!(config.layout, TensorLayout::TimeMajor);
            // untouched
            assert_eq!(config.execution, ExecutionMode::Auto);
            assert_eq!(config.output_time_dim, None);
            Ok(())
        });
    }

    #[test]
    fn test_load_env_only() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CTC_MERGE_REPEATED", false);
            jail.set_env("CTC_EXECUTION", "parallel");

            let config = DecoderConfig::load().map_err(|e| e.to_string())?;
            assert!(!config.merge_repeated);
            assert_eq!(config.execution, ExecutionMode::Parallel);
            assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CTC_WORKER_THREADS", 0);
            let err = DecoderConfig::load().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "blank_index = 5\nmerge_repeated = false\nlayout = \"time_major\"\nexecution = \"sequential\""
        )
        .unwrap();

        let config = DecoderConfig::load_from(file.path()).unwrap();
        assert_eq!(config.blank_index, Some(5));
        assert!(!config.merge_repeated);
        assert_eq!(config.layout, TensorLayout::TimeMajor);
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert_eq!(config.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "blank_index: 0\noutput_time_dim: 16").unwrap();

        let config = DecoderConfig::load_from(file.path()).unwrap();
        assert_eq!(config.blank_index, Some(0));
        assert_eq!(config.output_time_dim, Some(16));
        assert!(config.merge_repeated);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "output_time_dim = 0").unwrap();
        let err = DecoderConfig::load_from(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_load_from_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(DecoderConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_export_round_trip_toml() {
        let config = DecoderConfig::builder()
            .blank_index(3)
            .merge_repeated(false)
            .build()
            .unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("blank_index = 3"));
        let parsed: DecoderConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_export_yaml() {
        let yaml = DecoderConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("merge_repeated: true"));
        assert!(yaml.contains("execution: auto"));
    }
}
