//! # Pipeline Configuration Module
//!
//! Stage switches, worker pool sizes and selection threshold for a pipeline
//! run. Uses the builder pattern.
//!
//! ## Key Components
//!
//! - `PipelineConfig`: run settings
//! - `PipelineConfigBuilder`: builder for `PipelineConfig`

use std::path::PathBuf;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the on-disk layout
    pub output_dir: PathBuf,

    /// Fan downloads and structuring out over worker pools
    pub parallel: bool,

    /// Concurrent downloads when parallel
    pub download_workers: usize,

    /// Concurrent structuring calls when parallel
    pub processing_workers: usize,

    /// Minimum classifier confidence for an accepted link to be downloaded
    pub min_confidence: f64,

    /// Discover and download; when off, documents already on disk are used
    pub scrape: bool,

    /// Structure and store downloaded documents
    pub process: bool,

    /// Reuse `.md`/`.json` companions from earlier runs
    pub reuse_companions: bool,

    /// Apply the rule-based tagger after storing
    pub auto_tag: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            parallel: true,
            download_workers: 5,
            processing_workers: 3,
            min_confidence: 0.5,
            scrape: true,
            process: true,
            reuse_companions: true,
            auto_tag: false,
        }
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Download pool size, at least one
    pub fn download_workers(mut self, workers: usize) -> Self {
        self.config.download_workers = workers.max(1);
        self
    }

    /// Structuring pool size, at least one
    pub fn processing_workers(mut self, workers: usize) -> Self {
        self.config.processing_workers = workers.max(1);
        self
    }

    pub fn min_confidence(mut self, min_confidence: f64) -> Self {
        self.config.min_confidence = min_confidence;
        self
    }

    pub fn scrape(mut self, scrape: bool) -> Self {
        self.config.scrape = scrape;
        self
    }

    pub fn process(mut self, process: bool) -> Self {
        self.config.process = process;
        self
    }

    pub fn reuse_companions(mut self, reuse: bool) -> Self {
        self.config.reuse_companions = reuse;
        self
    }

    pub fn auto_tag(mut self, auto_tag: bool) -> Self {
        self.config.auto_tag = auto_tag;
        self
    }

    /// Build the configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl PipelineConfig {
    /// Create a new builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Effective download concurrency
    pub fn download_concurrency(&self) -> usize {
        if self.parallel {
            self.download_workers.max(1)
        } else {
            1
        }
    }

    /// Effective structuring concurrency
    pub fn processing_concurrency(&self) -> usize {
        if self.parallel {
            self.processing_workers.max(1)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("data"));
        assert_eq!(config.download_concurrency(), 5);
        assert_eq!(config.processing_concurrency(), 3);
        assert!(config.scrape && config.process && !config.auto_tag);
    }

    #[test]
    fn test_sequential_forces_single_worker() {
        let config = PipelineConfig::builder()
            .parallel(false)
            .download_workers(8)
            .processing_workers(0)
            .build();
        assert_eq!(config.download_concurrency(), 1);
        assert_eq!(config.processing_concurrency(), 1);
        assert_eq!(config.processing_workers, 1);
    }
}
