//! Configuration for operator contexts.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// How aggressively a geometry is prepared for repeated relational tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccelerationDegree {
    /// Quad tree plus a coarse raster.
    Mild,
    /// Quad tree plus a medium raster.
    Medium,
    /// Quad tree plus a fine raster.
    Hot,
}

/// Raster edge length (cells per side) for each acceleration degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    pub mild: usize,
    pub medium: usize,
    pub hot: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            mild: 32,
            medium: 64,
            hot: 256,
        }
    }
}

impl RasterConfig {
    pub fn resolution(&self, degree: AccelerationDegree) -> usize {
        match degree {
            AccelerationDegree::Mild => self.mild,
            AccelerationDegree::Medium => self.medium,
            AccelerationDegree::Hot => self.hot,
        }
    }
}

/// Tunables shared by every operator created from one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Number of ring slots in the accelerator cache.
    pub accelerator_cache_capacity: usize,
    /// Minimum vertex count before a quad tree is worth building.
    pub quad_tree_min_vertices: usize,
    /// Raster sizes per acceleration degree.
    pub raster: RasterConfig,
    /// Upper bound on cluster/crack rounds in one noding call.
    pub max_noding_iterations: usize,
    /// Inputs folded together per incremental union step.
    pub union_batch_size: usize,
    /// Units of work between two progress polls.
    pub progress_interval: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            accelerator_cache_capacity: 64,
            quad_tree_min_vertices: 20,
            raster: RasterConfig::default(),
            max_noding_iterations: 16,
            union_batch_size: 16,
            progress_interval: 256,
        }
    }
}

impl KernelConfig {
    /// Small caches and frequent polling, useful for tests and tooling.
    pub fn interactive() -> Self {
        Self {
            accelerator_cache_capacity: 8,
            progress_interval: 16,
            ..Self::default()
        }
    }

    /// Large caches and fine rasters for batch relate workloads.
    pub fn batch() -> Self {
        Self {
            accelerator_cache_capacity: 1024,
            union_batch_size: 32,
            progress_interval: 4096,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| KernelError::invalid_argument(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.accelerator_cache_capacity == 0 {
            return Err(KernelError::invalid_argument(
                "accelerator_cache_capacity must be at least 1",
            ));
        }
        if self.max_noding_iterations == 0 {
            return Err(KernelError::invalid_argument(
                "max_noding_iterations must be at least 1",
            ));
        }
        // One slot is reserved for the running accumulator.
        if self.union_batch_size < 2 || self.union_batch_size > 63 {
            return Err(KernelError::invalid_argument(
                "union_batch_size must be within 2..=63",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
        assert!(KernelConfig::interactive().validate().is_ok());
        assert!(KernelConfig::batch().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = KernelConfig::from_json(r#"{ "quad_tree_min_vertices": 50 }"#).unwrap();
        assert_eq!(config.quad_tree_min_vertices, 50);
        assert_eq!(config.accelerator_cache_capacity, 64);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let err = KernelConfig::from_json(r#"{ "union_batch_size": 1 }"#).unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
        let err = KernelConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }

    #[test]
    fn test_raster_resolution_by_degree() {
        let raster = RasterConfig::default();
        assert!(raster.resolution(AccelerationDegree::Mild) < raster.resolution(AccelerationDegree::Hot));
    }
}
