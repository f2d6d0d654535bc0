//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every key is optional:
//!
//! ```toml
//! [tick]
//! target_tps = 20.0
//! max_cps = 100.0
//! performance_interval_ms = 0.0
//! performance_alpha = 0.9
//!
//! [spatial]
//! tile_size = 100.0
//! strategy = "curve"        # or "hierarchical"
//! chunk_tiles = 5
//! region_chunks = 20
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_core::SpatialConfig;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::tick_loop::{TickLoop, TickLoopConfig};
use crate::world::World;

/// Complete runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick loop settings.
    pub tick: TickLoopConfig,
    /// Spatial index settings.
    pub spatial: SpatialConfig,
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown value
    /// types, and [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        let tick = &self.tick;
        if !(tick.target_tps.is_finite() && tick.target_tps > 0.0) {
            return Err(invalid("tick.target_tps", "must be a finite number above zero"));
        }
        if !(tick.max_cps.is_finite() && tick.max_cps > 0.0) {
            return Err(invalid("tick.max_cps", "must be a finite number above zero"));
        }
        if !(tick.performance_interval_ms.is_finite() && tick.performance_interval_ms >= 0.0) {
            return Err(invalid(
                "tick.performance_interval_ms",
                "must be a finite number, zero or above",
            ));
        }
        if !(0.0..=1.0).contains(&tick.performance_alpha) {
            return Err(invalid("tick.performance_alpha", "must be between 0 and 1"));
        }

        let spatial = &self.spatial;
        if !(spatial.tile_size.is_finite() && spatial.tile_size > 0.0) {
            return Err(invalid("spatial.tile_size", "must be a finite number above zero"));
        }
        if spatial.chunk_tiles == 0 {
            return Err(invalid("spatial.chunk_tiles", "must be at least 1"));
        }
        if spatial.region_chunks == 0 {
            return Err(invalid("spatial.region_chunks", "must be at least 1"));
        }
        Ok(())
    }

    /// Tick loop built from these settings.
    #[must_use]
    pub fn tick_loop(&self) -> TickLoop {
        TickLoop::new(self.tick.clone())
    }

    /// Empty world built from these settings.
    #[must_use]
    pub fn world(&self) -> World {
        World::new(&self.spatial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::IndexStrategy;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tick.target_tps, 20.0);
        assert_eq!(config.tick.max_cps, 100.0);
        assert_eq!(config.tick.performance_interval_ms, 0.0);
        assert_eq!(config.tick.performance_alpha, 0.9);
        assert_eq!(config.spatial.tile_size, 100.0);
        assert_eq!(config.spatial.strategy, IndexStrategy::Curve);
        assert_eq!(config.spatial.chunk_tiles, 5);
        assert_eq!(config.spatial.region_chunks, 20);
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            [tick]
            target_tps = 60.0

            [spatial]
            strategy = "hierarchical"
            tile_size = 32.0
            "#,
        )
        .unwrap();
        assert_eq!(config.tick.target_tps, 60.0);
        assert_eq!(config.tick.max_cps, 100.0);
        assert_eq!(config.spatial.strategy, IndexStrategy::Hierarchical);
        assert_eq!(config.spatial.tile_size, 32.0);

        let tick_loop = config.tick_loop();
        assert!((tick_loop.timestep() - 1000.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = EngineConfig::from_toml_str("[tick]\ntarget_tps = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick.target_tps", .. }));

        let err = EngineConfig::from_toml_str("[tick]\nperformance_alpha = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick.performance_alpha", .. }));

        let err = EngineConfig::from_toml_str("[spatial]\nchunk_tiles = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "spatial.chunk_tiles", .. }));

        let err = EngineConfig::from_toml_str("[spatial]\ntile_size = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "spatial.tile_size", .. }));
    }

    #[test]
    fn test_malformed_document() {
        let err = EngineConfig::from_toml_str("[spatial]\nstrategy = \"quadtree\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EngineConfig::from_toml_str("[tick\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("tessera_config_that_does_not_exist.toml");
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("tessera_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[tick]\nmax_cps = 30.0\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.tick.max_cps, 30.0);
    }
}
