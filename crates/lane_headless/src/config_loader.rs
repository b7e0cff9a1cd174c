//! Config and unit catalog loading for headless runs.
//!
//! Both files are RON. Missing fields in a config fall back to the
//! defaults, so a file only needs to name what it changes.

use std::fs;
use std::path::{Path, PathBuf};

use lane_core::data::{GameConfig, UnitCatalog};
use lane_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors raised by the headless runner.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A RON file did not parse.
    #[error("Failed to load {path}: {source}")]
    Config {
        /// File involved.
        path: PathBuf,
        /// Parser error from the core.
        #[source]
        source: GameError,
    },

    /// A report could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The simulation refused a request.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The thread pool for a batch could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a [`GameConfig`] from a RON file.
pub fn load_config(path: &Path) -> Result<GameConfig> {
    let text = read(path)?;
    let config = GameConfig::from_ron_str(&text).map_err(|source| HeadlessError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), seed = config.seed, "Loaded game config");
    Ok(config)
}

/// Load a [`UnitCatalog`] from a RON file.
pub fn load_catalog(path: &Path) -> Result<UnitCatalog> {
    let text = read(path)?;
    let catalog = UnitCatalog::from_ron_str(&text).map_err(|source| HeadlessError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), units = catalog.units.len(), "Loaded unit catalog");
    Ok(catalog)
}

/// Config from `path`, or the defaults when no file is given.
pub fn config_or_default(path: Option<&Path>) -> Result<GameConfig> {
    path.map_or_else(|| Ok(GameConfig::default()), load_config)
}

/// Catalog from `path`, or the built-in roster when no file is given.
pub fn catalog_or_default(path: Option<&Path>) -> Result<UnitCatalog> {
    path.map_or_else(|| Ok(UnitCatalog::default()), load_catalog)
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| HeadlessError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(io_err)
}
