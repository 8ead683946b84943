//! Configuration for postgen.
//!
//! Loads config from:
//! 1. Global: ~/.config/postgen/config.toml (or $XDG_CONFIG_HOME/postgen)
//! 2. Per-project: .postgen/config.toml (overrides global)
//!
//! `--config <file>` replaces both. Command-line flags override any file.
//!
//! Example config.toml:
//! ```toml
//! [output]
//! emitter = "rust"
//! dir = "generated"
//! on_existing = "version"
//! collisions = "suffix"
//!
//! [render]
//! package = "shop"
//! templates = "templates/postgen"
//! resolve_variables = true
//! ```

use postgen_codegen::{CollisionPolicy, ExistingDirPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config error: {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Where and how artifacts are written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Built-in emitter name.
    pub emitter: Option<String>,
    /// Directory the collection directory is created in.
    pub dir: Option<PathBuf>,
    pub on_existing: Option<ExistingDirPolicy>,
    pub collisions: Option<CollisionPolicy>,
}

/// What goes into the rendered code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub package: Option<String>,
    /// Directory with template overrides.
    pub templates: Option<PathBuf>,
    pub target_code: Option<String>,
    pub resolve_variables: Option<bool>,
}

/// Root configuration structure. Unset fields fall through to the next
/// layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostgenConfig {
    pub output: OutputConfig,
    pub render: RenderConfig,
}

impl PostgenConfig {
    /// Load the global config, then merge the project config under `root`.
    /// Missing files are skipped.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::load_file(&global_path)? {
                tracing::debug!(path = %global_path.display(), "loaded global config");
                config = config.merge(global);
            }
        }

        let project_path = root.join(".postgen").join("config.toml");
        if let Some(project) = Self::load_file(&project_path)? {
            tracing::debug!(path = %project_path.display(), "loaded project config");
            config = config.merge(project);
        }

        Ok(config)
    }

    /// Load exactly one file, which must exist.
    pub fn load_explicit(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("postgen").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }
        Self::load_explicit(path).map(Some)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge another config into this one. Fields set in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            output: OutputConfig {
                emitter: other.output.emitter.or(self.output.emitter),
                dir: other.output.dir.or(self.output.dir),
                on_existing: other.output.on_existing.or(self.output.on_existing),
                collisions: other.output.collisions.or(self.output.collisions),
            },
            render: RenderConfig {
                package: other.render.package.or(self.render.package),
                templates: other.render.templates.or(self.render.templates),
                target_code: other.render.target_code.or(self.render.target_code),
                resolve_variables: other.render.resolve_variables.or(self.render.resolve_variables),
            },
        }
    }
}
