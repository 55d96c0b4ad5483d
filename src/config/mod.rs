//! Project configuration loaded from `svgmap.toml`.
//!
//! | Section              | Purpose                                       |
//! |----------------------|-----------------------------------------------|
//! | `[render]`           | Linkable tags, link check, namespace prefixes |
//! | `[store]`            | Where image maps are kept                     |
//! | `[entities.page]`    | Page key -> URL                               |
//! | `[entities.document]`| Document key -> URL                           |
//!
//! # Example
//!
//! ```toml
//! [render]
//! tags = ["*"]               # every element; default is the visible SVG tags
//! verify_links = true
//!
//! [render.prefixes]
//! inkscape = "http://www.inkscape.org/namespaces/inkscape"
//!
//! [store]
//! dir = ".svgmap"            # relative to this file
//!
//! [entities.page]
//! about = "/about/"
//! ```

mod error;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::map::{EntityKind, RenderSettings, StaticResolver};
use crate::svg::{SVG_NS, Serializer, VISIBLE_SVG_TAGS, Vocabulary, XLINK_NS};

/// Default config file name
pub const CONFIG_FILE: &str = "svgmap.toml";

// ============================================================================
// root configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SvgMapConfig {
    /// Directory containing the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub render: RenderConfig,
    pub store: StoreConfig,
    pub entities: EntitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Element names that may be linked; `["*"]` means any element.
    pub tags: Vec<String>,

    /// Check that every wrapped link appears in the output.
    pub verify_links: bool,

    /// Extra namespace prefixes for the serializer (prefix -> uri).
    pub prefixes: BTreeMap<String, String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tags: VISIBLE_SVG_TAGS.iter().map(|t| t.to_string()).collect(),
            verify_links: true,
            prefixes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store directory, relative to the config file.
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".svgmap"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntitiesConfig {
    pub page: BTreeMap<String, String>,
    pub document: BTreeMap<String, String>,
}

impl SvgMapConfig {
    /// Load and validate `path`. A missing file yields the defaults, rooted
    /// at the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
            Self::from_str(&content)?
        } else {
            crate::debug!("config"; "{} not found, using defaults", path.display());
            Self::default()
        };

        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Locate `name` by walking up from the current directory.
    ///
    /// Absolute paths are taken as-is. When nothing is found the path is
    /// resolved against the current directory so that defaults still get a
    /// sensible root.
    pub fn discover(name: &Path) -> PathBuf {
        if name.is_absolute() {
            return name.to_path_buf();
        }
        let Ok(cwd) = std::env::current_dir() else {
            return name.to_path_buf();
        };
        find_upward(&cwd, name).unwrap_or_else(|| cwd.join(name))
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Collect every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if self.render.tags.is_empty() {
            diag.error("render.tags", "must list at least one tag (or \"*\")");
        }
        if self.render.tags.iter().any(|t| t.trim().is_empty()) {
            diag.error("render.tags", "tag names must not be empty");
        }

        for (prefix, uri) in &self.render.prefixes {
            if prefix.is_empty() || prefix.contains(':') || prefix == "xml" || prefix.starts_with("xmlns") {
                diag.error("render.prefixes", format!("`{prefix}` is not a usable prefix"));
            }
            if uri.is_empty() || uri == SVG_NS {
                diag.error("render.prefixes", format!("`{prefix}` must bind a non-SVG namespace"));
            }
        }

        if self.store.dir.as_os_str().is_empty() {
            diag.error("store.dir", "must not be empty");
        }

        diag.into_result()
    }

    /// Join a path with the config root.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root_join(&self.store.dir)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        if self.render.tags.iter().any(|t| t == "*") {
            Vocabulary::Any
        } else {
            Vocabulary::from_tags(self.render.tags.iter().map(|t| t.trim().to_owned()))
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        let serializer = self
            .render
            .prefixes
            .iter()
            .filter(|(_, uri)| uri.as_str() != XLINK_NS)
            .fold(Serializer::new(), |s, (prefix, uri)| {
                s.with_prefix(prefix.clone(), uri.clone())
            });
        RenderSettings {
            vocabulary: self.vocabulary(),
            serializer,
            verify_links: self.render.verify_links,
        }
    }

    /// Resolver over the `[entities.*]` tables.
    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::new()
            .with_table(EntityKind::Page, &self.entities.page)
            .with_table(EntityKind::Document, &self.entities.document)
    }
}

/// Find `name` in `start` or the nearest ancestor that has it.
fn find_upward(start: &Path, name: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}
