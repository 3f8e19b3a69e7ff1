use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::schema::DatabaseDeclaration;

/// Default relation expansion depth for `get` / `list` / write results
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Runtime knobs for a `RecordMapper`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperOptions {
    /// How many relation hops expansion follows from a root record
    pub max_depth: usize,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// `quickorm.toml` contents; CLI flags override each entry
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuickormConfig {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub max_depth: Option<usize>,
}

impl QuickormConfig {
    pub fn mapper_options(&self) -> MapperOptions {
        MapperOptions {
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("quickorm.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("quickorm.db")
}

pub fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<QuickormConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: QuickormConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &QuickormConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Load a database declaration; `.json` files are JSON, anything else TOML
pub fn load_declaration(path: &Path) -> anyhow::Result<DatabaseDeclaration> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read schema {}: {}", path.display(), e))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let declaration = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };
    Ok(declaration)
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
