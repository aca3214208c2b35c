use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::LibraryVersion;
use crate::error::KiraError;
use crate::gene_sets::DEFAULT_COLLAPSE_LIMIT;

pub const DEFAULT_CONFIG_FILE: &str = "kira-gsea.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub msigdb: MsigdbEntry,
    #[serde(default)]
    pub gene_sets: GeneSetsEntry,
    #[serde(default)]
    pub engines: EnginesEntry,
    #[serde(default)]
    pub work_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MsigdbEntry {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneSetsEntry {
    #[serde(default)]
    pub allow_redundant: Option<bool>,
    #[serde(default)]
    pub remove_empty: Option<bool>,
    #[serde(default)]
    pub collapse_separator: Option<String>,
    #[serde(default)]
    pub collapse_limit: Option<usize>,
    #[serde(default)]
    pub min_genes: Option<usize>,
    #[serde(default)]
    pub max_genes: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EnginesEntry {
    #[serde(default)]
    pub gseapy: Option<String>,
    #[serde(default)]
    pub gsea_desktop: Option<String>,
}

/// Collection-level defaults applied when loading libraries.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneSetDefaults {
    pub allow_redundant: bool,
    pub remove_empty: bool,
    /// Collapse redundant sets on load, joining names with this separator.
    pub collapse_separator: Option<String>,
    pub collapse_limit: usize,
    pub min_genes: Option<usize>,
    pub max_genes: Option<usize>,
}

impl Default for GeneSetDefaults {
    fn default() -> Self {
        Self {
            allow_redundant: false,
            remove_empty: true,
            collapse_separator: None,
            collapse_limit: DEFAULT_COLLAPSE_LIMIT,
            min_genes: None,
            max_genes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub msigdb_path: Utf8PathBuf,
    pub msigdb_version: LibraryVersion,
    pub gene_sets: GeneSetDefaults,
    pub gseapy: Option<PathBuf>,
    pub gsea_desktop: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `kira-gsea.json` in the working directory. A missing
    /// default file resolves to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let msigdb_path = match config.msigdb.path {
            Some(path) => Utf8PathBuf::from(path),
            None => default_msigdb_root()?,
        };
        let msigdb_version = match config.msigdb.version {
            Some(version) => version.parse()?,
            None => LibraryVersion::default(),
        };

        let entry = config.gene_sets;
        if let (Some(min), Some(max)) = (entry.min_genes, entry.max_genes) {
            if min > max {
                return Err(KiraError::ConfigParse(format!(
                    "gene_sets.min_genes ({min}) exceeds gene_sets.max_genes ({max})"
                )));
            }
        }
        let defaults = GeneSetDefaults::default();
        let gene_sets = GeneSetDefaults {
            allow_redundant: entry.allow_redundant.unwrap_or(defaults.allow_redundant),
            remove_empty: entry.remove_empty.unwrap_or(defaults.remove_empty),
            collapse_separator: entry.collapse_separator,
            collapse_limit: entry.collapse_limit.unwrap_or(defaults.collapse_limit),
            min_genes: entry.min_genes,
            max_genes: entry.max_genes,
        };

        Ok(ResolvedConfig {
            schema_version,
            msigdb_path,
            msigdb_version,
            gene_sets,
            gseapy: config.engines.gseapy.map(PathBuf::from),
            gsea_desktop: config.engines.gsea_desktop.map(PathBuf::from),
            work_dir: config.work_dir.map(PathBuf::from),
        })
    }
}

/// `~/.cache/kira-gsea/msigdb`
pub fn default_msigdb_root() -> Result<Utf8PathBuf, KiraError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("kira-gsea")).ok()
        })
        .map(|root| root.join("msigdb"))
        .ok_or_else(|| KiraError::Filesystem("unable to resolve cache directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config {
            msigdb: MsigdbEntry {
                path: Some("/data/msigdb".to_string()),
                version: None,
            },
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.msigdb_path, Utf8PathBuf::from("/data/msigdb"));
        assert_eq!(resolved.msigdb_version.as_str(), "7.4");
        assert_eq!(resolved.gene_sets, GeneSetDefaults::default());
        assert!(resolved.gseapy.is_none());
    }

    #[test]
    fn inverted_size_bounds_are_rejected() {
        let config: Config = serde_json::from_str(
            r#"{"msigdb": {"path": "/x"}, "gene_sets": {"min_genes": 50, "max_genes": 5}}"#,
        )
        .unwrap();
        assert!(matches!(
            ConfigLoader::resolve_config(config),
            Err(KiraError::ConfigParse(_))
        ));
    }
}
