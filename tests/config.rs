use std::fs;

use assert_matches::assert_matches;

use kira_gsea::config::{Config, ConfigLoader};
use kira_gsea::error::KiraError;

#[test]
fn parse_full_config() {
    let config: Config = serde_json::from_str(
        r#"{
            "schema_version": 1,
            "msigdb": {"path": "/data/msigdb", "version": "v7.1"},
            "gene_sets": {"allow_redundant": true, "collapse_separator": " | ", "min_genes": 15, "max_genes": 500},
            "engines": {"gseapy": "/opt/bin/gseapy", "gsea_desktop": "/opt/GSEA_4.1.0"},
            "work_dir": "/tmp/kira-gsea"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.msigdb_path.as_str(), "/data/msigdb");
    assert_eq!(resolved.msigdb_version.as_str(), "7.1");
    assert!(resolved.gene_sets.allow_redundant);
    assert!(resolved.gene_sets.remove_empty);
    assert_eq!(resolved.gene_sets.collapse_separator.as_deref(), Some(" | "));
    assert_eq!(resolved.gene_sets.collapse_limit, 10);
    assert_eq!(resolved.gene_sets.min_genes, Some(15));
    assert_eq!(
        resolved.gsea_desktop.as_deref(),
        Some(std::path::Path::new("/opt/GSEA_4.1.0"))
    );
}

#[test]
fn invalid_version_is_rejected() {
    let config: Config =
        serde_json::from_str(r#"{"msigdb": {"path": "/x", "version": "7..1"}}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(KiraError::InvalidVersion(_))
    );
}

#[test]
fn explicit_missing_file_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(Some(path.to_str().unwrap())),
        Err(KiraError::ConfigRead(_))
    );
}

#[test]
fn malformed_file_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-gsea.json");
    fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(Some(path.to_str().unwrap())),
        Err(KiraError::ConfigParse(_))
    );
}
