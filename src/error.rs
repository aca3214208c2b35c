use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid identifier type: {0} (expected entrez or symbols)")]
    InvalidIdType(String),

    #[error("invalid library version: {0}")]
    InvalidVersion(String),

    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("invalid frame request: {0}")]
    InvalidFrameRequest(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("gene set names are not unique: {0}")]
    #[diagnostic(help("rename or extract the gene sets before indexing them by name"))]
    DuplicateGeneSetName(String),

    #[error("Could not find MSigDB: {0} does not exist")]
    MissingDatabase(PathBuf),

    #[error("Unknown library: {0}!")]
    UnknownLibrary(PathBuf),

    #[error("library file name does not follow <name>.v<version>.<entrez|symbols>.gmt: {0}")]
    MalformedLibraryName(String),

    #[error("failed to parse metadata catalog {path}: {message}")]
    CatalogParse { path: PathBuf, message: String },

    #[error("gene set {0} is missing from the metadata catalog")]
    MissingCatalogEntry(String),

    #[error("invalid expression set: {0}")]
    InvalidExpression(String),

    #[error("expression matrix contains missing or non-finite values: {0}")]
    MissingValues(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("Could not find GSEADesktop installation in {0}")]
    MissingInstallation(PathBuf),

    #[error("{engine} failed: {message}")]
    EngineFailed { engine: String, message: String },

    #[error("{engine} produced no results")]
    NoResults { engine: String },

    #[error("Too few samples for the metric {metric}: {detail}")]
    NotEnoughSamples { metric: String, detail: String },
}
