use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::catalog::{MetadataCatalog, find_catalog};
use crate::diagnostics::Validated;
use crate::domain::{IdType, LibraryVersion};
use crate::error::KiraError;
use crate::gene_sets::{GeneSets, GeneSetsOptions};
use crate::gmt::read_gmt;

/// One library file discovered in the database directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub name: String,
    pub id_type: IdType,
}

/// A local MSigDB release: `<name>.v<version>.<id_type>.gmt` files plus an
/// optional `msigdb_v<version>.xml` metadata catalog.
#[derive(Debug, Clone)]
pub struct MolecularSignaturesDatabase {
    path: PathBuf,
    version: LibraryVersion,
    gene_sets: Vec<LibraryEntry>,
    xml_path: Option<PathBuf>,
}

impl MolecularSignaturesDatabase {
    pub fn new(path: impl Into<PathBuf>, version: LibraryVersion) -> Result<Self, KiraError> {
        let path = path.into();
        if !path.exists() {
            return Err(KiraError::MissingDatabase(path));
        }

        let name_re = library_name_regex(&version)?;
        let suffix = ".gmt";
        let marker = format!(".v{}.", version.as_str());
        let mut file_names = fs::read_dir(&path)
            .map_err(|err| KiraError::Filesystem(format!("scan {}: {err}", path.display())))?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(suffix) && name.contains(&marker))
            .collect::<Vec<_>>();
        file_names.sort();

        let gene_sets = file_names
            .iter()
            .map(|name| parse_library_name(&name_re, name))
            .collect::<Result<Vec<_>, _>>()?;

        let xml_path = find_catalog(&path, version.as_str());
        tracing::debug!(
            root = %path.display(),
            version = %version,
            libraries = gene_sets.len(),
            catalog = xml_path.is_some(),
            "scanned MSigDB directory"
        );

        Ok(Self {
            path,
            version,
            gene_sets,
            xml_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &LibraryVersion {
        &self.version
    }

    pub fn gene_sets(&self) -> &[LibraryEntry] {
        &self.gene_sets
    }

    pub fn xml_path(&self) -> Option<&Path> {
        self.xml_path.as_deref()
    }

    pub fn library_path(&self, name: &str, id_type: IdType) -> PathBuf {
        self.path
            .join(format!("{name}.v{}.{id_type}.gmt", self.version.as_str()))
    }

    pub fn resolve(&self, name: &str, id_type: IdType) -> Result<PathBuf, KiraError> {
        let path = self.library_path(name, id_type);
        if path.exists() {
            Ok(path)
        } else {
            Err(KiraError::UnknownLibrary(path))
        }
    }

    pub fn load(&self, name: &str, id_type: IdType) -> Result<Validated<GeneSets>, KiraError> {
        self.load_with(name, id_type, GeneSetsOptions::default())
    }

    /// Like [`load`](Self::load) with explicit collection options; the
    /// collection is always named after the library.
    pub fn load_with(
        &self,
        name: &str,
        id_type: IdType,
        options: GeneSetsOptions,
    ) -> Result<Validated<GeneSets>, KiraError> {
        let path = self.resolve(name, id_type)?;
        let options = GeneSetsOptions {
            name: name.to_string(),
            ..options
        };
        let mut loaded = read_gmt(&path, options)?;
        if let Some(xml_path) = &self.xml_path {
            let catalog = MetadataCatalog::from_path(xml_path)?;
            add_metadata(&mut loaded.value, &catalog)?;
        }
        Ok(loaded)
    }
}

/// Attaches catalog attributes to every gene set; a gene set missing from
/// the catalog is an error.
pub fn add_metadata(gene_sets: &mut GeneSets, catalog: &MetadataCatalog) -> Result<(), KiraError> {
    for gene_set in gene_sets.gene_sets_mut() {
        let metadata = catalog
            .get(gene_set.name())
            .ok_or_else(|| KiraError::MissingCatalogEntry(gene_set.name().to_string()))?;
        gene_set.set_metadata(metadata.clone());
    }
    Ok(())
}

fn library_name_regex(version: &LibraryVersion) -> Result<Regex, KiraError> {
    let pattern = format!(
        r"^(?P<name>.*?)\.v{}\.(?P<id_type>entrez|symbols)\.gmt$",
        regex::escape(version.as_str())
    );
    Regex::new(&pattern).map_err(|err| KiraError::InvalidVersion(err.to_string()))
}

fn parse_library_name(name_re: &Regex, file_name: &str) -> Result<LibraryEntry, KiraError> {
    let captures = name_re
        .captures(file_name)
        .ok_or_else(|| KiraError::MalformedLibraryName(file_name.to_string()))?;
    let id_type = captures["id_type"].parse()?;
    Ok(LibraryEntry {
        name: captures["name"].to_string(),
        id_type,
    })
}
