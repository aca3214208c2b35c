//! Flat gene-set files (GMT): one gene set per tab-separated line.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::diagnostics::Validated;
use crate::error::KiraError;
use crate::gene_set::{GeneSet, GeneSetOptions};
use crate::gene_sets::{GeneSets, GeneSetsOptions};

/// Line layout used when writing a collection back to disk.
///
/// The parser always reads the second field as the description, so only
/// `Standard` output parses back into the same genes. `Compact` output
/// re-parses with the first gene taken as the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GmtLayout {
    /// `name<TAB>gene...`
    #[default]
    Compact,
    /// `name<TAB>description<TAB>gene...`, with an empty description field
    /// when the gene set has none.
    Standard,
}

pub fn parse_gmt(content: &str, options: GeneSetsOptions) -> Validated<GeneSets> {
    let mut warnings = Vec::new();
    let gene_sets = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            GeneSet::from_gmt_line(line, GeneSetOptions::quiet()).collect_into(&mut warnings)
        })
        .collect::<Vec<_>>();
    let collection = GeneSets::with_options(gene_sets, options).collect_into(&mut warnings);
    Validated::new(collection, warnings)
}

/// Reads a GMT file, transparently decompressing `.gz` input.
///
/// The collection is named after the file unless `options.name` is set, and
/// remembers `path` so engines that take a file can use it directly.
pub fn read_gmt(path: &Path, options: GeneSetsOptions) -> Result<Validated<GeneSets>, KiraError> {
    let content = read_text(path)?;
    let name = if options.name.is_empty() {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    } else {
        options.name
    };
    tracing::debug!(path = %path.display(), "parsing gene sets");
    Ok(parse_gmt(
        &content,
        GeneSetsOptions {
            name,
            path: Some(path.to_path_buf()),
            ..options
        },
    ))
}

pub fn write_gmt<W: Write>(
    gene_sets: &GeneSets,
    writer: &mut W,
    layout: GmtLayout,
) -> Result<(), KiraError> {
    for gene_set in gene_sets {
        let mut line = gene_set.name().to_string();
        if layout == GmtLayout::Standard {
            line.push('\t');
            line.push_str(gene_set.description().unwrap_or_default());
        }
        line.push('\t');
        line.push_str(&gene_set.genes().iter().cloned().collect::<Vec<_>>().join("\t"));
        writeln!(writer, "{line}").map_err(|err| KiraError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

/// Writes through a temporary file in the destination directory so readers
/// never observe a half-written library.
pub fn write_gmt_file(
    gene_sets: &GeneSets,
    dest: &Path,
    layout: GmtLayout,
) -> Result<(), KiraError> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| KiraError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("kira-gsea-gmt")
        .tempfile_in(parent)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write_gmt(gene_sets, &mut writer, layout)?;
        writer
            .flush()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    }
    temp.persist(dest)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Ok(())
}

impl GeneSets {
    pub fn from_gmt(
        path: &Path,
        options: GeneSetsOptions,
    ) -> Result<Validated<GeneSets>, KiraError> {
        read_gmt(path, options)
    }

    pub fn to_gmt(&self, dest: &Path, layout: GmtLayout) -> Result<(), KiraError> {
        write_gmt_file(self, dest, layout)
    }
}

fn read_text(path: &Path) -> Result<String, KiraError> {
    let file = File::open(path)
        .map_err(|err| KiraError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut content = String::new();
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    let result = if is_gzip {
        GzDecoder::new(file).read_to_string(&mut content)
    } else {
        let mut file = file;
        file.read_to_string(&mut content)
    };
    result.map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    Ok(content)
}
