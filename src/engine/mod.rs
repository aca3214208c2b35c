//! Adapters for external GSEA engines.
//!
//! Engines never compute statistics here: they serialize the expression data
//! and gene sets, run the external tool to completion and parse its report
//! into a [`ResultTable`].

mod desktop;
mod gseapy;
pub mod process;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::{NamedTempFile, TempDir};

pub use desktop::GseaDesktop;
pub use gseapy::GseaPy;

use crate::domain::{Metric, PermutationType};
use crate::error::KiraError;
use crate::expression::ExpressionSet;
use crate::gene_sets::GeneSets;
use crate::gmt::{GmtLayout, write_gmt};
use crate::table::ResultTable;

/// Fewest samples per class a variance-based metric can work with.
pub const MIN_SAMPLES_PER_CLASS: usize = 3;

pub const VARIANCE_METRICS: &[Metric] = &[Metric::SignalToNoise, Metric::TTest];

pub trait GseaEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn metrics_using_variance(&self) -> &'static [Metric] {
        VARIANCE_METRICS
    }

    fn info(&self) -> EngineInfo;

    /// Runs the engine on `expression` against `gene_sets`.
    ///
    /// Fails with [`KiraError::NotEnoughSamples`] before starting the tool
    /// when the metric needs more samples per class, and with
    /// [`KiraError::NoResults`] when the tool reports nothing.
    fn run(
        &self,
        expression: &ExpressionSet,
        gene_sets: GeneSetsSource<'_>,
        options: &RunOptions,
    ) -> Result<ResultTable, KiraError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: String,
    pub executable: String,
    pub version: Option<String>,
}

/// Gene sets handed to an engine: either in memory or already on disk.
#[derive(Debug, Clone, Copy)]
pub enum GeneSetsSource<'a> {
    Collection(&'a GeneSets),
    Path(&'a Path),
}

impl<'a> From<&'a GeneSets> for GeneSetsSource<'a> {
    fn from(gene_sets: &'a GeneSets) -> Self {
        GeneSetsSource::Collection(gene_sets)
    }
}

impl<'a> From<&'a Path> for GeneSetsSource<'a> {
    fn from(path: &'a Path) -> Self {
        GeneSetsSource::Path(path)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub metric: Metric,
    pub permutations: u32,
    pub permutation_type: PermutationType,
    pub threads: usize,
    pub plot: bool,
    pub verbose: bool,
    /// Kept after the run; a temporary directory is used when unset.
    pub out_dir: Option<PathBuf>,
    /// Where serialized inputs are staged; the system temp dir when unset.
    pub work_dir: Option<PathBuf>,
    /// Passed through to the engine as `<flag> <value>` pairs.
    pub extra_args: Vec<(String, String)>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            metric: Metric::SignalToNoise,
            permutations: 1000,
            permutation_type: PermutationType::Phenotype,
            threads: 8,
            plot: false,
            verbose: true,
            out_dir: None,
            work_dir: None,
            extra_args: Vec::new(),
        }
    }
}

pub fn ensure_enough_samples(
    expression: &ExpressionSet,
    metric: Metric,
    metrics_using_variance: &[Metric],
) -> Result<(), KiraError> {
    if !metrics_using_variance.contains(&metric) {
        return Ok(());
    }
    let short = expression
        .samples_per_class()
        .into_iter()
        .filter(|(_, count)| *count < MIN_SAMPLES_PER_CLASS)
        .map(|(class, count)| format!("{class} has {count}"))
        .collect::<Vec<_>>();
    if short.is_empty() {
        return Ok(());
    }
    let detail = format!(
        "{} (at least {MIN_SAMPLES_PER_CLASS} samples per class required)",
        short.join(", ")
    );
    tracing::warn!(metric = %metric, "{detail}");
    Err(KiraError::NotEnoughSamples {
        metric: metric.to_string(),
        detail,
    })
}

/// Expression data and gene sets staged as files for one run. Temporary
/// files are removed when this value is dropped.
pub struct PreparedInputs {
    pub data_path: PathBuf,
    pub classes_path: PathBuf,
    pub gene_sets_path: PathBuf,
    _staged: Vec<NamedTempFile>,
}

pub fn prepare_inputs(
    expression: &ExpressionSet,
    gene_sets: GeneSetsSource<'_>,
    work_dir: Option<&Path>,
) -> Result<PreparedInputs, KiraError> {
    let dir = match work_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::temp_dir(),
    };
    fs::create_dir_all(&dir).map_err(|err| KiraError::Filesystem(err.to_string()))?;

    let mut staged = Vec::new();
    let classes = stage_file(&dir, ".cls", |writer| expression.to_cls(writer))?;
    let data = stage_file(&dir, ".gct", |writer| expression.to_gct(writer))?;
    let classes_path = classes.path().to_path_buf();
    let data_path = data.path().to_path_buf();
    staged.push(classes);
    staged.push(data);

    let gene_sets_path = match gene_sets {
        GeneSetsSource::Path(path) => path.to_path_buf(),
        GeneSetsSource::Collection(collection) => match collection.path() {
            Some(path) => path.to_path_buf(),
            None => {
                // engines need the description column, so the compact layout is not used here
                let file = stage_file(&dir, ".gmt", |writer| {
                    write_gmt(collection, writer, GmtLayout::Standard)
                })?;
                let path = file.path().to_path_buf();
                staged.push(file);
                path
            }
        },
    };

    Ok(PreparedInputs {
        data_path,
        classes_path,
        gene_sets_path,
        _staged: staged,
    })
}

/// Output directory for a run; the returned guard keeps a temporary one alive.
pub fn prepare_out_dir(out_dir: Option<&Path>) -> Result<(PathBuf, Option<TempDir>), KiraError> {
    match out_dir {
        Some(dir) => {
            let dir = if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?
                    .join(dir)
            };
            fs::create_dir_all(&dir).map_err(|err| KiraError::Filesystem(err.to_string()))?;
            Ok((dir, None))
        }
        None => {
            let temp = tempfile::Builder::new()
                .prefix("kira-gsea-out")
                .tempdir()
                .map_err(|err| KiraError::Filesystem(err.to_string()))?;
            Ok((temp.path().to_path_buf(), Some(temp)))
        }
    }
}

fn stage_file<F>(dir: &Path, suffix: &str, write: F) -> Result<NamedTempFile, KiraError>
where
    F: FnOnce(&mut BufWriter<&std::fs::File>) -> Result<(), KiraError>,
{
    let file = tempfile::Builder::new()
        .prefix("kira-gsea")
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    {
        let mut writer = BufWriter::new(file.as_file());
        write(&mut writer)?;
        writer
            .flush()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::gene_set::{GeneSet, GeneSetOptions};

    fn expression(classes: &[&str]) -> ExpressionSet {
        let samples = (0..classes.len()).map(|idx| format!("s{idx}")).collect();
        ExpressionSet::new(
            vec!["TP53".to_string()],
            samples,
            vec![vec![1.0; classes.len()]],
            classes.iter().map(|class| class.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn variance_metric_needs_three_per_class() {
        let small = expression(&["A", "A", "B", "B", "B"]);
        assert_matches!(
            ensure_enough_samples(&small, Metric::SignalToNoise, VARIANCE_METRICS),
            Err(KiraError::NotEnoughSamples { .. })
        );
        assert!(ensure_enough_samples(&small, Metric::DiffOfClasses, VARIANCE_METRICS).is_ok());

        let enough = expression(&["A", "A", "A", "B", "B", "B"]);
        assert!(ensure_enough_samples(&enough, Metric::TTest, VARIANCE_METRICS).is_ok());
    }

    #[test]
    fn in_memory_collection_is_staged_with_descriptions() {
        let temp = tempfile::tempdir().unwrap();
        let gene_sets = GeneSets::new([GeneSet::with_options(
            "A",
            ["x", "y"],
            GeneSetOptions::quiet().with_description("about A"),
        )
        .into_inner()])
        .into_inner();
        let prepared = prepare_inputs(
            &expression(&["A", "B"]),
            GeneSetsSource::from(&gene_sets),
            Some(temp.path()),
        )
        .unwrap();
        let staged = fs::read_to_string(&prepared.gene_sets_path).unwrap();
        assert_eq!(staged, "A\tabout A\tx\ty\n");
        assert!(prepared.classes_path.to_string_lossy().ends_with(".cls"));

        let data_path = prepared.data_path.clone();
        drop(prepared);
        assert!(!data_path.exists());
    }

    #[test]
    fn collapsed_collection_is_staged_instead_of_origin() {
        let temp = tempfile::tempdir().unwrap();
        let gmt = temp.path().join("lib.gmt");
        fs::write(&gmt, "A\t\tx\ty\nB\t\tx\ty\nC\t\tz\n").unwrap();
        let options = crate::gene_sets::GeneSetsOptions {
            collapse_redundant: Some("|".to_string()),
            ..Default::default()
        };
        let gene_sets = GeneSets::from_gmt(&gmt, options).unwrap().into_inner();
        assert_eq!(gene_sets.len(), 2);

        let prepared =
            prepare_inputs(&expression(&["A"]), (&gene_sets).into(), Some(temp.path())).unwrap();
        assert_ne!(prepared.gene_sets_path, gmt);
        let staged = fs::read_to_string(&prepared.gene_sets_path).unwrap();
        assert_eq!(staged.lines().count(), 2);
        assert!(staged.starts_with("A|B\tA|B\tx\ty\n"));
    }

    #[test]
    fn collection_with_origin_is_passed_by_path() {
        let temp = tempfile::tempdir().unwrap();
        let gmt = temp.path().join("lib.gmt");
        fs::write(&gmt, "A\t\tx\n").unwrap();
        let gene_sets = GeneSets::from_gmt(&gmt, Default::default()).unwrap().into_inner();
        let prepared =
            prepare_inputs(&expression(&["A"]), (&gene_sets).into(), Some(temp.path())).unwrap();
        assert_eq!(prepared.gene_sets_path, gmt);
    }
}
