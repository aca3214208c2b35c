use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::diagnostics::{Validated, ValidationWarning};
use crate::domain::{FrameFormat, IdType};
use crate::engine::{EngineInfo, GeneSetsSource, GseaDesktop, GseaEngine, GseaPy, RunOptions};
use crate::error::KiraError;
use crate::expression::ExpressionSet;
use crate::frame::Frame;
use crate::gene_sets::{GeneSets, GeneSetsOptions};
use crate::gmt::{GmtLayout, read_gmt};
use crate::msigdb::{LibraryEntry, MolecularSignaturesDatabase};
use crate::table::ResultTable;

/// Where a command takes its gene sets from.
#[derive(Debug, Clone)]
pub enum GeneSetsInput {
    Library { name: String, id_type: IdType },
    File(PathBuf),
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryListResult {
    pub root: String,
    pub version: String,
    pub catalog: Option<String>,
    pub libraries: Vec<LibraryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub path: Option<String>,
    pub gene_sets: usize,
    pub genes: usize,
    pub smallest: Option<usize>,
    pub largest: Option<usize>,
    pub empty_gene_sets: usize,
    pub redundant_groups: usize,
    pub output: Option<String>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub engine: EngineInfo,
    pub gene_sets: String,
    pub metric: String,
    pub permutations: u32,
    pub started_at: String,
    pub finished_at: String,
    pub out_dir: Option<String>,
    pub table: ResultTable,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameResult {
    pub frame: Frame,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    GseaPy,
    GseaDesktop,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct App {
    config: ResolvedConfig,
}

impl App {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn database(&self) -> Result<MolecularSignaturesDatabase, KiraError> {
        MolecularSignaturesDatabase::new(
            self.config.msigdb_path.as_std_path(),
            self.config.msigdb_version.clone(),
        )
    }

    pub fn libraries(&self, sink: &dyn ProgressSink) -> Result<LibraryListResult, KiraError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; scanning {}", self.config.msigdb_path),
            elapsed: None,
        });
        let database = self.database()?;
        Ok(LibraryListResult {
            root: database.path().display().to_string(),
            version: database.version().to_string(),
            catalog: database.xml_path().map(|path| path.display().to_string()),
            libraries: database.gene_sets().to_vec(),
        })
    }

    pub fn load_library(
        &self,
        name: &str,
        id_type: IdType,
        sink: &dyn ProgressSink,
    ) -> Result<Validated<GeneSets>, KiraError> {
        self.load(
            &GeneSetsInput::Library {
                name: name.to_string(),
                id_type,
            },
            sink,
        )
    }

    /// Loads gene sets and applies the configured collapse and size bounds.
    pub fn load(
        &self,
        input: &GeneSetsInput,
        sink: &dyn ProgressSink,
    ) -> Result<Validated<GeneSets>, KiraError> {
        let started = Instant::now();
        let defaults = &self.config.gene_sets;
        let options = GeneSetsOptions {
            allow_redundant: defaults.allow_redundant
                || defaults.collapse_separator.is_some(),
            remove_empty: defaults.remove_empty,
            collapse_limit: defaults.collapse_limit,
            ..GeneSetsOptions::default()
        };

        let mut warnings = Vec::new();
        let mut gene_sets = match input {
            GeneSetsInput::Library { name, id_type } => {
                sink.event(ProgressEvent {
                    message: format!("phase=Load; library {name} ({id_type})"),
                    elapsed: None,
                });
                self.database()?
                    .load_with(name, *id_type, options)?
                    .collect_into(&mut warnings)
            }
            GeneSetsInput::File(path) => {
                sink.event(ProgressEvent {
                    message: format!("phase=Load; {}", path.display()),
                    elapsed: None,
                });
                read_gmt(path, options)?.collect_into(&mut warnings)
            }
        };

        if let Some(separator) = defaults.collapse_separator.as_deref() {
            gene_sets = gene_sets
                .collapse_redundant(separator)
                .collect_into(&mut warnings);
        }
        if defaults.min_genes.is_some() || defaults.max_genes.is_some() {
            let min = defaults.min_genes.unwrap_or(0);
            let max = defaults.max_genes.unwrap_or(usize::MAX);
            gene_sets = gene_sets.trim(min..=max).collect_into(&mut warnings);
        }

        sink.event(ProgressEvent {
            message: format!("phase=Load; {} gene sets", gene_sets.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(Validated::new(gene_sets, warnings))
    }

    pub fn inspect(
        &self,
        input: &GeneSetsInput,
        sink: &dyn ProgressSink,
    ) -> Result<CollectionSummary, KiraError> {
        let loaded = self.load(input, sink)?;
        Ok(summarize(&loaded.value, loaded.warnings, None))
    }

    pub fn trim(
        &self,
        input: &GeneSetsInput,
        min_genes: usize,
        max_genes: usize,
        dest: Option<&Path>,
        sink: &dyn ProgressSink,
    ) -> Result<CollectionSummary, KiraError> {
        let mut warnings = Vec::new();
        let gene_sets = self.load(input, sink)?.collect_into(&mut warnings);
        let trimmed = gene_sets
            .trim(min_genes..=max_genes)
            .collect_into(&mut warnings);
        self.finish(trimmed, warnings, dest, sink)
    }

    pub fn subset(
        &self,
        input: &GeneSetsInput,
        genes: &BTreeSet<String>,
        min_representation: f64,
        dest: Option<&Path>,
        sink: &dyn ProgressSink,
    ) -> Result<CollectionSummary, KiraError> {
        let mut warnings = Vec::new();
        let gene_sets = self.load(input, sink)?.collect_into(&mut warnings);
        let subset = gene_sets
            .subset(genes, min_representation)
            .collect_into(&mut warnings);
        self.finish(subset, warnings, dest, sink)
    }

    pub fn collapse(
        &self,
        input: &GeneSetsInput,
        separator: &str,
        dest: Option<&Path>,
        sink: &dyn ProgressSink,
    ) -> Result<CollectionSummary, KiraError> {
        let mut warnings = Vec::new();
        let gene_sets = self.load(input, sink)?.collect_into(&mut warnings);
        let collapsed = gene_sets
            .collapse_redundant(separator)
            .collect_into(&mut warnings);
        self.finish(collapsed, warnings, dest, sink)
    }

    pub fn frame(
        &self,
        input: &GeneSetsInput,
        format: FrameFormat,
        include_metadata: bool,
        sink: &dyn ProgressSink,
    ) -> Result<FrameResult, KiraError> {
        let loaded = self.load(input, sink)?;
        Ok(FrameResult {
            frame: loaded.value.to_frame(format, include_metadata)?,
            warnings: loaded.warnings,
        })
    }

    /// Writes `gene_sets` to `dest` in the standard layout.
    pub fn export(
        &self,
        gene_sets: &GeneSets,
        dest: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<(), KiraError> {
        sink.event(ProgressEvent {
            message: format!("phase=Write; {}", dest.display()),
            elapsed: None,
        });
        gene_sets.to_gmt(dest, GmtLayout::Standard)
    }

    /// Builds the engine named by `kind` from the configured locations.
    pub fn engine(&self, kind: EngineKind) -> Result<Box<dyn GseaEngine>, KiraError> {
        match kind {
            EngineKind::GseaPy => Ok(Box::new(GseaPy::new(self.config.gseapy.as_deref())?)),
            EngineKind::GseaDesktop => {
                let home = self.config.gsea_desktop.as_deref().ok_or_else(|| {
                    KiraError::MissingTool(
                        "GSEADesktop (set engines.gsea_desktop in kira-gsea.json)".to_string(),
                    )
                })?;
                Ok(Box::new(GseaDesktop::new(home)?))
            }
        }
    }

    pub fn run_gsea(
        &self,
        engine: &dyn GseaEngine,
        expression: &ExpressionSet,
        input: &GeneSetsInput,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, KiraError> {
        let mut warnings = Vec::new();
        let gene_sets = self.load(input, sink)?.collect_into(&mut warnings);
        let options = RunOptions {
            work_dir: options.work_dir.or_else(|| self.config.work_dir.clone()),
            ..options
        };

        let started = Instant::now();
        let started_at = iso_timestamp();
        sink.event(ProgressEvent {
            message: format!(
                "phase=Run; {} on {} gene sets, {} samples",
                engine.name(),
                gene_sets.len(),
                expression.samples().len()
            ),
            elapsed: None,
        });
        let table = engine.run(expression, GeneSetsSource::from(&gene_sets), &options)?;
        sink.event(ProgressEvent {
            message: format!("phase=Run; {} rows", table.len()),
            elapsed: Some(started.elapsed()),
        });

        Ok(RunResult {
            engine: engine.info(),
            gene_sets: gene_sets.name().to_string(),
            metric: options.metric.to_string(),
            permutations: options.permutations,
            started_at,
            finished_at: iso_timestamp(),
            out_dir: options
                .out_dir
                .as_ref()
                .map(|path| path.display().to_string()),
            table,
            warnings,
        })
    }

    fn finish(
        &self,
        gene_sets: GeneSets,
        warnings: Vec<ValidationWarning>,
        dest: Option<&Path>,
        sink: &dyn ProgressSink,
    ) -> Result<CollectionSummary, KiraError> {
        if let Some(dest) = dest {
            self.export(&gene_sets, dest, sink)?;
        }
        Ok(summarize(&gene_sets, warnings, dest))
    }
}

pub fn summarize(
    gene_sets: &GeneSets,
    warnings: Vec<ValidationWarning>,
    output: Option<&Path>,
) -> CollectionSummary {
    let sizes = gene_sets.iter().map(|gene_set| gene_set.len());
    CollectionSummary {
        name: gene_sets.name().to_string(),
        path: gene_sets.path().map(|path| path.display().to_string()),
        gene_sets: gene_sets.len(),
        genes: gene_sets.all_genes().len(),
        smallest: sizes.clone().min(),
        largest: sizes.max(),
        empty_gene_sets: gene_sets.empty_gene_sets().len(),
        redundant_groups: gene_sets.redundant().len(),
        output: output.map(|path| path.display().to_string()),
        warnings,
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::config::GeneSetDefaults;

    struct NopSink;

    impl ProgressSink for NopSink {
        fn event(&self, _event: ProgressEvent) {}
    }

    fn app(root: &Path, gene_sets: GeneSetDefaults) -> App {
        App::new(ResolvedConfig {
            schema_version: 1,
            msigdb_path: Utf8PathBuf::from_path_buf(root.to_path_buf()).unwrap(),
            msigdb_version: "7.1".parse().unwrap(),
            gene_sets,
            gseapy: None,
            gsea_desktop: None,
            work_dir: None,
        })
    }

    #[test]
    fn configured_collapse_applies_on_load() {
        let temp = tempfile::tempdir().unwrap();
        let gmt = temp.path().join("pathways.gmt");
        fs::write(&gmt, "A\t\tx\ty\nB\t\tx\ty\nC\t\tz\n").unwrap();
        let app = app(
            temp.path(),
            GeneSetDefaults {
                collapse_separator: Some(" | ".to_string()),
                ..GeneSetDefaults::default()
            },
        );

        let loaded = app.load(&GeneSetsInput::File(gmt), &NopSink).unwrap();
        assert_eq!(loaded.value.len(), 2);
        assert!(loaded.value.gene_sets_by_name().unwrap().contains_key("A | B"));
        assert!(loaded.value.path().is_none());
    }

    #[test]
    fn trim_writes_output() {
        let temp = tempfile::tempdir().unwrap();
        let gmt = temp.path().join("pathways.gmt");
        fs::write(&gmt, "A\tdesc\tx\ty\tz\nB\t\tx\n").unwrap();
        let dest = temp.path().join("trimmed.gmt");
        let app = app(temp.path(), GeneSetDefaults::default());

        let summary = app
            .trim(&GeneSetsInput::File(gmt), 2, 10, Some(&dest), &NopSink)
            .unwrap();
        assert_eq!(summary.gene_sets, 1);
        assert_eq!(summary.smallest, Some(3));
        assert_eq!(fs::read_to_string(dest).unwrap(), "A\tdesc\tx\ty\tz\n");
    }

    #[test]
    fn frame_keeps_load_warnings() {
        let temp = tempfile::tempdir().unwrap();
        let gmt = temp.path().join("pathways.gmt");
        fs::write(&gmt, "A\t\tx\nB\t\tx\nC\t\n").unwrap();
        let app = app(temp.path(), GeneSetDefaults::default());

        let result = app
            .frame(&GeneSetsInput::File(gmt), FrameFormat::Long, false, &NopSink)
            .unwrap();
        assert_eq!(result.frame.len(), 2);
        assert!(result.warnings.iter().any(|warning| matches!(
            warning,
            ValidationWarning::RedundantGeneSets { .. }
        )));
        assert!(
            result
                .warnings
                .contains(&ValidationWarning::EmptyGeneSetsRemoved { count: 1 })
        );
    }

    #[test]
    fn desktop_engine_needs_configured_home() {
        let temp = tempfile::tempdir().unwrap();
        let app = app(temp.path(), GeneSetDefaults::default());
        let err = app.engine(EngineKind::GseaDesktop).err().unwrap();
        assert_matches!(err, KiraError::MissingTool(_));
    }
}
