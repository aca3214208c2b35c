use std::path::{Path, PathBuf};

use crate::engine::process::{find_files, run_cmd};
use crate::engine::{
    EngineInfo, GeneSetsSource, GseaEngine, RunOptions, ensure_enough_samples, prepare_inputs,
    prepare_out_dir,
};
use crate::error::KiraError;
use crate::expression::ExpressionSet;
use crate::table::ResultTable;

const ENGINE: &str = "GSEADesktop";
const LAUNCHER: &str = "gsea-cli.sh";
const REPORT_PREFIX: &str = "gsea_report_for_";

/// The Broad GSEA desktop release, driven through its `gsea-cli.sh`
/// launcher. Gene sets are always passed to it as a file.
#[derive(Debug, Clone)]
pub struct GseaDesktop {
    home: PathBuf,
    launcher: PathBuf,
    label: String,
}

impl GseaDesktop {
    pub fn new(home: &Path) -> Result<Self, KiraError> {
        let launcher = home.join(LAUNCHER);
        if !launcher.exists() {
            return Err(KiraError::MissingInstallation(home.to_path_buf()));
        }
        Ok(Self {
            home: home.to_path_buf(),
            launcher,
            label: "kira_gsea".to_string(),
        })
    }

    /// Report label, used by the tool to name its output folder.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn command_args(
        &self,
        data: &Path,
        classes: &Path,
        phenotypes: (&str, &str),
        gene_sets: &Path,
        out_dir: &Path,
        options: &RunOptions,
    ) -> Vec<String> {
        let mut args = vec!["GSEA".to_string()];
        let flags = [
            ("res", data.display().to_string()),
            (
                "cls",
                format!(
                    "{}#{}_versus_{}",
                    classes.display(),
                    phenotypes.0,
                    phenotypes.1
                ),
            ),
            ("gmx", gene_sets.display().to_string()),
            ("collapse", "No_Collapse".to_string()),
            ("metric", options.metric.desktop_name().to_string()),
            ("nperm", options.permutations.to_string()),
            ("permute", options.permutation_type.to_string()),
            ("rpt_label", self.label.clone()),
            ("plot_top_x", if options.plot { "20" } else { "0" }.to_string()),
            ("zip_report", "false".to_string()),
            ("out", out_dir.display().to_string()),
        ];
        for (name, value) in flags {
            args.push(format!("-{name}"));
            args.push(value);
        }
        for (name, value) in &options.extra_args {
            args.push(format!("-{}", name.trim_start_matches('-')));
            args.push(value.clone());
        }
        args
    }

    /// Collects every per-phenotype report below `out_dir` into one table
    /// with an added `phenotype` column.
    pub fn collect_reports(out_dir: &Path) -> Result<ResultTable, KiraError> {
        let reports = find_files(out_dir, |name| {
            name.starts_with(REPORT_PREFIX) && (name.ends_with(".tsv") || name.ends_with(".xls"))
        });
        let mut combined: Option<ResultTable> = None;
        for report in reports {
            let phenotype = phenotype_from_report(&report);
            let table = ResultTable::read_delimited(&report, '\t')?
                .with_constant_column("phenotype", &phenotype);
            match combined.as_mut() {
                Some(existing) => existing.append(table),
                None => combined = Some(table),
            }
        }
        Ok(combined.unwrap_or_default())
    }
}

impl GseaEngine for GseaDesktop {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: ENGINE.to_string(),
            executable: self.launcher.display().to_string(),
            version: None,
        }
    }

    fn run(
        &self,
        expression: &ExpressionSet,
        gene_sets: GeneSetsSource<'_>,
        options: &RunOptions,
    ) -> Result<ResultTable, KiraError> {
        ensure_enough_samples(expression, options.metric, self.metrics_using_variance())?;
        let groups = expression.class_groups();
        let [first, second] = groups.as_slice() else {
            return Err(KiraError::InvalidExpression(format!(
                "{ENGINE} compares exactly two classes, got {}",
                groups.len()
            )));
        };

        let inputs = prepare_inputs(expression, gene_sets, options.work_dir.as_deref())?;
        let (out_dir, _temp_out) = prepare_out_dir(options.out_dir.as_deref())?;
        let args = self.command_args(
            &inputs.data_path,
            &inputs.classes_path,
            (first.as_str(), second.as_str()),
            &inputs.gene_sets_path,
            &out_dir,
            options,
        );
        run_cmd(ENGINE, &self.launcher, &args, Some(&self.home), options.verbose)?;

        let table = Self::collect_reports(&out_dir)?;
        if table.is_empty() {
            return Err(KiraError::NoResults {
                engine: ENGINE.to_string(),
            });
        }
        tracing::info!(engine = ENGINE, pathways = table.len(), "parsed reports");
        Ok(table)
    }
}

/// `gsea_report_for_<phenotype>_<timestamp>.tsv` -> `<phenotype>`.
fn phenotype_from_report(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let rest = stem.strip_prefix(REPORT_PREFIX).unwrap_or(&stem);
    match rest.rsplit_once('_') {
        Some((phenotype, stamp)) if stamp.chars().all(|ch| ch.is_ascii_digit()) => {
            phenotype.to_string()
        }
        _ => rest.to_string(),
    }
}
