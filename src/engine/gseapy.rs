use std::path::{Path, PathBuf};

use crate::engine::process::{locate_executable, run_cmd, tool_version};
use crate::engine::{
    EngineInfo, GeneSetsSource, GseaEngine, RunOptions, ensure_enough_samples, prepare_inputs,
    prepare_out_dir,
};
use crate::error::KiraError;
use crate::expression::ExpressionSet;
use crate::table::ResultTable;

const ENGINE: &str = "gseapy";

/// The `gseapy` command line tool (`pip3 install gseapy`), driven as a
/// subprocess.
#[derive(Debug, Clone)]
pub struct GseaPy {
    executable: PathBuf,
    program: String,
}

impl GseaPy {
    /// `path` may be an explicit executable or a bare command name looked up
    /// on `PATH`; defaults to `gseapy`.
    pub fn new(path: Option<&Path>) -> Result<Self, KiraError> {
        let candidate = path.unwrap_or(Path::new(ENGINE));
        let executable = locate_executable(candidate).ok_or_else(|| {
            KiraError::MissingTool(format!(
                "{} (install it with `pip3 install gseapy`)",
                candidate.display()
            ))
        })?;
        Ok(Self {
            executable,
            program: "gsea".to_string(),
        })
    }

    /// Sub-command to run, `gsea` unless overridden.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn command_args(
        &self,
        data: &Path,
        classes: &Path,
        gene_sets: &Path,
        out_dir: &Path,
        options: &RunOptions,
    ) -> Vec<String> {
        let mut args = vec![self.program.clone()];
        let flags = [
            ("data", data.display().to_string()),
            ("cls", classes.display().to_string()),
            ("permu-type", options.permutation_type.to_string()),
            ("permu-num", options.permutations.to_string()),
            ("threads", options.threads.to_string()),
            ("gmt", gene_sets.display().to_string()),
            ("method", options.metric.to_string()),
            ("outdir", out_dir.display().to_string()),
        ];
        for (name, value) in flags {
            args.push(format!("--{name}"));
            args.push(value);
        }
        for (name, value) in &options.extra_args {
            args.push(format!("--{}", name.trim_start_matches('-')));
            args.push(value.clone());
        }
        if options.verbose {
            args.push("--verbose".to_string());
        }
        if !options.plot {
            args.push("--no-plot".to_string());
        }
        args
    }

    pub fn report_path(out_dir: &Path, options: &RunOptions) -> PathBuf {
        out_dir.join(format!(
            "gseapy.gsea.{}.report.csv",
            options.permutation_type
        ))
    }
}

impl GseaEngine for GseaPy {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: ENGINE.to_string(),
            executable: self.executable.display().to_string(),
            version: tool_version(&self.executable, &["--version"]),
        }
    }

    fn run(
        &self,
        expression: &ExpressionSet,
        gene_sets: GeneSetsSource<'_>,
        options: &RunOptions,
    ) -> Result<ResultTable, KiraError> {
        ensure_enough_samples(expression, options.metric, self.metrics_using_variance())?;

        let inputs = prepare_inputs(expression, gene_sets, options.work_dir.as_deref())?;
        let (out_dir, _temp_out) = prepare_out_dir(options.out_dir.as_deref())?;
        let args = self.command_args(
            &inputs.data_path,
            &inputs.classes_path,
            &inputs.gene_sets_path,
            &out_dir,
            options,
        );
        run_cmd(ENGINE, &self.executable, &args, None, options.verbose)?;

        let report = Self::report_path(&out_dir, options);
        if !report.exists() {
            return Err(KiraError::EngineFailed {
                engine: ENGINE.to_string(),
                message: format!("report not found at {}", report.display()),
            });
        }
        let table = ResultTable::read_delimited(&report, ',')?;
        if table.is_empty() {
            return Err(KiraError::NoResults {
                engine: ENGINE.to_string(),
            });
        }
        tracing::info!(engine = ENGINE, pathways = table.len(), "parsed report");
        Ok(table)
    }
}
