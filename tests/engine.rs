use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_gsea::app::{App, EngineKind, GeneSetsInput, ProgressEvent, ProgressSink};
use kira_gsea::config::{GeneSetDefaults, ResolvedConfig};
use kira_gsea::domain::Metric;
use kira_gsea::engine::{GeneSetsSource, GseaDesktop, GseaEngine, RunOptions};
use kira_gsea::error::KiraError;
use kira_gsea::expression::ExpressionSet;

struct NopSink;

impl ProgressSink for NopSink {
    fn event(&self, _event: ProgressEvent) {}
}

fn data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn expression(classes: &[&str]) -> ExpressionSet {
    let samples = (0..classes.len()).map(|idx| format!("P{idx}")).collect();
    ExpressionSet::new(
        vec!["TP53".to_string(), "CDK1".to_string()],
        samples,
        vec![vec![1.0; classes.len()], vec![2.0; classes.len()]],
        classes.iter().map(|class| class.to_string()).collect(),
    )
    .unwrap()
}

fn desktop_home() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join("gsea-cli.sh"), "#!/bin/sh\nexit 1\n").unwrap();
    home
}

#[test]
fn desktop_requires_installation() {
    let temp = tempfile::tempdir().unwrap();
    let err = GseaDesktop::new(&temp.path().join("GSEA_4.1.0")).unwrap_err();
    assert_matches!(err, KiraError::MissingInstallation(path) if path.ends_with("GSEA_4.1.0"));
}

#[test]
fn variance_metric_rejects_small_classes() {
    let home = desktop_home();
    let engine = GseaDesktop::new(home.path()).unwrap();
    let gene_sets = data("gene_ontology_pathways.gmt");
    let result = engine.run(
        &expression(&["Control", "Control", "Cancer", "Cancer"]),
        GeneSetsSource::from(gene_sets.as_path()),
        &RunOptions::default(),
    );
    assert_matches!(
        result,
        Err(KiraError::NotEnoughSamples { metric, .. }) if metric == "signal_to_noise"
    );
}

#[test]
fn desktop_compares_exactly_two_classes() {
    let home = desktop_home();
    let engine = GseaDesktop::new(home.path()).unwrap();
    let gene_sets = data("gene_ontology_pathways.gmt");
    let options = RunOptions {
        metric: Metric::DiffOfClasses,
        ..RunOptions::default()
    };
    let result = engine.run(
        &expression(&["Control", "Breast", "Ovarian"]),
        GeneSetsSource::from(gene_sets.as_path()),
        &options,
    );
    assert_matches!(result, Err(KiraError::InvalidExpression(_)));
}

#[cfg(unix)]
#[test]
fn gseapy_report_is_parsed() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().unwrap();
    let script = temp.path().join("gseapy");
    fs::write(
        &script,
        concat!(
            "#!/bin/sh\n",
            "out=\"\"\n",
            "while [ $# -gt 0 ]; do\n",
            "  if [ \"$1\" = \"--outdir\" ]; then out=\"$2\"; fi\n",
            "  shift\n",
            "done\n",
            "[ -n \"$out\" ] || exit 0\n",
            "printf 'Term,es,nes,pval,fdr\\nGO_CELL_CYCLE,0.61,1.42,0.01,0.05\\nGO_DNA_REPAIR,-0.3,-0.8,0.6,0.7\\n'",
            " > \"$out/gseapy.gsea.phenotype.report.csv\"\n",
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let app = App::new(ResolvedConfig {
        schema_version: 1,
        msigdb_path: Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
        msigdb_version: Default::default(),
        gene_sets: GeneSetDefaults::default(),
        gseapy: Some(script),
        gsea_desktop: None,
        work_dir: Some(temp.path().join("work")),
    });
    let classes = ["Control"; 4]
        .into_iter()
        .chain(["Cancer"; 4])
        .map(str::to_string)
        .collect();
    let expression = ExpressionSet::read_tsv(&data("expression_data.tsv"), classes).unwrap();
    let engine = app.engine(EngineKind::GseaPy).unwrap();
    let options = RunOptions {
        permutations: 10,
        verbose: false,
        out_dir: Some(temp.path().join("out")),
        ..RunOptions::default()
    };

    let result = app
        .run_gsea(
            engine.as_ref(),
            &expression,
            &GeneSetsInput::File(data("gene_ontology_pathways.gmt")),
            options,
            &NopSink,
        )
        .unwrap();
    assert_eq!(result.engine.name, "gseapy");
    assert_eq!(result.metric, "signal_to_noise");
    assert_eq!(result.table.len(), 2);
    assert_eq!(
        result.table.column("Term").unwrap(),
        vec!["GO_CELL_CYCLE", "GO_DNA_REPAIR"]
    );
    assert!(temp.path().join("out/gseapy.gsea.phenotype.report.csv").exists());
}
