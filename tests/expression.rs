use std::path::{Path, PathBuf};

use assert_matches::assert_matches;

use kira_gsea::error::KiraError;
use kira_gsea::expression::ExpressionSet;

fn expression_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/expression_data.tsv")
}

fn labels(groups: &[(&str, usize)]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|(label, count)| std::iter::repeat_n(label.to_string(), *count))
        .collect()
}

#[test]
fn reads_matrix_with_classes() {
    let classes = labels(&[("Control", 4), ("Cancer", 4)]);
    let data = ExpressionSet::read_tsv(&expression_data(), classes.clone()).unwrap();
    assert_eq!(data.classes(), classes.as_slice());
    assert_eq!(data.samples().len(), 8);
    assert_eq!(data.genes().len(), 10);
    assert_eq!(data.genes()[0], "TP53");
}

#[test]
fn rejects_mismatched_class_count() {
    let classes = labels(&[("Control", 4), ("Cancer", 1)]);
    assert_matches!(
        ExpressionSet::read_tsv(&expression_data(), classes),
        Err(KiraError::InvalidExpression(message))
            if message == "Number of classes different from the number of columns"
    );
}

#[test]
fn contrast_selects_two_classes() {
    let classes = labels(&[("Control", 4), ("Breast_cancer", 2), ("Ovarian_cancer", 2)]);
    let data = ExpressionSet::read_tsv(&expression_data(), classes).unwrap();
    let subset = data.contrast("Breast_cancer", "Control").unwrap();
    assert_eq!(subset.genes(), data.genes());
    assert_eq!(subset.classes().len(), 4 + 2);
    assert_eq!(subset.class_groups(), vec!["Control", "Breast_cancer"]);
    assert_ne!(data.fingerprint(), subset.fingerprint());
}

#[test]
fn joins_cases_and_controls() {
    let genes = vec!["TP53".to_string(), "MDM2".to_string()];
    let cases = ExpressionSet::new(
        genes.clone(),
        vec!["c1".to_string()],
        vec![vec![1.0], vec![2.0]],
        vec!["x".to_string()],
    )
    .unwrap();
    let controls = ExpressionSet::new(
        genes,
        vec!["n1".to_string(), "n2".to_string()],
        vec![vec![3.0, 4.0], vec![5.0, 6.0]],
        vec!["y".to_string(), "y".to_string()],
    )
    .unwrap();
    let joined =
        ExpressionSet::from_cases_and_controls(&cases, &controls, "case", "control").unwrap();
    assert_eq!(joined.classes(), &["case", "control", "control"]);
    assert_eq!(joined.values()[1], vec![2.0, 5.0, 6.0]);
    assert_eq!(
        joined.samples_per_class().get("control").copied(),
        Some(2)
    );
}
