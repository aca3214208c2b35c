use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::KiraError;

/// Expression matrix (genes x samples) with one class label per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSet {
    genes: Vec<String>,
    samples: Vec<String>,
    values: Vec<Vec<f64>>,
    classes: Vec<String>,
}

impl ExpressionSet {
    pub fn new(
        genes: Vec<String>,
        samples: Vec<String>,
        values: Vec<Vec<f64>>,
        classes: Vec<String>,
    ) -> Result<Self, KiraError> {
        if samples.len() != classes.len() {
            return Err(KiraError::InvalidExpression(
                "Number of classes different from the number of columns".to_string(),
            ));
        }
        if genes.len() != values.len() {
            return Err(KiraError::InvalidExpression(format!(
                "{} genes but {} rows of values",
                genes.len(),
                values.len()
            )));
        }
        if let Some((gene, row)) = genes
            .iter()
            .zip(&values)
            .find(|(_, row)| row.len() != samples.len())
        {
            return Err(KiraError::InvalidExpression(format!(
                "row {gene} has {} values for {} samples",
                row.len(),
                samples.len()
            )));
        }
        Ok(Self {
            genes,
            samples,
            values,
            classes,
        })
    }

    /// Joins two matrices sharing the same gene index, cases first.
    pub fn from_cases_and_controls(
        cases: &ExpressionSet,
        controls: &ExpressionSet,
        case_name: &str,
        control_name: &str,
    ) -> Result<Self, KiraError> {
        if cases.genes != controls.genes {
            return Err(KiraError::InvalidExpression(
                "cases and controls must share the same gene index".to_string(),
            ));
        }
        let samples = cases
            .samples
            .iter()
            .chain(&controls.samples)
            .cloned()
            .collect();
        let values = cases
            .values
            .iter()
            .zip(&controls.values)
            .map(|(case_row, control_row)| {
                case_row.iter().chain(control_row).copied().collect()
            })
            .collect();
        let classes = std::iter::repeat_n(case_name.to_string(), cases.samples.len())
            .chain(std::iter::repeat_n(
                control_name.to_string(),
                controls.samples.len(),
            ))
            .collect();
        Self::new(cases.genes.clone(), samples, values, classes)
    }

    /// Reads a tab-separated matrix: the header names the samples, the first
    /// column of every row holds the gene identifier.
    pub fn read_tsv(path: &Path, classes: Vec<String>) -> Result<Self, KiraError> {
        let content = fs::read_to_string(path)
            .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| KiraError::InvalidExpression(format!("{} is empty", path.display())))?;
        let samples = header
            .split('\t')
            .skip(1)
            .map(|sample| sample.trim().to_string())
            .collect::<Vec<_>>();

        let mut genes = Vec::new();
        let mut values = Vec::new();
        for (idx, line) in lines.enumerate() {
            let mut fields = line.split('\t');
            let gene = fields.next().unwrap_or_default().trim().to_string();
            let row = fields
                .map(|field| parse_value(field.trim()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    KiraError::InvalidExpression(format!(
                        "{}:{} non-numeric expression value",
                        path.display(),
                        idx + 2
                    ))
                })?;
            genes.push(gene);
            values.push(row);
        }
        Self::new(genes, samples, values, classes)
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Keeps only the samples labelled `case` or `control`.
    pub fn contrast(&self, case: &str, control: &str) -> Result<Self, KiraError> {
        for label in [case, control] {
            if !self.classes.iter().any(|class| class == label) {
                return Err(KiraError::InvalidExpression(format!(
                    "class {label} not present in expression set"
                )));
            }
        }
        let keep = self
            .classes
            .iter()
            .map(|class| class == case || class == control)
            .collect::<Vec<_>>();
        let pick = |items: &[String]| {
            items
                .iter()
                .zip(&keep)
                .filter(|(_, kept)| **kept)
                .map(|(item, _)| item.clone())
                .collect::<Vec<_>>()
        };
        let values = self
            .values
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&keep)
                    .filter(|(_, kept)| **kept)
                    .map(|(value, _)| *value)
                    .collect()
            })
            .collect();
        Self::new(
            self.genes.clone(),
            pick(&self.samples),
            values,
            pick(&self.classes),
        )
    }

    /// Class labels with spaces replaced, as the CLS format requires.
    pub fn safe_classes(&self) -> Vec<String> {
        self.classes
            .iter()
            .map(|class| class.replace(' ', "_"))
            .collect()
    }

    /// Distinct safe class labels in first-seen order.
    pub fn class_groups(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.safe_classes()
            .into_iter()
            .filter(|class| seen.insert(class.clone()))
            .collect()
    }

    pub fn samples_per_class(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for class in self.safe_classes() {
            *counts.entry(class).or_insert(0) += 1;
        }
        counts
    }

    /// Gene ids, sample ids and the sum of all values; cheap identity for
    /// caching engine runs.
    pub fn fingerprint(&self) -> (Vec<String>, Vec<String>, f64) {
        let total = self.values.iter().flatten().sum();
        (self.genes.clone(), self.samples.clone(), total)
    }

    pub fn to_cls<W: Write>(&self, writer: &mut W) -> Result<(), KiraError> {
        let classes = self.safe_classes();
        let groups = self.class_groups();
        write!(
            writer,
            "{} {} 1\n# {}\n{}",
            classes.len(),
            groups.len(),
            groups.join(" "),
            classes.join(" ")
        )
        .map_err(|err| KiraError::Filesystem(err.to_string()))
    }

    pub fn to_gct<W: Write>(&self, writer: &mut W) -> Result<(), KiraError> {
        self.ensure_finite()?;
        let io = |err: std::io::Error| KiraError::Filesystem(err.to_string());
        writeln!(writer, "#1.2").map_err(io)?;
        writeln!(writer, "{}\t{}", self.genes.len(), self.samples.len()).map_err(io)?;
        self.to_txt(writer)
    }

    /// Expression table with a placeholder `Description` column after the
    /// gene identifier.
    pub fn to_txt<W: Write>(&self, writer: &mut W) -> Result<(), KiraError> {
        let io = |err: std::io::Error| KiraError::Filesystem(err.to_string());
        writeln!(writer, "gene\tDescription\t{}", self.samples.join("\t")).map_err(io)?;
        for (gene, row) in self.genes.iter().zip(&self.values) {
            let cells = row
                .iter()
                .map(|value| format!("{value:.6}"))
                .collect::<Vec<_>>();
            writeln!(writer, "{gene}\tna\t{}", cells.join("\t")).map_err(io)?;
        }
        Ok(())
    }

    fn ensure_finite(&self) -> Result<(), KiraError> {
        for (gene, row) in self.genes.iter().zip(&self.values) {
            if let Some(position) = row.iter().position(|value| !value.is_finite()) {
                return Err(KiraError::MissingValues(format!(
                    "gene {gene}, sample {}",
                    self.samples[position]
                )));
            }
        }
        Ok(())
    }
}

fn parse_value(field: &str) -> Option<f64> {
    match field {
        "" | "NA" | "na" | "NaN" | "nan" => Some(f64::NAN),
        _ => field.parse().ok(),
    }
}
