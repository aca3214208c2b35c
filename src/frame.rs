use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use serde::Serialize;

use crate::domain::FrameFormat;
use crate::error::KiraError;
use crate::gene_sets::GeneSets;

/// Tabular export of a gene-set collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum Frame {
    Wide(WideFrame),
    Long(LongFrame),
}

/// Membership indicator table: one row per gene set, one column per gene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideFrame {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<bool>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongFrame {
    pub metadata_columns: Vec<String>,
    pub rows: Vec<LongRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub name: String,
    pub description: Option<String>,
    pub genes: Vec<String>,
    pub representativeness: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl GeneSets {
    pub fn to_frame(
        &self,
        format: FrameFormat,
        include_metadata: bool,
    ) -> Result<Frame, KiraError> {
        match format {
            FrameFormat::Wide => {
                if include_metadata {
                    return Err(KiraError::InvalidFrameRequest(
                        "metadata can only be included in the long format".to_string(),
                    ));
                }
                let columns = self.all_genes().iter().cloned().collect::<Vec<_>>();
                let cells = self
                    .iter()
                    .map(|gene_set| columns.iter().map(|gene| gene_set.contains(gene)).collect())
                    .collect();
                Ok(Frame::Wide(WideFrame {
                    index: self.iter().map(|gene_set| gene_set.name().to_string()).collect(),
                    columns,
                    cells,
                }))
            }
            FrameFormat::Long => {
                let metadata_columns = if include_metadata {
                    self.iter()
                        .flat_map(|gene_set| gene_set.metadata().keys().cloned())
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect()
                } else {
                    Vec::new()
                };
                let rows = self
                    .iter()
                    .map(|gene_set| LongRow {
                        name: gene_set.name().to_string(),
                        description: gene_set.description().map(str::to_string),
                        genes: gene_set.genes().iter().cloned().collect(),
                        representativeness: gene_set.representativeness(),
                        metadata: if include_metadata {
                            gene_set.metadata().clone()
                        } else {
                            BTreeMap::new()
                        },
                    })
                    .collect();
                Ok(Frame::Long(LongFrame {
                    metadata_columns,
                    rows,
                }))
            }
        }
    }
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Wide(frame) => frame.index.len(),
            Frame::Long(frame) => frame.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wide cells are written as `1`/`0`; long gene lists are comma-joined.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<(), KiraError> {
        let io = |err: std::io::Error| KiraError::Filesystem(err.to_string());
        match self {
            Frame::Wide(frame) => {
                let mut header = vec!["name".to_string()];
                header.extend(frame.columns.iter().cloned());
                writeln!(writer, "{}", header.join("\t")).map_err(io)?;
                for (name, row) in frame.index.iter().zip(&frame.cells) {
                    let cells = row
                        .iter()
                        .map(|cell| if *cell { "1" } else { "0" })
                        .collect::<Vec<_>>();
                    writeln!(writer, "{name}\t{}", cells.join("\t")).map_err(io)?;
                }
            }
            Frame::Long(frame) => {
                let mut header = vec![
                    "name".to_string(),
                    "description".to_string(),
                    "genes".to_string(),
                    "representativeness".to_string(),
                ];
                header.extend(frame.metadata_columns.iter().cloned());
                writeln!(writer, "{}", header.join("\t")).map_err(io)?;
                for row in &frame.rows {
                    let mut fields = vec![
                        row.name.clone(),
                        row.description.clone().unwrap_or_default(),
                        row.genes.join(","),
                        row.representativeness
                            .map(|value| format!("{value:.6}"))
                            .unwrap_or_default(),
                    ];
                    fields.extend(
                        frame
                            .metadata_columns
                            .iter()
                            .map(|key| row.metadata.get(key).cloned().unwrap_or_default()),
                    );
                    writeln!(writer, "{}", fields.join("\t")).map_err(io)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::gene_set::{GeneSet, GeneSetOptions};

    fn collection() -> GeneSets {
        GeneSets::new([
            GeneSet::with_options("A", ["x", "y"], GeneSetOptions::quiet()).into_inner(),
            GeneSet::with_options("B", ["y", "z"], GeneSetOptions::quiet()).into_inner(),
        ])
        .into_inner()
    }

    #[test]
    fn wide_frame_marks_membership() {
        let Frame::Wide(frame) = collection().to_frame(FrameFormat::Wide, false).unwrap() else {
            panic!("expected wide frame");
        };
        assert_eq!(frame.columns, vec!["x", "y", "z"]);
        assert_eq!(frame.cells, vec![vec![true, true, false], vec![false, true, true]]);
    }

    #[test]
    fn wide_frame_rejects_metadata() {
        assert_matches!(
            collection().to_frame(FrameFormat::Wide, true),
            Err(KiraError::InvalidFrameRequest(_))
        );
    }

    #[test]
    fn long_frame_tsv() {
        let frame = collection().to_frame(FrameFormat::Long, false).unwrap();
        let mut out = Vec::new();
        frame.write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "name\tdescription\tgenes\trepresentativeness");
        assert_eq!(lines[1], "A\t\tx,y\t");
    }
}
