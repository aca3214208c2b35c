use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::KiraError;

/// Ordered table of string cells, as reported by an external engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Parses delimited text with a header row. Double-quoted fields may
    /// contain the delimiter and `""` escapes. Short rows are padded.
    pub fn parse_delimited(content: &str, delimiter: char) -> Self {
        let mut lines = content.lines().filter(|line| !line.trim().is_empty());
        let Some(header) = lines.next() else {
            return Self::default();
        };
        let columns = split_record(header, delimiter);
        let rows = lines
            .map(|line| {
                let mut row = split_record(line, delimiter);
                row.resize(columns.len().max(row.len()), String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn read_delimited(path: &Path, delimiter: char) -> Result<Self, KiraError> {
        let content = fs::read_to_string(path)
            .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
        Ok(Self::parse_delimited(&content, delimiter))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let position = self.columns.iter().position(|column| column == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(position).map(String::as_str).unwrap_or_default())
                .collect(),
        )
    }

    /// Adds a column holding the same value on every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.resize(self.columns.len() - 1, String::new());
            row.push(value.to_string());
        }
        self
    }

    /// Stacks `other` below this table, aligning columns by name.
    pub fn append(&mut self, other: ResultTable) {
        let known = self.columns.iter().cloned().collect::<BTreeSet<_>>();
        for column in &other.columns {
            if !known.contains(column) {
                self.columns.push(column.clone());
            }
        }
        let width = self.columns.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (column, value) in other.columns.iter().zip(row) {
                if let Some(position) = self.columns.iter().position(|known| known == column) {
                    aligned[position] = value;
                }
            }
            self.rows.push(aligned);
        }
    }

    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<(), KiraError> {
        let io = |err: std::io::Error| KiraError::Filesystem(err.to_string());
        writeln!(writer, "{}", self.columns.join("\t")).map_err(io)?;
        for row in &self.rows {
            writeln!(writer, "{}", row.join("\t")).map_err(io)?;
        }
        Ok(())
    }
}

fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ch if ch == delimiter && !quoted => fields.push(std::mem::take(&mut current)),
            ch => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_csv() {
        let table = ResultTable::parse_delimited(
            "Term,es,genes\nKEGG_A,0.5,\"TP53;BRCA1\"\n\"KEGG, B\",-0.1,\"say \"\"hi\"\"\"\n",
            ',',
        );
        assert_eq!(table.columns(), &["Term", "es", "genes"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][0], "KEGG, B");
        assert_eq!(table.rows()[1][2], "say \"hi\"");
        assert_eq!(table.column("es").unwrap(), vec!["0.5", "-0.1"]);
    }

    #[test]
    fn header_only_is_empty() {
        let table = ResultTable::parse_delimited("NAME\tES\n", '\t');
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn append_aligns_columns() {
        let mut first = ResultTable::parse_delimited("NAME\tES\nA\t1\n", '\t')
            .with_constant_column("phenotype", "case");
        let second = ResultTable::parse_delimited("ES\tNAME\n2\tB\n", '\t')
            .with_constant_column("phenotype", "control");
        first.append(second);
        assert_eq!(first.columns(), &["NAME", "ES", "phenotype"]);
        assert_eq!(first.rows()[1], vec!["B", "2", "control"]);
    }
}
