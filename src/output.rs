use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    CollectionSummary, FrameResult, LibraryListResult, ProgressEvent, ProgressSink, RunResult,
};
use crate::diagnostics::ValidationWarning;
use crate::error::KiraError;
use crate::frame::Frame;
use crate::table::ResultTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_libraries(result: &LibraryListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_summary(result: &CollectionSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_frame(result: &FrameResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Plain-text rendering for terminals; progress goes to the log.
pub struct TextOutput;

impl TextOutput {
    pub fn print_libraries(result: &LibraryListResult) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "MSigDB {} at {}", result.version, result.root)?;
        if let Some(catalog) = &result.catalog {
            writeln!(stdout, "catalog: {catalog}")?;
        }
        for library in &result.libraries {
            writeln!(stdout, "{}\t{}", library.name, library.id_type)?;
        }
        Ok(())
    }

    pub fn print_summary(result: &CollectionSummary) -> io::Result<()> {
        Self::write_summary(&mut io::stdout().lock(), result)
    }

    pub fn write_summary<W: Write>(out: &mut W, result: &CollectionSummary) -> io::Result<()> {
        let name = if result.name.is_empty() {
            "(unnamed)"
        } else {
            result.name.as_str()
        };
        writeln!(out, "{name}: {} gene sets, {} genes", result.gene_sets, result.genes)?;
        if let (Some(smallest), Some(largest)) = (result.smallest, result.largest) {
            writeln!(out, "sizes: {smallest}..={largest}")?;
        }
        if result.empty_gene_sets > 0 {
            writeln!(out, "empty gene sets: {}", result.empty_gene_sets)?;
        }
        if result.redundant_groups > 0 {
            writeln!(out, "redundant groups: {}", result.redundant_groups)?;
        }
        if let Some(output) = &result.output {
            writeln!(out, "written to {output}")?;
        }
        Self::write_warnings(out, &result.warnings)
    }

    /// Warnings for commands whose stdout is a table go to stderr.
    pub fn print_warnings(warnings: &[ValidationWarning]) -> io::Result<()> {
        Self::write_warnings(&mut io::stderr().lock(), warnings)
    }

    pub fn write_warnings<W: Write>(out: &mut W, warnings: &[ValidationWarning]) -> io::Result<()> {
        for warning in warnings {
            writeln!(out, "warning: {warning}")?;
        }
        Ok(())
    }

    pub fn print_frame(frame: &Frame) -> Result<(), KiraError> {
        let mut stdout = io::stdout().lock();
        frame.write_tsv(&mut stdout)
    }

    pub fn print_table(table: &ResultTable) -> Result<(), KiraError> {
        let mut stdout = io::stdout().lock();
        table.write_tsv(&mut stdout)
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message)
            }
            None => tracing::info!("{}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_summary_lists_warnings() {
        let summary = CollectionSummary {
            name: "p.gmt".to_string(),
            path: None,
            gene_sets: 2,
            genes: 1,
            smallest: Some(1),
            largest: Some(1),
            empty_gene_sets: 1,
            redundant_groups: 1,
            output: None,
            warnings: vec![ValidationWarning::EmptyGeneSetsRemoved { count: 1 }],
        };
        let mut out = Vec::new();
        TextOutput::write_summary(&mut out, &summary).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("p.gmt: 2 gene sets, 1 genes\n"));
        assert!(text.ends_with("warning: 1 empty gene sets were removed\n"));
    }
}
