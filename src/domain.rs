use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Entrez,
    Symbols,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Entrez => "entrez",
            IdType::Symbols => "symbols",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "entrez" => Ok(IdType::Entrez),
            "symbols" => Ok(IdType::Symbols),
            _ => Err(KiraError::InvalidIdType(value.to_string())),
        }
    }
}

/// MSigDB release, kept in the string form used by file names (`7.4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryVersion(String);

impl LibraryVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LibraryVersion {
    fn default() -> Self {
        Self("7.4".to_string())
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LibraryVersion {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_start_matches(['v', 'V']).to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_alphanumeric()));
        if !is_valid {
            return Err(KiraError::InvalidVersion(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl From<f64> for LibraryVersion {
    /// `7.0` stays `7.0`, matching how releases are spelled in file names.
    fn from(value: f64) -> Self {
        Self(format!("{value:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SignalToNoise,
    TTest,
    RatioOfClasses,
    DiffOfClasses,
    Log2RatioOfClasses,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::SignalToNoise => "signal_to_noise",
            Metric::TTest => "t_test",
            Metric::RatioOfClasses => "ratio_of_classes",
            Metric::DiffOfClasses => "diff_of_classes",
            Metric::Log2RatioOfClasses => "log2_ratio_of_classes",
        }
    }

    /// Spelling expected by the GSEA desktop `-metric` flag.
    pub fn desktop_name(&self) -> &'static str {
        match self {
            Metric::SignalToNoise => "Signal2Noise",
            Metric::TTest => "tTest",
            Metric::RatioOfClasses => "Ratio_of_Classes",
            Metric::DiffOfClasses => "Diff_of_Classes",
            Metric::Log2RatioOfClasses => "log2_Ratio_of_Classes",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "signal_to_noise" | "Signal2Noise" => Ok(Metric::SignalToNoise),
            "t_test" | "tTest" => Ok(Metric::TTest),
            "ratio_of_classes" | "Ratio_of_Classes" => Ok(Metric::RatioOfClasses),
            "diff_of_classes" | "Diff_of_Classes" => Ok(Metric::DiffOfClasses),
            "log2_ratio_of_classes" | "log2_Ratio_of_Classes" => Ok(Metric::Log2RatioOfClasses),
            _ => Err(KiraError::InvalidMetric(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PermutationType {
    #[default]
    Phenotype,
    GeneSet,
}

impl PermutationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermutationType::Phenotype => "phenotype",
            PermutationType::GeneSet => "gene_set",
        }
    }
}

impl fmt::Display for PermutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Wide,
    Long,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_id_type() {
        let id: IdType = "symbols".parse().unwrap();
        assert_eq!(id, IdType::Symbols);
        assert_eq!(IdType::Entrez.to_string(), "entrez");
    }

    #[test]
    fn parse_id_type_invalid() {
        let err = "ensembl".parse::<IdType>().unwrap_err();
        assert_matches!(err, KiraError::InvalidIdType(_));
    }

    #[test]
    fn version_from_number_keeps_decimal() {
        assert_eq!(LibraryVersion::from(7.1).as_str(), "7.1");
        assert_eq!(LibraryVersion::from(7.0).as_str(), "7.0");
    }

    #[test]
    fn version_from_str_normalizes_prefix() {
        let version: LibraryVersion = "v2023.1.Hs".parse().unwrap();
        assert_eq!(version.as_str(), "2023.1.Hs");
        assert_matches!(
            "7..4".parse::<LibraryVersion>(),
            Err(KiraError::InvalidVersion(_))
        );
    }

    #[test]
    fn metric_accepts_both_spellings() {
        assert_eq!("tTest".parse::<Metric>().unwrap(), Metric::TTest);
        assert_eq!(
            "signal_to_noise".parse::<Metric>().unwrap().desktop_name(),
            "Signal2Noise"
        );
    }
}
