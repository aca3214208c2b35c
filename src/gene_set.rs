use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::diagnostics::{Validated, ValidationWarning};

/// A named pathway or signature and its member gene identifiers.
///
/// Genes are held in a sorted set, so two gene sets with the same members
/// compare and hash the same regardless of input order.
#[derive(Debug, Clone, Serialize)]
pub struct GeneSet {
    name: String,
    genes: BTreeSet<String>,
    description: Option<String>,
    representativeness: Option<f64>,
    metadata: BTreeMap<String, String>,
    redundant_genes: Option<BTreeMap<String, usize>>,
}

#[derive(Debug, Clone)]
pub struct GeneSetOptions {
    pub description: Option<String>,
    pub warn_if_empty: bool,
    pub representativeness: Option<f64>,
    pub metadata: BTreeMap<String, String>,
}

impl Default for GeneSetOptions {
    fn default() -> Self {
        Self {
            description: None,
            warn_if_empty: true,
            representativeness: None,
            metadata: BTreeMap::new(),
        }
    }
}

impl GeneSetOptions {
    pub fn quiet() -> Self {
        Self {
            warn_if_empty: false,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl GeneSet {
    pub fn new<I, S>(name: impl Into<String>, genes: I) -> Validated<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(name, genes, GeneSetOptions::default())
    }

    pub fn with_options<I, S>(
        name: impl Into<String>,
        genes: I,
        options: GeneSetOptions,
    ) -> Validated<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut counts = BTreeMap::<String, usize>::new();
        for gene in genes {
            *counts.entry(gene.into()).or_insert(0) += 1;
        }

        let mut warnings = Vec::new();
        if options.warn_if_empty && counts.is_empty() {
            ValidationWarning::EmptyGeneSet { name: name.clone() }.emit(&mut warnings);
        }

        let duplicated = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(gene, count)| (gene.clone(), *count))
            .collect::<BTreeMap<_, _>>();
        let redundant_genes = if duplicated.is_empty() {
            None
        } else {
            ValidationWarning::DuplicateGenes {
                name: name.clone(),
                counts: duplicated.clone(),
            }
            .emit(&mut warnings);
            Some(duplicated)
        };

        let gene_set = Self {
            name,
            genes: counts.into_keys().collect(),
            description: options.description,
            representativeness: options.representativeness,
            metadata: options.metadata,
            redundant_genes,
        };
        Validated::new(gene_set, warnings)
    }

    /// Parses `name<TAB>description<TAB>gene...`.
    pub fn from_gmt_line(line: &str, options: GeneSetOptions) -> Validated<Self> {
        let mut fields = line.trim().split('\t');
        let name = fields.next().unwrap_or_default().to_string();
        let description = fields.next().map(str::to_string);
        let genes = fields.map(str::to_string).collect::<Vec<_>>();
        let options = GeneSetOptions {
            description,
            ..options
        };
        Self::with_options(name, genes, options)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn genes(&self) -> &BTreeSet<String> {
        &self.genes
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn representativeness(&self) -> Option<f64> {
        self.representativeness
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Multiplicity of every gene that appeared more than once in the input.
    pub fn redundant_genes(&self) -> Option<&BTreeMap<String, usize>> {
        self.redundant_genes.as_ref()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains(gene)
    }

    pub(crate) fn set_metadata(&mut self, metadata: BTreeMap<String, String>) {
        self.metadata = metadata;
    }

    /// Copy of this gene set under a new name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Intersection with `universe`, recording the fraction of genes kept.
    ///
    /// An empty gene set keeps nothing and reports a representativeness of 0.
    pub fn restricted_to(&self, universe: &BTreeSet<String>) -> Self {
        let overlap = self
            .genes
            .intersection(universe)
            .cloned()
            .collect::<BTreeSet<_>>();
        let representativeness = if self.genes.is_empty() {
            0.0
        } else {
            overlap.len() as f64 / self.genes.len() as f64
        };
        Self {
            name: self.name.clone(),
            genes: overlap,
            description: None,
            representativeness: Some(representativeness),
            metadata: BTreeMap::new(),
            redundant_genes: None,
        }
    }
}

impl PartialEq for GeneSet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.genes == other.genes
    }
}

impl Eq for GeneSet {}

impl Hash for GeneSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.genes.hash(state);
    }
}

impl fmt::Display for GeneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<GeneSet {:?} with {} genes", self.name, self.genes.len())?;
        if self.genes.len() < 5 {
            let listed = self.genes.iter().cloned().collect::<Vec<_>>().join(", ");
            write!(f, ": {listed}")?;
        }
        write!(f, ">")
    }
}
