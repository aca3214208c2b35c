use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::ops::RangeBounds;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::diagnostics::{RedundantGroup, Validated, ValidationWarning};
use crate::error::KiraError;
use crate::gene_set::{GeneSet, GeneSetOptions};

/// Gene content mapped to the attribute values of every gene set holding it.
pub type GeneContentGroups = BTreeMap<BTreeSet<String>, Vec<String>>;

pub const DEFAULT_COLLAPSE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKey {
    #[default]
    Name,
    /// Missing descriptions group as the empty string.
    Description,
}

#[derive(Debug, Clone)]
pub struct GeneSetsOptions {
    pub name: String,
    pub allow_redundant: bool,
    pub remove_empty: bool,
    pub path: Option<PathBuf>,
    /// Separator used to merge redundant gene sets; `None` or an empty
    /// separator leaves them as they are.
    pub collapse_redundant: Option<String>,
    pub collapse_limit: usize,
}

impl Default for GeneSetsOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            allow_redundant: false,
            remove_empty: true,
            path: None,
            collapse_redundant: None,
            collapse_limit: DEFAULT_COLLAPSE_LIMIT,
        }
    }
}

impl GeneSetsOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A collection of gene sets.
///
/// Every derivation (`trim`, `extract`, `subset`, `collapse_redundant`,
/// `format_names`) builds a fresh collection, so the memoized `all_genes`
/// and name index never go stale.
#[derive(Debug, Clone)]
pub struct GeneSets {
    gene_sets: Vec<GeneSet>,
    name: String,
    path: Option<PathBuf>,
    empty_gene_sets: Vec<GeneSet>,
    redundant: GeneContentGroups,
    all_genes: OnceLock<BTreeSet<String>>,
    by_name: OnceLock<Result<HashMap<String, usize>, String>>,
}

impl GeneSets {
    pub fn new(gene_sets: impl IntoIterator<Item = GeneSet>) -> Validated<Self> {
        Self::with_options(gene_sets, GeneSetsOptions::default())
    }

    pub fn with_options(
        gene_sets: impl IntoIterator<Item = GeneSet>,
        options: GeneSetsOptions,
    ) -> Validated<Self> {
        let mut seen = HashSet::new();
        let mut received = 0;
        let input = gene_sets
            .into_iter()
            .inspect(|_| received += 1)
            .filter(|gene_set| seen.insert(gene_set.clone()))
            .collect::<Vec<_>>();
        let mut warnings = Vec::new();
        // the origin file no longer describes the collection once sets are dropped or merged
        let mut modified = input.len() != received;

        let redundant = find_redundant_in(&input, GroupKey::Name, 1);
        let affected = redundant.values().map(Vec::len).sum::<usize>();
        let separator = options
            .collapse_redundant
            .filter(|separator| !separator.is_empty());

        if !options.allow_redundant && !redundant.is_empty() && separator.is_none() {
            let groups = redundant
                .iter()
                .map(|(genes, names)| RedundantGroup {
                    names: names.clone(),
                    size: genes.len(),
                })
                .collect();
            ValidationWarning::RedundantGeneSets { groups, affected }.emit(&mut warnings);
        }

        let (empty_gene_sets, non_empty): (Vec<_>, Vec<_>) =
            input.iter().cloned().partition(GeneSet::is_empty);
        let retained = if empty_gene_sets.is_empty() {
            input
        } else if options.remove_empty {
            ValidationWarning::EmptyGeneSetsRemoved {
                count: empty_gene_sets.len(),
            }
            .emit(&mut warnings);
            modified = true;
            non_empty
        } else {
            ValidationWarning::EmptyGeneSetsRetained {
                names: empty_gene_sets
                    .iter()
                    .map(|gene_set| gene_set.name().to_string())
                    .collect(),
            }
            .emit(&mut warnings);
            input
        };

        let gene_sets = match separator {
            Some(separator) if !redundant.is_empty() => {
                let collapsed = collapse_groups(
                    retained,
                    &redundant,
                    &separator,
                    options.collapse_limit,
                    &mut warnings,
                );
                ValidationWarning::RedundantCollapsed {
                    sets: affected,
                    groups: redundant.len(),
                    separator,
                }
                .emit(&mut warnings);
                modified = true;
                collapsed
            }
            _ => retained,
        };

        let collection = Self {
            gene_sets,
            name: options.name,
            path: options.path.filter(|_| !modified),
            empty_gene_sets,
            redundant,
            all_genes: OnceLock::new(),
            by_name: OnceLock::new(),
        };
        Validated::new(collection, warnings)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File this collection was parsed from, if it still matches its content.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn gene_sets(&self) -> &[GeneSet] {
        &self.gene_sets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneSet> {
        self.gene_sets.iter()
    }

    pub fn len(&self) -> usize {
        self.gene_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_sets.is_empty()
    }

    /// Gene sets without genes found in the input, whether removed or not.
    pub fn empty_gene_sets(&self) -> &[GeneSet] {
        &self.empty_gene_sets
    }

    /// Redundant groups found in the input, before any collapsing.
    pub fn redundant(&self) -> &GeneContentGroups {
        &self.redundant
    }

    pub fn group_identical(&self, key: GroupKey) -> GeneContentGroups {
        group_identical_in(&self.gene_sets, key)
    }

    /// Groups whose content is shared by more than `min_duplicates` gene sets.
    pub fn find_redundant(&self, key: GroupKey, min_duplicates: usize) -> GeneContentGroups {
        find_redundant_in(&self.gene_sets, key, min_duplicates)
    }

    pub fn all_genes(&self) -> &BTreeSet<String> {
        self.all_genes.get_or_init(|| {
            self.gene_sets
                .iter()
                .flat_map(|gene_set| gene_set.genes().iter().cloned())
                .collect()
        })
    }

    pub fn gene_sets_by_name(&self) -> Result<GeneSetsByName<'_>, KiraError> {
        let index = self.by_name.get_or_init(|| {
            let mut index = HashMap::with_capacity(self.gene_sets.len());
            for (position, gene_set) in self.gene_sets.iter().enumerate() {
                if index.insert(gene_set.name().to_string(), position).is_some() {
                    return Err(gene_set.name().to_string());
                }
            }
            Ok(index)
        });
        match index {
            Ok(index) => Ok(GeneSetsByName {
                gene_sets: &self.gene_sets,
                index,
            }),
            Err(name) => Err(KiraError::DuplicateGeneSetName(name.clone())),
        }
    }

    /// Keeps gene sets whose size falls in `sizes`, e.g. `trim(3..=100)`.
    pub fn trim(&self, sizes: impl RangeBounds<usize>) -> Validated<GeneSets> {
        let kept = self
            .gene_sets
            .iter()
            .filter(|gene_set| sizes.contains(&gene_set.len()))
            .cloned();
        GeneSets::with_options(kept, self.derived_options())
    }

    pub fn extract<I, S>(&self, set_names: I) -> Validated<GeneSets>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = set_names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect::<HashSet<_>>();
        let kept = self
            .gene_sets
            .iter()
            .filter(|gene_set| wanted.contains(gene_set.name()))
            .cloned();
        GeneSets::with_options(kept, self.derived_options())
    }

    /// Restricts every gene set to `genes`, keeping those that retain at
    /// least `min_representation` of their original members.
    pub fn subset<I, S>(&self, genes: I, min_representation: f64) -> Validated<GeneSets>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let universe = genes.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        let kept = self
            .gene_sets
            .iter()
            .map(|gene_set| gene_set.restricted_to(&universe))
            .filter(|restricted| {
                restricted.representativeness().unwrap_or_default() >= min_representation
            })
            .collect::<Vec<_>>();
        GeneSets::with_options(kept, self.derived_options())
    }

    pub fn collapse_redundant(&self, separator: &str) -> Validated<GeneSets> {
        let options = GeneSetsOptions {
            collapse_redundant: Some(separator.to_string()),
            ..self.derived_options()
        };
        GeneSets::with_options(self.gene_sets.iter().cloned(), options)
    }

    /// Renames every gene set in a copy of this collection.
    pub fn format_names<F>(&self, formatter: F) -> GeneSets
    where
        F: Fn(&GeneSet) -> String,
    {
        let gene_sets = self
            .gene_sets
            .iter()
            .map(|gene_set| gene_set.renamed(formatter(gene_set)))
            .collect::<Vec<_>>();
        let redundant = find_redundant_in(&gene_sets, GroupKey::Name, 1);
        Self {
            gene_sets,
            name: self.name.clone(),
            path: None,
            empty_gene_sets: self.empty_gene_sets.clone(),
            redundant,
            all_genes: OnceLock::new(),
            by_name: OnceLock::new(),
        }
    }

    /// Only for attaching metadata; names and genes must stay untouched.
    pub(crate) fn gene_sets_mut(&mut self) -> &mut [GeneSet] {
        &mut self.gene_sets
    }

    fn derived_options(&self) -> GeneSetsOptions {
        GeneSetsOptions::named(self.name.clone())
    }
}

impl PartialEq for GeneSets {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.gene_sets.iter().collect::<HashSet<_>>()
                == other.gene_sets.iter().collect::<HashSet<_>>()
    }
}

impl fmt::Display for GeneSets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<GeneSets with {} gene sets>", self.gene_sets.len())
        } else {
            write!(
                f,
                "<GeneSets {:?} with {} gene sets>",
                self.name,
                self.gene_sets.len()
            )
        }
    }
}

impl<'a> IntoIterator for &'a GeneSets {
    type Item = &'a GeneSet;
    type IntoIter = std::slice::Iter<'a, GeneSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.gene_sets.iter()
    }
}

/// Borrowed name index over a collection with unique names.
#[derive(Debug, Clone, Copy)]
pub struct GeneSetsByName<'a> {
    gene_sets: &'a [GeneSet],
    index: &'a HashMap<String, usize>,
}

impl<'a> GeneSetsByName<'a> {
    pub fn get(&self, name: &str) -> Option<&'a GeneSet> {
        self.index.get(name).map(|position| &self.gene_sets[*position])
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.index.keys().map(String::as_str)
    }
}

fn group_identical_in(gene_sets: &[GeneSet], key: GroupKey) -> GeneContentGroups {
    let mut groups = GeneContentGroups::new();
    for gene_set in gene_sets {
        let value = match key {
            GroupKey::Name => gene_set.name().to_string(),
            GroupKey::Description => gene_set.description().unwrap_or_default().to_string(),
        };
        groups.entry(gene_set.genes().clone()).or_default().push(value);
    }
    groups
}

fn find_redundant_in(
    gene_sets: &[GeneSet],
    key: GroupKey,
    min_duplicates: usize,
) -> GeneContentGroups {
    group_identical_in(gene_sets, key)
        .into_iter()
        .filter(|(_, values)| values.len() > min_duplicates)
        .collect()
}

fn collapse_groups(
    retained: Vec<GeneSet>,
    redundant: &GeneContentGroups,
    separator: &str,
    limit: usize,
    warnings: &mut Vec<ValidationWarning>,
) -> Vec<GeneSet> {
    for names in redundant.values().filter(|names| names.len() > limit) {
        ValidationWarning::CollapseLimitExceeded {
            total: names.len(),
            examples: names.iter().take(3).cloned().collect(),
            limit,
        }
        .emit(warnings);
    }

    let mut emitted = HashSet::new();
    let mut out = Vec::with_capacity(retained.len());
    for gene_set in retained {
        let Some(names) = redundant.get(gene_set.genes()) else {
            out.push(gene_set);
            continue;
        };
        if !emitted.insert(gene_set.genes().clone()) {
            continue;
        }
        let mut name = names
            .iter()
            .take(limit)
            .cloned()
            .collect::<Vec<_>>()
            .join(separator);
        if names.len() > limit {
            name.push_str(&format!("{separator}... {} more", names.len() - limit));
        }
        let options = GeneSetOptions::default().with_description(names.join(separator));
        let collapsed = GeneSet::with_options(name, gene_set.genes().iter().cloned(), options)
            .collect_into(warnings);
        out.push(collapsed);
    }
    out
}
