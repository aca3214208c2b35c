use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Non-fatal findings raised while building gene sets and collections.
///
/// Every warning is logged through `tracing` when it is raised and also
/// returned to the caller inside [`Validated`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    EmptyGeneSet {
        name: String,
    },
    DuplicateGenes {
        name: String,
        counts: BTreeMap<String, usize>,
    },
    RedundantGeneSets {
        groups: Vec<RedundantGroup>,
        affected: usize,
    },
    EmptyGeneSetsRemoved {
        count: usize,
    },
    EmptyGeneSetsRetained {
        names: Vec<String>,
    },
    CollapseLimitExceeded {
        total: usize,
        examples: Vec<String>,
        limit: usize,
    },
    RedundantCollapsed {
        sets: usize,
        groups: usize,
        separator: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedundantGroup {
    pub names: Vec<String>,
    pub size: usize,
}

const VERBATIM_REDUNDANT_LIMIT: usize = 3;
const VERBATIM_EMPTY_LIMIT: usize = 5;

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::EmptyGeneSet { name } => write!(f, "GeneSet {name:?} is empty"),
            ValidationWarning::DuplicateGenes { name, counts } => {
                let listed = counts
                    .iter()
                    .map(|(gene, count)| format!("{gene:?}: {count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "GeneSet {name:?} received a non-unique collection of genes; redundant genes: {{{listed}}}"
                )
            }
            ValidationWarning::RedundantGeneSets { groups, affected } => {
                write!(f, "Provided gene sets are redundant; ")?;
                if groups.len() > VERBATIM_REDUNDANT_LIMIT {
                    write!(
                        f,
                        "there are {} gene sets having more than one name assigned, in total affecting {affected} gene sets",
                        groups.len()
                    )?;
                } else {
                    let identical = groups
                        .iter()
                        .map(|group| {
                            let names = group
                                .names
                                .iter()
                                .map(|name| format!("{name:?}"))
                                .collect::<Vec<_>>()
                                .join(" and ");
                            format!("{names} ({} genes)", group.size)
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "following gene sets are identical: {identical}")?;
                }
                write!(
                    f,
                    "; use `find_redundant()` to investigate further, or collapse them with a separator"
                )
            }
            ValidationWarning::EmptyGeneSetsRemoved { count } => {
                write!(f, "{count} empty gene sets were removed")
            }
            ValidationWarning::EmptyGeneSetsRetained { names } => {
                let listed = if names.len() <= VERBATIM_EMPTY_LIMIT {
                    names.join(", ")
                } else {
                    "use `empty_gene_sets()` to investigate further".to_string()
                };
                write!(f, "There are {} empty gene sets: {listed}", names.len())
            }
            ValidationWarning::CollapseLimitExceeded {
                total,
                examples,
                limit,
            } => write!(
                f,
                "Redundant collection of {total} gene sets which includes {} (among others) exceeds the collapse limit ({limit}) and only as many names will be included in the collapsed gene set",
                examples.join(",")
            ),
            ValidationWarning::RedundantCollapsed {
                sets,
                groups,
                separator,
            } => write!(
                f,
                "Collapsed {sets} redundant gene sets into {groups} non-redundant sets, concatenating their names with {separator:?}"
            ),
        }
    }
}

impl ValidationWarning {
    pub(crate) fn emit(self, sink: &mut Vec<ValidationWarning>) {
        tracing::warn!("{self}");
        sink.push(self);
    }
}

/// A value together with the validation warnings raised while producing it.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub value: T,
    pub warnings: Vec<ValidationWarning>,
}

impl<T> Validated<T> {
    pub fn new(value: T, warnings: Vec<ValidationWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Validated<U> {
        Validated {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Moves the warnings into `sink` and returns the bare value.
    pub fn collect_into(self, sink: &mut Vec<ValidationWarning>) -> T {
        sink.extend(self.warnings);
        self.value
    }
}
