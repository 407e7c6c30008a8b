//! Construction and validation of contraction networks.

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use super::label::IndexLabel;
use super::network::{ContractionNetwork, Factor, Occurrence};
use crate::error::{ContractError, ContractResult};

/// Collects labeled factors and validates them into a [`ContractionNetwork`].
///
/// ```
/// use strided_contract::network::IndexGraphBuilder;
///
/// let network = IndexGraphBuilder::new()
///     .factor([-1, 3, 1, -2, 2])
///     .factor([3, 2, 4, -5])
///     .factor([1, 4, -4, -3])
///     .build()
///     .unwrap();
///
/// assert!(network.is_ncon());
/// assert_eq!(network.output().len(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IndexGraphBuilder {
    factors: Vec<Factor>,
    output: Option<Vec<IndexLabel>>,
}

impl IndexGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factor.
    pub fn factor<L: Into<IndexLabel>>(mut self, labels: impl IntoIterator<Item = L>) -> Self {
        self.push_factor(labels, false);
        self
    }

    /// Adds a factor that enters the expression conjugated.
    pub fn conj_factor<L: Into<IndexLabel>>(mut self, labels: impl IntoIterator<Item = L>) -> Self {
        self.push_factor(labels, true);
        self
    }

    pub fn push_factor<L: Into<IndexLabel>>(
        &mut self,
        labels: impl IntoIterator<Item = L>,
        conj: bool,
    ) {
        self.factors
            .push(Factor::new(labels.into_iter().map(Into::into), conj));
    }

    /// Sets the output label order explicitly.
    pub fn output<L: Into<IndexLabel>>(mut self, labels: impl IntoIterator<Item = L>) -> Self {
        self.output = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the factors and output, producing a network.
    pub fn build(self) -> ContractResult<ContractionNetwork> {
        if self.factors.is_empty() {
            return Err(ContractError::EmptyNetwork);
        }

        let mut labels: Vec<IndexLabel> = Vec::new();
        let mut ids: HashMap<IndexLabel, usize> = HashMap::new();
        let mut occurrences: Vec<SmallVec<[Occurrence; 2]>> = Vec::new();

        for (factor, f) in self.factors.iter().enumerate() {
            for (axis, label) in f.labels().iter().enumerate() {
                let id = *ids.entry(label.clone()).or_insert_with(|| {
                    labels.push(label.clone());
                    occurrences.push(SmallVec::new());
                    labels.len() - 1
                });
                occurrences[id].push(Occurrence { factor, axis });
            }
        }

        for (id, occ) in occurrences.iter().enumerate() {
            if occ.len() > 2 {
                return Err(ContractError::malformed(
                    labels[id].clone(),
                    occ.len(),
                    "a label may occur at most twice",
                ));
            }
        }

        let ncon = follows_ncon(&labels, &occurrences);

        let output = match self.output {
            Some(output) => {
                validate_output(&output, &labels, &ids, &occurrences)?;
                output
            }
            None if ncon => {
                let mut free: Vec<IndexLabel> = free_labels(&labels, &occurrences).collect();
                free.sort_by_key(|l| l.as_int().map(i64::unsigned_abs));
                free
            }
            None => free_labels(&labels, &occurrences).collect(),
        };

        log::trace!(
            "built network with {} factors, {} labels (ncon: {})",
            self.factors.len(),
            labels.len(),
            ncon
        );

        Ok(ContractionNetwork::from_parts(
            self.factors,
            output,
            labels,
            ids,
            occurrences,
            ncon,
        ))
    }
}

/// Builds a network from NCON index lists.
///
/// Negative labels are free, positive labels are contracted.
pub fn from_ncon<I>(index_lists: impl IntoIterator<Item = I>) -> ContractResult<ContractionNetwork>
where
    I: IntoIterator<Item = i64>,
{
    let mut builder = IndexGraphBuilder::new();
    for list in index_lists {
        builder.push_factor(list, false);
    }
    builder.build()
}

impl ContractionNetwork {
    /// Builds a network from NCON index lists. See [`from_ncon`].
    pub fn from_ncon<I>(index_lists: impl IntoIterator<Item = I>) -> ContractResult<Self>
    where
        I: IntoIterator<Item = i64>,
    {
        from_ncon(index_lists)
    }
}

/// Free labels in first-appearance order, which is factor order then axis order.
fn free_labels<'a>(
    labels: &'a [IndexLabel],
    occurrences: &'a [SmallVec<[Occurrence; 2]>],
) -> impl Iterator<Item = IndexLabel> + 'a {
    labels
        .iter()
        .zip(occurrences)
        .filter(|(_, occ)| occ.len() == 1)
        .map(|(label, _)| label.clone())
}

/// All labels are nonzero integers, negative exactly when free.
fn follows_ncon(labels: &[IndexLabel], occurrences: &[SmallVec<[Occurrence; 2]>]) -> bool {
    labels.iter().zip(occurrences).all(|(label, occ)| match label.as_int() {
        Some(v) if v < 0 => occ.len() == 1,
        Some(v) if v > 0 => occ.len() == 2,
        _ => false,
    })
}

fn validate_output(
    output: &[IndexLabel],
    labels: &[IndexLabel],
    ids: &HashMap<IndexLabel, usize>,
    occurrences: &[SmallVec<[Occurrence; 2]>],
) -> ContractResult<()> {
    let mut seen: HashSet<&IndexLabel> = HashSet::new();

    for label in output {
        if !seen.insert(label) {
            let count = ids.get(label).map_or(0, |&id| occurrences[id].len());
            return Err(ContractError::malformed(
                label.clone(),
                count,
                "label repeated in the output",
            ));
        }
        match ids.get(label) {
            None => {
                return Err(ContractError::malformed(
                    label.clone(),
                    0,
                    "output label does not occur in any factor",
                ));
            }
            Some(&id) if occurrences[id].len() == 2 => {
                return Err(ContractError::malformed(
                    label.clone(),
                    2,
                    "contracted label listed in the output",
                ));
            }
            Some(_) => {}
        }
    }

    for (label, occ) in labels.iter().zip(occurrences) {
        if occ.len() == 1 && !seen.contains(label) {
            return Err(ContractError::malformed(
                label.clone(),
                1,
                "free label missing from the output",
            ));
        }
    }

    Ok(())
}
