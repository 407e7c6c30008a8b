//! Validated contraction networks.

use core::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::label::IndexLabel;
use super::labelset::LabelSet;

/// Label sequence of one factor.
pub type Labels = SmallVec<[IndexLabel; 6]>;

/// One tensor factor of a network: its labels (one per dimension) and conjugation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    labels: Labels,
    conj: bool,
}

impl Factor {
    pub fn new(labels: impl IntoIterator<Item = IndexLabel>, conj: bool) -> Self {
        Self {
            labels: labels.into_iter().collect(),
            conj,
        }
    }

    /// Labels in dimension order.
    #[inline]
    pub fn labels(&self) -> &[IndexLabel] {
        &self.labels
    }

    /// Whether the factor enters the expression conjugated.
    #[inline]
    pub fn is_conj(&self) -> bool {
        self.conj
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.labels.len()
    }
}

/// Where a label occurs: factor index and axis within that factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub factor: usize,
    pub axis: usize,
}

/// A validated network of labeled factors and its output label order.
///
/// Every label occurs exactly twice across the factors (contracted) or exactly
/// once and in the output (free). Build one with
/// [`IndexGraphBuilder`](super::IndexGraphBuilder).
#[derive(Debug, Clone)]
pub struct ContractionNetwork {
    factors: Vec<Factor>,
    output: Vec<IndexLabel>,
    /// Interned labels in order of first appearance.
    labels: Vec<IndexLabel>,
    ids: HashMap<IndexLabel, usize>,
    occurrences: Vec<SmallVec<[Occurrence; 2]>>,
    ncon: bool,
}

impl ContractionNetwork {
    pub(crate) fn from_parts(
        factors: Vec<Factor>,
        output: Vec<IndexLabel>,
        labels: Vec<IndexLabel>,
        ids: HashMap<IndexLabel, usize>,
        occurrences: Vec<SmallVec<[Occurrence; 2]>>,
        ncon: bool,
    ) -> Self {
        Self {
            factors,
            output,
            labels,
            ids,
            occurrences,
            ncon,
        }
    }

    #[inline]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    #[inline]
    pub fn factor(&self, index: usize) -> &Factor {
        &self.factors[index]
    }

    #[inline]
    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    /// Output labels in result dimension order.
    #[inline]
    pub fn output(&self) -> &[IndexLabel] {
        &self.output
    }

    /// Returns true if the labels follow the NCON sign convention.
    #[inline]
    pub fn is_ncon(&self) -> bool {
        self.ncon
    }

    /// Number of distinct labels.
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Label for an interned id.
    #[inline]
    pub fn label(&self, id: usize) -> &IndexLabel {
        &self.labels[id]
    }

    /// Interned id of a label, if it occurs in the network.
    pub fn id_of(&self, label: &IndexLabel) -> Option<usize> {
        self.ids.get(label).copied()
    }

    /// All occurrences of a label id.
    pub fn occurrences(&self, id: usize) -> &[Occurrence] {
        &self.occurrences[id]
    }

    /// Returns true if the label is summed away.
    pub fn is_contracted(&self, id: usize) -> bool {
        self.occurrences[id].len() == 2
    }

    /// Returns true if both occurrences of the label sit on one factor.
    pub fn is_traced(&self, id: usize) -> bool {
        let occ = &self.occurrences[id];
        occ.len() == 2 && occ[0].factor == occ[1].factor
    }

    /// Contracted label ids in order of first appearance.
    pub fn contracted_ids(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.labels.len()).filter(|&id| self.is_contracted(id))
    }

    /// Labels of a factor that are not traced within the factor itself.
    pub fn factor_open_set(&self, factor: usize) -> LabelSet {
        let mut set = LabelSet::new();
        for label in self.factors[factor].labels() {
            let id = self.ids[label];
            if !self.is_traced(id) {
                set.insert(id);
            }
        }
        set
    }

    /// Returns a copy where every factor's conjugation flag is flipped.
    ///
    /// `conj(A * B) = conj(A) * conj(B)`, and a conjugated factor conjugated again cancels.
    pub fn conjugated(&self) -> ContractionNetwork {
        let mut network = self.clone();
        for factor in &mut network.factors {
            factor.conj = !factor.conj;
        }
        network
    }
}

impl fmt::Display for ContractionNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, factor) in self.factors.iter().enumerate() {
            if i > 0 {
                write!(f, " * ")?;
            }
            write!(f, "T{i}")?;
            if factor.conj {
                write!(f, "'")?;
            }
            write_labels(f, factor.labels())?;
        }
        write!(f, " -> ")?;
        write_labels(f, &self.output)
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: &[IndexLabel]) -> fmt::Result {
    write!(f, "[")?;
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{label}")?;
    }
    write!(f, "]")
}
