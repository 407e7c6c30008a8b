//! Compact sets of interned label ids.

use smallvec::SmallVec;

/// A set of label ids stored as a bitset.
///
/// Ids are the dense indices assigned by [`ContractionNetwork`](super::ContractionNetwork).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet {
    words: SmallVec<[u64; 2]>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new();
        for id in ids {
            set.insert(id);
        }
        set
    }

    pub fn insert(&mut self, id: usize) {
        let (word, bit) = (id / 64, id % 64);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    #[inline]
    pub fn contains(&self, id: usize) -> bool {
        let (word, bit) = (id / 64, id % 64);
        self.words.get(word).is_some_and(|&w| w & (1u64 << bit) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn union(&self, other: &LabelSet) -> LabelSet {
        self.zip_with(other, |a, b| a | b)
    }

    pub fn intersection(&self, other: &LabelSet) -> LabelSet {
        self.zip_with(other, |a, b| a & b)
    }

    /// Labels in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &LabelSet) -> LabelSet {
        self.zip_with(other, |a, b| a ^ b)
    }

    /// Ids in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            core::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * 64 + bit)
            })
        })
    }

    fn zip_with(&self, other: &LabelSet, op: impl Fn(u64, u64) -> u64) -> LabelSet {
        let n = self.words.len().max(other.words.len());
        let mut words: SmallVec<[u64; 2]> = (0..n)
            .map(|i| {
                let a = self.words.get(i).copied().unwrap_or(0);
                let b = other.words.get(i).copied().unwrap_or(0);
                op(a, b)
            })
            .collect();
        while words.last() == Some(&0) {
            words.pop();
        }
        LabelSet { words }
    }
}
