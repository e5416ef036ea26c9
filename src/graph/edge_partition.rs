use crate::types::VId;

/// Sparse row map for majors at or above `first`.
///
/// Only majors with at least one edge get a row, so very low degree tails do not
/// pay for a dense offset entry each.
#[derive(Debug, Clone)]
pub(crate) struct Hypersparse {
    pub first: VId,
    pub majors: Vec<VId>,
}

/// One CSR shard of the graph.
///
/// ```text
/// majors:  [major_range_first .. hypersparse_first) [hypersparse majors ...]
/// offsets: +---------- dense rows ----------------+----- sparse rows -----+ end
/// indices: minors of every row, ascending within a row
/// ```
#[derive(Debug, Clone)]
pub struct EdgePartition {
    major_range_first: VId,
    major_range_last: VId,
    offsets: Vec<usize>,
    indices: Vec<VId>,
    hypersparse: Option<Hypersparse>,
}

impl EdgePartition {
    pub(crate) fn new(
        major_range: (VId, VId),
        offsets: Vec<usize>,
        indices: Vec<VId>,
        hypersparse: Option<Hypersparse>,
    ) -> Self {
        debug_assert_eq!(offsets.last().copied(), Some(indices.len()));
        Self {
            major_range_first: major_range.0,
            major_range_last: major_range.1,
            offsets,
            indices,
            hypersparse,
        }
    }

    pub fn major_range(&self) -> (VId, VId) {
        (self.major_range_first, self.major_range_last)
    }

    pub fn contains_major(&self, v: VId) -> bool {
        self.major_range_first <= v && v < self.major_range_last
    }

    pub fn number_of_edges(&self) -> usize {
        self.indices.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn hypersparse_first(&self) -> Option<VId> {
        self.hypersparse.as_ref().map(|h| h.first)
    }

    /// The row of `v`, `None` for a hypersparse major without edges or a major
    /// outside this partition.
    pub fn major_idx(&self, v: VId) -> Option<usize> {
        if !self.contains_major(v) {
            return None;
        }
        match &self.hypersparse {
            Some(h) if v >= h.first => h
                .majors
                .binary_search(&v)
                .ok()
                .map(|k| (h.first - self.major_range_first) as usize + k),
            _ => Some((v - self.major_range_first) as usize),
        }
    }

    pub fn degree(&self, v: VId) -> usize {
        self.major_idx(v)
            .map_or(0, |idx| self.offsets[idx + 1] - self.offsets[idx])
    }

    /// Returns `(neighbors, offset, degree)`; `offset` indexes edge-aligned arrays.
    pub fn local_edges(&self, v: VId) -> (&[VId], usize, usize) {
        match self.major_idx(v) {
            Some(idx) => {
                let (begin, end) = (self.offsets[idx], self.offsets[idx + 1]);
                (&self.indices[begin..end], begin, end - begin)
            }
            None => (&[], 0, 0),
        }
    }
}
