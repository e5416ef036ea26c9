//! Routing vertices to the processes and edge partitions owning them.
//!
//! The `P = major_comm_size * minor_comm_size` vertex partitions are numbered
//! globally. A process at grid coordinates `(major_comm_rank, minor_comm_rank)`
//! stores, as its `i`-th local edge partition, the edges whose major lies in
//! vertex partition `i * major_comm_size + major_comm_rank` and whose minor lies
//! in vertex partitions `[minor_comm_rank * major_comm_size,
//! (minor_comm_rank + 1) * major_comm_size)`.

use crate::types::{VId, VertexPair};

#[derive(Debug, Clone, Copy)]
pub struct Router<'a> {
    vertex_partition_range_lasts: &'a [VId],
    major_comm_size: usize,
    minor_comm_size: usize,
}

impl<'a> Router<'a> {
    pub fn new(
        vertex_partition_range_lasts: &'a [VId],
        major_comm_size: usize,
        minor_comm_size: usize,
    ) -> Self {
        debug_assert_eq!(
            vertex_partition_range_lasts.len(),
            major_comm_size * minor_comm_size
        );
        Self {
            vertex_partition_range_lasts,
            major_comm_size,
            minor_comm_size,
        }
    }

    pub fn vertex_partition_id(&self, v: VId) -> usize {
        self.vertex_partition_range_lasts
            .partition_point(|&last| last <= v)
    }

    pub fn major_comm_rank(&self, v: VId) -> usize {
        self.vertex_partition_id(v) % self.major_comm_size
    }

    pub fn local_edge_partition_index(&self, v: VId) -> usize {
        self.vertex_partition_id(v) / self.major_comm_size
    }

    /// The shuffle bucket of a vertex whose adjacency is requested over the major communicator.
    pub fn bucket(&self, v: VId) -> usize {
        let id = self.vertex_partition_id(v);
        (id % self.major_comm_size) * self.minor_comm_size + id / self.major_comm_size
    }

    pub fn num_buckets(&self) -> usize {
        self.major_comm_size * self.minor_comm_size
    }

    /// The minor communicator rank whose minor range covers `v`.
    pub fn minor_comm_rank(&self, v: VId) -> usize {
        self.vertex_partition_id(v) / self.major_comm_size
    }

    /// The global rank storing the edge `major -> minor`.
    pub fn comm_rank_of_edge(&self, major: VId, minor: VId) -> usize {
        self.minor_comm_rank(minor) * self.major_comm_size + self.major_comm_rank(major)
    }

    /// The global rank a query pair has to be issued on.
    pub fn comm_rank_of_pair(&self, pair: VertexPair) -> usize {
        self.comm_rank_of_edge(pair.0, pair.1)
    }
}

/// Transposes a row-major `rows x cols` table of group counts into `cols x rows`.
///
/// Used both ways: a `[rank][partition]` table becomes `[partition][rank]` with
/// `rows = ranks`, and back with the dimensions swapped.
pub fn transpose_group_counts(counts: &[usize], rows: usize, cols: usize) -> Vec<usize> {
    debug_assert_eq!(counts.len(), rows * cols);
    let mut transposed = vec![0; counts.len()];
    for r in 0..rows {
        for c in 0..cols {
            transposed[c * rows + r] = counts[r * cols + c];
        }
    }
    transposed
}
