//! The partitioned graph seen by one process.

pub use builder::{partition_vertex_pairs, GraphBuilder};
pub use edge_partition::EdgePartition;

use crate::{
    router::Router,
    types::{Direction, VId},
};

mod builder;
mod edge_partition;

/// A read-only handle over the shards owned by one process of the grid.
#[derive(Debug, Clone)]
pub struct GraphView {
    number_of_vertices: VId,
    vertex_partition_range_lasts: Vec<VId>,
    major_comm_size: usize,
    minor_comm_size: usize,
    major_comm_rank: usize,
    minor_comm_rank: usize,
    edge_partitions: Vec<EdgePartition>,
    is_symmetric: bool,
    is_storage_transposed: bool,
}

impl GraphView {
    pub fn number_of_vertices(&self) -> VId {
        self.number_of_vertices
    }

    pub fn is_multi_gpu(&self) -> bool {
        self.vertex_partition_range_lasts.len() > 1
    }

    pub fn is_symmetric(&self) -> bool {
        self.is_symmetric
    }

    pub fn is_storage_transposed(&self) -> bool {
        self.is_storage_transposed
    }

    /// The direction of the adjacency lists the shards store.
    pub fn stored_direction(&self) -> Direction {
        if self.is_storage_transposed {
            Direction::Incoming
        } else {
            Direction::Outgoing
        }
    }

    pub fn vertex_partition_range_lasts(&self) -> &[VId] {
        &self.vertex_partition_range_lasts
    }

    pub fn vertex_partition_range(&self, id: usize) -> (VId, VId) {
        let first = if id == 0 {
            0
        } else {
            self.vertex_partition_range_lasts[id - 1]
        };
        (first, self.vertex_partition_range_lasts[id])
    }

    pub fn router(&self) -> Router<'_> {
        Router::new(
            &self.vertex_partition_range_lasts,
            self.major_comm_size,
            self.minor_comm_size,
        )
    }

    pub fn edge_partition(&self, i: usize) -> &EdgePartition {
        &self.edge_partitions[i]
    }

    pub fn edge_partitions(&self) -> &[EdgePartition] {
        &self.edge_partitions
    }

    /// The local edge partition whose major range covers `v`.
    pub fn find_edge_partition(&self, v: VId) -> Option<usize> {
        if v < 0 || v >= self.number_of_vertices {
            return None;
        }
        let id = self.router().vertex_partition_id(v);
        (id % self.major_comm_size == self.major_comm_rank).then(|| id / self.major_comm_size)
    }

    /// The union of the minor ranges of all local edge partitions.
    pub fn local_minor_range(&self) -> (VId, VId) {
        let first_id = self.minor_comm_rank * self.major_comm_size;
        let last_id = first_id + self.major_comm_size - 1;
        (
            self.vertex_partition_range(first_id).0,
            self.vertex_partition_range(last_id).1,
        )
    }

    pub fn contains_minor(&self, v: VId) -> bool {
        let (first, last) = self.local_minor_range();
        first <= v && v < last
    }
}

/// One value per stored edge, aligned with each local edge partition's indices.
#[derive(Debug, Clone)]
pub struct EdgeProperty<P> {
    values: Vec<Vec<P>>,
}

impl<P> EdgeProperty<P> {
    pub fn new(values: Vec<Vec<P>>) -> Self {
        Self { values }
    }

    pub fn values(&self, i: usize) -> &[P] {
        &self.values[i]
    }
}
