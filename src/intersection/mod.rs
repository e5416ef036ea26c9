//! Neighbor-set intersection of vertex pairs over a partitioned graph.
//!
//! Every process issues the pairs it owns: `first` in one of its local major
//! ranges and `second` in its local minor range. On a grid, the neighbors of a
//! vertex are spread over the minor communicator, so each minor peer intersects
//! the slice it stores and the fragments are stitched back together in minor
//! rank order.

pub use assemble::reorder_to_global;
pub use collector::NeighborCache;
pub use intersect::LookupStrategy;

use crate::{
    comm::{Comm, Handle},
    error::{Error, Result},
    graph::{EdgeProperty, GraphView},
    tools::exclusive_sum,
    types::{Direction, VId, VertexPair},
    validate,
};
use intersect::PartialIntersection;
use log::{debug, info};

mod assemble;
mod collector;
mod intersect;

/// Elements compacted per step when stripping unused slot space.
pub const DEFAULT_COMPACTION_CHUNK_SIZE: usize = 1 << 27;

/// Ragged result: the neighbors shared by pair `i` are
/// `indices[offsets[i]..offsets[i + 1]]`, in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct NbrIntersection<P> {
    pub offsets: Vec<usize>,
    pub indices: Vec<VId>,
    /// Values of the edges `first -> nbr` and `second -> nbr`, aligned with `indices`.
    pub properties: Option<(Vec<P>, Vec<P>)>,
}

impl<P> NbrIntersection<P> {
    pub(crate) fn from_partial(partial: PartialIntersection<P>) -> Self {
        Self {
            offsets: exclusive_sum(&partial.sizes),
            indices: partial.indices,
            properties: partial.properties,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[VId] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn row_properties(&self, i: usize) -> Option<(&[P], &[P])> {
        let range = self.offsets[i]..self.offsets[i + 1];
        self.properties
            .as_ref()
            .map(|(first, second)| (&first[range.clone()], &second[range]))
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// A configured intersection call.
///
/// ```ignore
/// let result = IntersectionTask::new(&handle, &graph_view)
///     .edge_property(&weights)
///     .expensive_check(true)
///     .run(&pairs)?;
/// ```
pub struct IntersectionTask<'a, C, P = ()> {
    handle: &'a Handle<C>,
    graph_view: &'a GraphView,
    edge_property: Option<&'a EdgeProperty<P>>,
    directions: [Direction; 2],
    do_expensive_check: bool,
    compaction_chunk_size: usize,
}

impl<'a, C: Comm> IntersectionTask<'a, C> {
    pub fn new(handle: &'a Handle<C>, graph_view: &'a GraphView) -> Self {
        Self {
            handle,
            graph_view,
            edge_property: None,
            directions: [graph_view.stored_direction(); 2],
            do_expensive_check: false,
            compaction_chunk_size: DEFAULT_COMPACTION_CHUNK_SIZE,
        }
    }
}

impl<'a, C: Comm, P> IntersectionTask<'a, C, P> {
    /// Also returns the values of the edges to every common neighbor.
    pub fn edge_property<Q>(self, edge_property: &'a EdgeProperty<Q>) -> IntersectionTask<'a, C, Q> {
        IntersectionTask {
            handle: self.handle,
            graph_view: self.graph_view,
            edge_property: Some(edge_property),
            directions: self.directions,
            do_expensive_check: self.do_expensive_check,
            compaction_chunk_size: self.compaction_chunk_size,
        }
    }

    /// Which neighbor set of `first` and of `second` takes part.
    pub fn directions(mut self, directions: [Direction; 2]) -> Self {
        self.directions = directions;
        self
    }

    pub fn expensive_check(mut self, do_expensive_check: bool) -> Self {
        self.do_expensive_check = do_expensive_check;
        self
    }

    pub fn compaction_chunk_size(mut self, chunk_size: usize) -> Self {
        self.compaction_chunk_size = chunk_size;
        self
    }
}

impl<'a, C, P> IntersectionTask<'a, C, P>
where
    C: Comm,
    P: Copy + Send + Sync + 'static,
{
    /// Collective: every process of the grid must call it, with its own pairs.
    pub fn run(&self, pairs: &[VertexPair]) -> Result<NbrIntersection<P>> {
        check_directions(self.graph_view, self.directions)?;
        if self.do_expensive_check {
            validate::check_vertex_pairs(self.handle, self.graph_view, pairs)?;
        }
        let rank = self.handle.comm().rank();
        info!("rank {} intersecting {} vertex pairs...", rank, pairs.len());
        let result = if self.handle.is_multi_process() {
            let cache = collector::collect_neighbor_lists(
                self.handle,
                self.graph_view,
                self.edge_property,
                pairs,
            )?;
            debug!("rank {} cached {} neighbor lists", rank, cache.len());
            assemble::multi_process(
                self.handle,
                self.graph_view,
                self.edge_property,
                &cache,
                pairs,
                self.compaction_chunk_size,
            )?
        } else {
            assemble::single_process(
                self.graph_view,
                self.edge_property,
                pairs,
                self.compaction_chunk_size,
            )?
        };
        debug!(
            "rank {} found {} common neighbors",
            rank,
            result.indices.len()
        );
        info!("rank {} intersected", rank);
        Ok(result)
    }
}

/// Intersects the neighbor sets of every pair in `pairs`.
///
/// Collective over the grid of `handle`. Pairs must be sorted; with
/// `do_expensive_check` this and their ownership are verified first.
pub fn nbr_intersection<C, P>(
    handle: &Handle<C>,
    graph_view: &GraphView,
    edge_property: Option<&EdgeProperty<P>>,
    pairs: &[VertexPair],
    directions: [Direction; 2],
    do_expensive_check: bool,
) -> Result<NbrIntersection<P>>
where
    C: Comm,
    P: Copy + Send + Sync + 'static,
{
    IntersectionTask {
        handle,
        graph_view,
        edge_property,
        directions,
        do_expensive_check,
        compaction_chunk_size: DEFAULT_COMPACTION_CHUNK_SIZE,
    }
    .run(pairs)
}

/// Only the stored adjacency can be intersected, unless the graph is symmetric.
fn check_directions(graph_view: &GraphView, directions: [Direction; 2]) -> Result<()> {
    let stored = graph_view.stored_direction();
    if graph_view.is_symmetric() || directions.iter().all(|&d| d == stored) {
        Ok(())
    } else {
        Err(Error::Unimplemented(
            "intersecting a direction other than the stored one on a directed graph",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn test_check_directions() {
        use Direction::*;
        let edges = vec![(0, 1), (1, 2)];
        let directed = GraphBuilder::new(3).build_unweighted(edges.clone()).unwrap();
        assert!(check_directions(&directed[0].0, [Outgoing, Outgoing]).is_ok());
        assert!(matches!(
            check_directions(&directed[0].0, [Outgoing, Incoming]),
            Err(Error::Unimplemented(_))
        ));
        let transposed = GraphBuilder::new(3)
            .transposed(true)
            .build_unweighted(edges.clone())
            .unwrap();
        assert!(check_directions(&transposed[0].0, [Incoming, Incoming]).is_ok());
        assert!(check_directions(&transposed[0].0, [Outgoing, Outgoing]).is_err());
        let symmetric = GraphBuilder::new(3)
            .symmetrize(true)
            .build_unweighted(edges)
            .unwrap();
        assert!(check_directions(&symmetric[0].0, [Incoming, Outgoing]).is_ok());
    }

    #[test]
    fn test_result_rows() {
        let result = NbrIntersection {
            offsets: vec![0, 2, 2, 3],
            indices: vec![4, 9, 1],
            properties: Some((vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0])),
        };
        assert_eq!(result.len(), 3);
        assert_eq!(result.row(0), &[4, 9]);
        assert!(result.row(1).is_empty());
        assert_eq!(result.row_properties(2), Some((&[3.0][..], &[6.0][..])));
        assert_eq!(result.sizes(), vec![2, 0, 1]);
    }
}
