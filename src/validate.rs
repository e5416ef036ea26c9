//! Expensive input checks, enabled by `do_expensive_check`.

use crate::{
    comm::{Comm, Handle},
    error::{Error, Result},
    graph::GraphView,
    types::{VId, VertexPair},
};
use log::warn;
use rayon::prelude::*;

/// Counts, over all processes, the pairs this process does not own.
///
/// A pair is invalid if either element is not a vertex of the graph or, on a
/// grid, if `first` lies outside every local major range or `second` outside the
/// local minor range.
pub fn count_invalid_vertex_pairs<C: Comm>(
    handle: &Handle<C>,
    graph_view: &GraphView,
    pairs: &[VertexPair],
) -> Result<usize> {
    let number_of_vertices = graph_view.number_of_vertices();
    let is_vertex = |v: VId| 0 <= v && v < number_of_vertices;
    let multi = graph_view.is_multi_gpu();
    let local = pairs
        .par_iter()
        .filter(|&&(first, second)| {
            !is_vertex(first)
                || !is_vertex(second)
                || (multi
                    && (graph_view.find_edge_partition(first).is_none()
                        || !graph_view.contains_minor(second)))
        })
        .count();
    handle.comm().all_reduce_sum(local)
}

/// Fails on every process if any process holds unsorted or invalid pairs.
pub(crate) fn check_vertex_pairs<C: Comm>(
    handle: &Handle<C>,
    graph_view: &GraphView,
    pairs: &[VertexPair],
) -> Result<()> {
    let unsorted = pairs.par_windows(2).any(|w| w[0] > w[1]) as usize;
    if handle.comm().all_reduce_sum(unsorted)? > 0 {
        warn!("rank {} found unsorted vertex pairs", handle.comm().rank());
        return Err(Error::UnsortedPairs);
    }
    match count_invalid_vertex_pairs(handle, graph_view, pairs)? {
        0 => Ok(()),
        num_invalid => Err(Error::InvalidVertexPairs(num_invalid)),
    }
}
