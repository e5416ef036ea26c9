use super::{
    intersect::{intersect_pairs, partition_span, LookupStrategy, PartialIntersection},
    NbrIntersection, NeighborCache,
};
use crate::{
    comm::{all_gather_flat, Comm, Handle},
    error::Result,
    graph::{EdgeProperty, GraphView},
    tools::exclusive_sum,
    types::{VId, VertexPair},
};
use log::debug;
use rayon::prelude::*;

pub(crate) fn single_process<P>(
    graph_view: &GraphView,
    edge_property: Option<&EdgeProperty<P>>,
    pairs: &[VertexPair],
    chunk_size: usize,
) -> Result<NbrIntersection<P>>
where
    P: Copy + Send + Sync + 'static,
{
    let lookup = LookupStrategy::Local(graph_view, edge_property);
    let partial = intersect_pairs(
        pairs,
        |v| lookup.span(v),
        |v| lookup.span(v),
        edge_property.is_some(),
        chunk_size,
    )?;
    Ok(NbrIntersection::from_partial(partial))
}

/// Intersects the pairs of each local edge partition in turn.
///
/// The pairs of partition `i` are gathered over the minor communicator, every
/// peer intersects them within its own minor range, and the fragments are
/// returned to the peer that issued the pair.
pub(crate) fn multi_process<C, P>(
    handle: &Handle<C>,
    graph_view: &GraphView,
    edge_property: Option<&EdgeProperty<P>>,
    cache: &NeighborCache<P>,
    pairs: &[VertexPair],
    chunk_size: usize,
) -> Result<NbrIntersection<P>>
where
    C: Comm,
    P: Copy + Send + Sync + 'static,
{
    let minor_comm = handle.minor_comm();
    let with_properties = edge_property.is_some();
    let second = LookupStrategy::CachedMap(cache);
    let bounds = partition_bounds(graph_view, pairs);
    let mut sizes = Vec::with_capacity(pairs.len());
    let mut indices = Vec::new();
    let mut properties = with_properties.then(|| (Vec::new(), Vec::new()));
    for (i, partition) in graph_view.edge_partitions().iter().enumerate() {
        let values = edge_property.map(|p| p.values(i));
        let (gathered, counts) =
            all_gather_flat(minor_comm, pairs[bounds[i]..bounds[i + 1]].to_vec())?;
        debug!(
            "edge partition {}: {} pairs over {} minor peers",
            i,
            gathered.len(),
            counts.len()
        );
        let partial = intersect_pairs(
            &gathered,
            |v| partition_span(partition, values, v),
            |v| second.span(v),
            with_properties,
            chunk_size,
        )?;
        drop(gathered);
        let combined = combine_fragments(minor_comm, partial, &counts)?;
        sizes.extend(combined.sizes);
        indices.extend(combined.indices);
        if let (Some((firsts, seconds)), Some((first_part, second_part))) =
            (properties.as_mut(), combined.properties)
        {
            firsts.extend(first_part);
            seconds.extend(second_part);
        }
    }
    Ok(NbrIntersection::from_partial(PartialIntersection {
        sizes,
        indices,
        properties,
    }))
}

/// `pairs[bounds[i]..bounds[i + 1]]` have their `first` in local edge partition `i`.
fn partition_bounds(graph_view: &GraphView, pairs: &[VertexPair]) -> Vec<usize> {
    let mut bounds = vec![0];
    bounds.extend(graph_view.edge_partitions().iter().map(|partition| {
        let (_, last) = partition.major_range();
        pairs.partition_point(|&(first, _)| first < last)
    }));
    if let Some(last) = bounds.last_mut() {
        *last = pairs.len();
    }
    bounds
}

/// Sends every peer's fragments back to it and merges what comes back.
///
/// `counts[p]` pairs of `partial` were issued by minor peer `p`. Sizes are
/// summed; ids are concatenated in peer order, which keeps them ascending
/// because minor ranges ascend with the minor rank.
fn combine_fragments<C, P>(
    minor_comm: &C,
    partial: PartialIntersection<P>,
    counts: &[usize],
) -> Result<PartialIntersection<P>>
where
    C: Comm,
    P: Copy + Send + Sync + 'static,
{
    let pair_bounds = exclusive_sum(counts);
    let offsets = exclusive_sum(&partial.sizes);
    let edge_bounds: Vec<usize> = pair_bounds.iter().map(|&b| offsets[b]).collect();
    let rx_sizes = minor_comm.all_to_all_v(
        pair_bounds
            .windows(2)
            .map(|w| partial.sizes[w[0]..w[1]].to_vec())
            .collect(),
    )?;
    let rx_indices: Vec<Vec<VId>> = minor_comm.all_to_all_v(
        edge_bounds
            .windows(2)
            .map(|w| partial.indices[w[0]..w[1]].to_vec())
            .collect(),
    )?;
    let properties = match partial.properties {
        Some((firsts, seconds)) => {
            let split_values = |values: Vec<P>| -> Vec<Vec<P>> {
                edge_bounds
                    .windows(2)
                    .map(|w| values[w[0]..w[1]].to_vec())
                    .collect()
            };
            let rx_firsts = minor_comm.all_to_all_v(split_values(firsts))?;
            let rx_seconds = minor_comm.all_to_all_v(split_values(seconds))?;
            Some((
                interleave_fragments(&rx_firsts, &rx_sizes),
                interleave_fragments(&rx_seconds, &rx_sizes),
            ))
        }
        None => None,
    };
    let indices = interleave_fragments(&rx_indices, &rx_sizes);
    let sizes = (0..rx_sizes.first().map_or(0, Vec::len))
        .map(|j| rx_sizes.iter().map(|peer| peer[j]).sum())
        .collect();
    Ok(PartialIntersection {
        sizes,
        indices,
        properties,
    })
}

/// Pair `j` of the output is fragment `j` of peer 0, then of peer 1, and so on.
fn interleave_fragments<T>(fragments: &[Vec<T>], sizes: &[Vec<usize>]) -> Vec<T>
where
    T: Copy + Send + Sync,
{
    let offsets: Vec<Vec<usize>> = sizes.iter().map(|s| exclusive_sum(s)).collect();
    let num_pairs = sizes.first().map_or(0, Vec::len);
    (0..num_pairs)
        .into_par_iter()
        .flat_map_iter(|j| {
            fragments.iter().zip(&offsets).flat_map(move |(fragment, offsets)| {
                fragment[offsets[j]..offsets[j + 1]].iter().copied()
            })
        })
        .collect()
}

/// Puts per-process results back in the order of the original pair list.
///
/// `parts` holds, for each process, the position in the original list of every
/// pair it issued together with its result. Positions that no part covers get
/// an empty row.
pub fn reorder_to_global<P: Copy>(
    parts: Vec<(Vec<usize>, NbrIntersection<P>)>,
    num_pairs: usize,
) -> NbrIntersection<P> {
    let mut origin = vec![None; num_pairs];
    for (p, (positions, _)) in parts.iter().enumerate() {
        for (k, &pos) in positions.iter().enumerate() {
            origin[pos] = Some((p, k));
        }
    }
    let with_properties =
        !parts.is_empty() && parts.iter().all(|(_, result)| result.properties.is_some());
    let mut sizes = Vec::with_capacity(num_pairs);
    let mut indices = Vec::new();
    let mut properties = with_properties.then(|| (Vec::new(), Vec::new()));
    for &slot in &origin {
        let (p, k) = match slot {
            Some(slot) => slot,
            None => {
                sizes.push(0);
                continue;
            }
        };
        let result = &parts[p].1;
        let row = result.row(k);
        sizes.push(row.len());
        indices.extend_from_slice(row);
        if let (Some((firsts, seconds)), Some((first_row, second_row))) =
            (properties.as_mut(), result.row_properties(k))
        {
            firsts.extend_from_slice(first_row);
            seconds.extend_from_slice(second_row);
        }
    }
    NbrIntersection {
        offsets: exclusive_sum(&sizes),
        indices,
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        comm::{run_spmd, LocalComm},
        types::INVALID_VERTEX,
    };

    #[test]
    fn test_interleave_fragments() {
        let fragments = vec![vec![1, 3, 5], vec![7, 8]];
        let sizes = vec![vec![2, 0, 1], vec![1, 1, 0]];
        assert_eq!(interleave_fragments(&fragments, &sizes), vec![1, 3, 7, 8, 5]);
    }

    #[test]
    fn test_combine_fragments() {
        let handles = LocalComm::grid(1, 2).unwrap();
        // peer 0 issued one pair, peer 1 two; both computed all three
        let results = run_spmd(&handles, |handle| {
            let peer = handle.minor_comm().rank() as VId;
            let partial = PartialIntersection {
                sizes: vec![1, 0, 2],
                indices: vec![10 * peer, 10 * peer + 1, 10 * peer + 2],
                properties: Some((vec![1.0; 3], vec![2.0; 3])),
            };
            combine_fragments(handle.minor_comm(), partial, &[1, 2]).unwrap()
        });
        assert_eq!(results[0].sizes, vec![2]);
        assert_eq!(results[0].indices, vec![0, 10]);
        assert_eq!(results[1].sizes, vec![0, 4]);
        assert_eq!(results[1].indices, vec![1, 2, 11, 12]);
        assert_eq!(results[1].properties, Some((vec![1.0; 4], vec![2.0; 4])));
        assert!(!results[1].indices.contains(&INVALID_VERTEX));
    }

    #[test]
    fn test_reorder_to_global() {
        let part = |offsets: Vec<usize>, indices: Vec<VId>| NbrIntersection::<()> {
            offsets,
            indices,
            properties: None,
        };
        let parts = vec![
            (vec![2, 0], part(vec![0, 1, 3], vec![5, 6, 7])),
            (vec![1], part(vec![0, 0], vec![])),
        ];
        let result = reorder_to_global(parts, 4);
        assert_eq!(result.offsets, vec![0, 2, 2, 3, 3]);
        assert_eq!(result.indices, vec![6, 7, 5]);
        assert!(result.properties.is_none());
    }
}
