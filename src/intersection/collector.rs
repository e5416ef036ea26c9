use super::intersect::Span;
use crate::{
    comm::{shuffle_values, Comm, Handle},
    error::{try_with_capacity, Result},
    graph::{EdgePartition, EdgeProperty, GraphView},
    kv_store::KvStore,
    router::transpose_group_counts,
    tools::exclusive_sum,
    types::{VId, VertexPair},
};
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;

/// Neighbor lists fetched for the `second` vertices of the pairs issued on
/// this process and its minor peers.
///
/// Each list holds only the neighbors inside this process's minor range.
#[derive(Debug)]
pub struct NeighborCache<P> {
    kv_store: KvStore,
    offsets: Vec<usize>,
    indices: Vec<VId>,
    /// Empty unless an edge property was requested.
    values: Vec<P>,
}

impl<P> NeighborCache<P> {
    pub fn len(&self) -> usize {
        self.kv_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kv_store.is_empty()
    }

    pub(crate) fn span(&self, v: VId) -> Span<'_, P> {
        match self.kv_store.find(v) {
            Some(idx) => {
                let range = self.offsets[idx]..self.offsets[idx + 1];
                Span {
                    nbrs: &self.indices[range.clone()],
                    values: self.values.get(range).unwrap_or(&[]),
                }
            }
            None => Span::empty(),
        }
    }
}

/// Collective over both sub-communicators: fetches the minor range slice of
/// the adjacency of every `second` vertex issued on this minor communicator.
pub(crate) fn collect_neighbor_lists<C, P>(
    handle: &Handle<C>,
    graph_view: &GraphView,
    edge_property: Option<&EdgeProperty<P>>,
    pairs: &[VertexPair],
) -> Result<NeighborCache<P>>
where
    C: Comm,
    P: Copy + Send + Sync + 'static,
{
    let (major_comm, minor_comm) = (handle.major_comm(), handle.minor_comm());
    let (major_comm_size, minor_comm_size) = (major_comm.size(), minor_comm.size());
    let router = graph_view.router();
    let number_of_vertices = graph_view.number_of_vertices();

    let mut requested: Vec<VId> = pairs.iter().map(|&(_, second)| second).collect();
    requested.par_sort_unstable();
    requested.dedup();
    if minor_comm_size > 1 {
        // every minor peer intersects against the same set of lists
        requested = minor_comm
            .all_gather_v(requested)?
            .into_iter()
            .kmerge()
            .dedup()
            .collect();
    }
    requested.retain(|&v| 0 <= v && v < number_of_vertices);
    requested.par_sort_by_key(|&v| router.bucket(v));

    let mut bucket_counts = vec![0; router.num_buckets()];
    for &v in &requested {
        bucket_counts[router.bucket(v)] += 1;
    }
    let tx_counts: Vec<usize> = bucket_counts
        .chunks(minor_comm_size)
        .map(|chunk| chunk.iter().sum())
        .collect();
    debug!(
        "requesting {} neighbor lists from {} major peers",
        requested.len(),
        major_comm_size
    );
    let (rx_vertices, _) = shuffle_values(major_comm, requested.clone(), &tx_counts)?;
    let rx_table: Vec<usize> = major_comm
        .all_to_all_v(
            bucket_counts
                .chunks(minor_comm_size)
                .map(<[usize]>::to_vec)
                .collect(),
        )?
        .into_iter()
        .flatten()
        .collect();
    drop(bucket_counts);

    // rx_table is [source][partition], the adjacency is read [partition][source]
    let rx_starts = exclusive_sum(&rx_table);
    let by_partition = transpose_group_counts(&rx_table, major_comm_size, minor_comm_size);
    let mut tx_degrees = vec![Vec::new(); major_comm_size];
    let mut tx_indices = vec![Vec::new(); major_comm_size];
    let mut tx_values = vec![Vec::new(); major_comm_size];
    for i in 0..minor_comm_size {
        let batch: Vec<VId> = (0..major_comm_size)
            .flat_map(|src| {
                let start = rx_starts[src * minor_comm_size + i];
                rx_vertices[start..start + by_partition[i * major_comm_size + src]]
                    .iter()
                    .copied()
            })
            .collect();
        let (degrees, indices, values) = gather_adjacency(
            graph_view.edge_partition(i),
            edge_property.map(|p| p.values(i)),
            &batch,
        )?;
        let (mut degrees, mut indices, mut values) =
            (degrees.as_slice(), indices.as_slice(), values.as_slice());
        for src in 0..major_comm_size {
            let (head, rest) = degrees.split_at(by_partition[i * major_comm_size + src]);
            let num_edges: usize = head.iter().sum();
            tx_degrees[src].extend_from_slice(head);
            degrees = rest;
            let (head, rest) = indices.split_at(num_edges);
            tx_indices[src].extend_from_slice(head);
            indices = rest;
            if edge_property.is_some() {
                let (head, rest) = values.split_at(num_edges);
                tx_values[src].extend_from_slice(head);
                values = rest;
            }
        }
    }
    drop(rx_vertices);

    let degrees: Vec<usize> = major_comm
        .all_to_all_v(tx_degrees)?
        .into_iter()
        .flatten()
        .collect();
    let indices: Vec<VId> = major_comm
        .all_to_all_v(tx_indices)?
        .into_iter()
        .flatten()
        .collect();
    let values: Vec<P> = match edge_property {
        Some(_) => major_comm
            .all_to_all_v(tx_values)?
            .into_iter()
            .flatten()
            .collect(),
        None => Vec::new(),
    };
    debug_assert_eq!(degrees.len(), requested.len());
    debug!("received {} neighbors", indices.len());
    Ok(NeighborCache {
        kv_store: KvStore::new(&requested),
        offsets: exclusive_sum(&degrees),
        indices,
        values,
    })
}

/// Degrees, neighbors and (optionally) edge values of `batch`, read from one
/// local edge partition.
fn gather_adjacency<P>(
    partition: &EdgePartition,
    values: Option<&[P]>,
    batch: &[VId],
) -> Result<(Vec<usize>, Vec<VId>, Vec<P>)>
where
    P: Copy + Send + Sync,
{
    let degrees: Vec<usize> = batch.par_iter().map(|&v| partition.degree(v)).collect();
    let num_edges = degrees.iter().sum();
    let mut indices = try_with_capacity(num_edges)?;
    indices.par_extend(
        batch
            .par_iter()
            .flat_map_iter(|&v| partition.local_edges(v).0.iter().copied()),
    );
    let mut gathered = Vec::new();
    if let Some(values) = values {
        gathered = try_with_capacity(num_edges)?;
        gathered.par_extend(batch.par_iter().flat_map_iter(|&v| {
            let (_, offset, degree) = partition.local_edges(v);
            values[offset..offset + degree].iter().copied()
        }));
    }
    Ok((degrees, indices, gathered))
}
