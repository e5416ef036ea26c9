use super::NeighborCache;
use crate::{
    error::{try_filled, Result},
    graph::{EdgePartition, EdgeProperty, GraphView},
    tools::exclusive_sum,
    types::{VId, VertexPair, INVALID_VERTEX},
};
use rayon::prelude::*;
use std::cmp::Ordering;

/// A resolved adjacency list and its edge values.
///
/// `values` is empty when no edge property takes part in the call.
#[derive(Debug)]
pub(crate) struct Span<'a, P> {
    pub nbrs: &'a [VId],
    pub values: &'a [P],
}

impl<'a, P> Clone for Span<'a, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, P> Copy for Span<'a, P> {}

impl<'a, P> Span<'a, P> {
    pub fn empty() -> Self {
        Span {
            nbrs: &[],
            values: &[],
        }
    }

    /// The value of the edge to `nbr`, which must be in the span.
    fn value_of(&self, nbr: VId) -> P
    where
        P: Copy,
    {
        self.values[self.nbrs.partition_point(|&x| x < nbr)]
    }
}

pub(crate) fn partition_span<'a, P>(
    partition: &'a EdgePartition,
    values: Option<&'a [P]>,
    v: VId,
) -> Span<'a, P> {
    let (nbrs, offset, degree) = partition.local_edges(v);
    let values = match values {
        Some(values) => &values[offset..offset + degree],
        None => &[],
    };
    Span { nbrs, values }
}

/// Where the adjacency of the second pair element comes from, chosen once per call.
pub enum LookupStrategy<'a, P> {
    /// Straight from the local edge partitions.
    Local(&'a GraphView, Option<&'a EdgeProperty<P>>),
    /// From neighbor lists fetched from the owning processes.
    CachedMap(&'a NeighborCache<P>),
}

impl<'a, P> LookupStrategy<'a, P> {
    pub(crate) fn span(&self, v: VId) -> Span<'a, P> {
        match *self {
            LookupStrategy::Local(graph_view, edge_property) => graph_view
                .find_edge_partition(v)
                .map_or(Span::empty(), |i| {
                    partition_span(
                        graph_view.edge_partition(i),
                        edge_property.map(|p| p.values(i)),
                        v,
                    )
                }),
            LookupStrategy::CachedMap(cache) => cache.span(v),
        }
    }
}

/// Per pair sizes with the surviving ids (and values) flattened in pair order.
#[derive(Debug)]
pub(crate) struct PartialIntersection<P> {
    pub sizes: Vec<usize>,
    pub indices: Vec<VId>,
    pub properties: Option<(Vec<P>, Vec<P>)>,
}

/// Intersects the adjacency of `first(a)` and `second(b)` for every pair `(a, b)`.
///
/// Every pair gets a slot of `min(degree(a), degree(b))` entries; the tail a
/// slot does not use holds `INVALID_VERTEX` until compaction.
pub(crate) fn intersect_pairs<'a, P, F, S>(
    pairs: &[VertexPair],
    first: F,
    second: S,
    with_properties: bool,
    chunk_size: usize,
) -> Result<PartialIntersection<P>>
where
    P: Copy + Send + Sync + 'a,
    F: Fn(VId) -> Span<'a, P> + Sync,
    S: Fn(VId) -> Span<'a, P> + Sync,
{
    let reserved: Vec<usize> = pairs
        .par_iter()
        .map(|&(a, b)| first(a).nbrs.len().min(second(b).nbrs.len()))
        .collect();
    let mut slots = try_filled(reserved.iter().sum(), INVALID_VERTEX)?;
    let sizes: Vec<usize> = split_by_sizes_mut(&mut slots, &reserved)
        .into_par_iter()
        .zip(pairs.par_iter())
        .map(|(slot, &(a, b))| merge_intersect(first(a).nbrs, second(b).nbrs, slot))
        .collect();
    drop(reserved);
    let indices = compact_in_chunks(slots, chunk_size);
    let properties =
        with_properties.then(|| lookup_properties(pairs, &sizes, &indices, &first, &second));
    Ok(PartialIntersection {
        sizes,
        indices,
        properties,
    })
}

/// Writes `a ∩ b` to the front of `out` and fills the rest with `INVALID_VERTEX`.
pub(crate) fn merge_intersect(a: &[VId], b: &[VId], out: &mut [VId]) -> usize {
    let (mut i, mut j, mut k) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out[k] = a[i];
                k += 1;
                i += 1;
                j += 1;
            }
        }
    }
    out[k..].fill(INVALID_VERTEX);
    k
}

/// Removes `INVALID_VERTEX` entries in place, `chunk_size` elements at a time.
///
/// The scratch space of one step never exceeds a chunk, however large `values` is.
pub(crate) fn compact_in_chunks(mut values: Vec<VId>, chunk_size: usize) -> Vec<VId> {
    let chunk_size = chunk_size.max(1);
    let (mut len, mut begin) = (0, 0);
    while begin < values.len() {
        let end = (begin + chunk_size).min(values.len());
        let kept: Vec<VId> = values[begin..end]
            .par_iter()
            .copied()
            .filter(|&v| v != INVALID_VERTEX)
            .collect();
        values[len..len + kept.len()].copy_from_slice(&kept);
        len += kept.len();
        begin = end;
    }
    values.truncate(len);
    values.shrink_to_fit();
    values
}

fn lookup_properties<'a, P, F, S>(
    pairs: &[VertexPair],
    sizes: &[usize],
    indices: &[VId],
    first: &F,
    second: &S,
) -> (Vec<P>, Vec<P>)
where
    P: Copy + Send + Sync + 'a,
    F: Fn(VId) -> Span<'a, P> + Sync,
    S: Fn(VId) -> Span<'a, P> + Sync,
{
    let offsets = exclusive_sum(sizes);
    pairs
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, &(a, b))| {
            let (span_a, span_b) = (first(a), second(b));
            indices[offsets[i]..offsets[i + 1]]
                .iter()
                .map(move |&nbr| (span_a.value_of(nbr), span_b.value_of(nbr)))
        })
        .unzip()
}

fn split_by_sizes_mut<'b, T>(mut buf: &'b mut [T], sizes: &[usize]) -> Vec<&'b mut [T]> {
    let mut parts = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let (head, tail) = std::mem::take(&mut buf).split_at_mut(size);
        parts.push(head);
        buf = tail;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span<'a>(nbrs: &'a [VId], values: &'a [f32]) -> Span<'a, f32> {
        Span { nbrs, values }
    }

    #[test]
    fn test_merge_intersect() {
        let mut out = [0; 3];
        assert_eq!(merge_intersect(&[1, 3, 5, 7], &[0, 3, 4, 7], &mut out), 2);
        assert_eq!(out, [3, 7, INVALID_VERTEX]);
        let mut out: [VId; 0] = [];
        assert_eq!(merge_intersect(&[], &[1, 2], &mut out), 0);
    }

    #[test]
    fn test_compact_in_chunks() {
        let x = INVALID_VERTEX;
        let values = vec![1, x, x, 2, 3, x, x, x, 4, x, 5];
        for chunk_size in [1, 2, 3, 4, 100] {
            assert_eq!(compact_in_chunks(values.clone(), chunk_size), vec![1, 2, 3, 4, 5]);
        }
        assert!(compact_in_chunks(vec![x, x], 1).is_empty());
    }

    #[test]
    fn test_intersect_pairs() {
        let adjacency: [&[VId]; 4] = [&[1, 2], &[0, 2], &[0, 1, 3], &[2]];
        let lookup = |v: VId| span(adjacency[v as usize], &[]);
        let pairs = [(0, 1), (0, 2), (1, 2), (2, 2), (2, 3)];
        let result = intersect_pairs(&pairs, lookup, lookup, false, 2).unwrap();
        assert_eq!(result.sizes, vec![1, 1, 1, 3, 0]);
        assert_eq!(result.indices, vec![2, 1, 0, 0, 1, 3]);
        assert!(result.properties.is_none());
    }

    #[test]
    fn test_intersect_pairs_with_properties() {
        // value of edge (u, v) is 10 * u + v
        let nbrs: [&[VId]; 3] = [&[1, 2], &[0, 2], &[0, 1]];
        let values: [&[f32]; 3] = [&[1.0, 2.0], &[10.0, 12.0], &[20.0, 21.0]];
        let lookup = |v: VId| span(nbrs[v as usize], values[v as usize]);
        let result = intersect_pairs(&[(0, 1), (1, 2)], lookup, lookup, true, 8).unwrap();
        assert_eq!(result.indices, vec![2, 0]);
        assert_eq!(
            result.properties,
            Some((vec![2.0, 10.0], vec![12.0, 20.0]))
        );
    }
}
