use super::{
    edge_partition::{EdgePartition, Hypersparse},
    EdgeProperty, GraphView,
};
use crate::{
    error::{Error, Result},
    router::Router,
    tools::{exclusive_sum, GroupBy},
    types::{VId, VertexPair},
};
use log::{debug, info};
use rayon::prelude::*;

/// Lays an edge list out as the shards of a `major x minor` process grid.
///
/// Vertices are split into `major * minor` contiguous vertex partitions of equal
/// size. Parallel edges are dropped, keeping the first occurrence.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    number_of_vertices: VId,
    major_comm_size: usize,
    minor_comm_size: usize,
    symmetrize: bool,
    transposed: bool,
    hypersparse_threshold: Option<usize>,
}

impl GraphBuilder {
    pub fn new(number_of_vertices: VId) -> Self {
        Self {
            number_of_vertices,
            major_comm_size: 1,
            minor_comm_size: 1,
            symmetrize: false,
            transposed: false,
            hypersparse_threshold: None,
        }
    }

    pub fn grid(mut self, major_comm_size: usize, minor_comm_size: usize) -> Self {
        self.major_comm_size = major_comm_size;
        self.minor_comm_size = minor_comm_size;
        self
    }

    /// Stores every edge in both directions and marks the graph symmetric.
    pub fn symmetrize(mut self, symmetrize: bool) -> Self {
        self.symmetrize = symmetrize;
        self
    }

    /// Uses destinations as majors, so shards hold incoming adjacency.
    pub fn transposed(mut self, transposed: bool) -> Self {
        self.transposed = transposed;
        self
    }

    /// Majors at offset `threshold` or beyond within their partition go to the
    /// hypersparse segment.
    pub fn hypersparse_threshold(mut self, threshold: Option<usize>) -> Self {
        self.hypersparse_threshold = threshold;
        self
    }

    /// Builds one `(GraphView, EdgeProperty)` per process, indexed by global rank.
    pub fn build<P>(&self, edges: Vec<(VId, VId, P)>) -> Result<Vec<(GraphView, EdgeProperty<P>)>>
    where
        P: Copy + Send,
    {
        let (major_comm_size, minor_comm_size) = (self.major_comm_size, self.minor_comm_size);
        if major_comm_size == 0 || minor_comm_size == 0 {
            return Err(Error::InvalidGrid(major_comm_size, minor_comm_size));
        }
        let in_range = |v: VId| 0 <= v && v < self.number_of_vertices;
        if let Some(&(src, dst, _)) = edges.iter().find(|e| !in_range(e.0) || !in_range(e.1)) {
            return Err(Error::InvalidVertex(if in_range(src) { dst } else { src }));
        }
        let comm_size = major_comm_size * minor_comm_size;
        let lasts = vertex_partition_range_lasts(self.number_of_vertices, comm_size);
        let router = Router::new(&lasts, major_comm_size, minor_comm_size);
        info!(
            "partitioning {} edges over a {}x{} grid...",
            edges.len(),
            major_comm_size,
            minor_comm_size
        );
        let mut shards: Vec<Vec<Vec<(VId, VId, P)>>> = (0..comm_size)
            .map(|_| (0..minor_comm_size).map(|_| Vec::new()).collect())
            .collect();
        let reversed: Vec<_> = if self.symmetrize {
            edges.iter().map(|&(src, dst, value)| (dst, src, value)).collect()
        } else {
            Vec::new()
        };
        for (src, dst, value) in edges.into_iter().chain(reversed) {
            let (major, minor) = if self.transposed {
                (dst, src)
            } else {
                (src, dst)
            };
            shards[router.comm_rank_of_edge(major, minor)][router.local_edge_partition_index(major)]
                .push((major, minor, value));
        }
        let views = shards
            .into_iter()
            .enumerate()
            .map(|(rank, partitions)| {
                let (major_comm_rank, minor_comm_rank) =
                    (rank % major_comm_size, rank / major_comm_size);
                let (edge_partitions, values): (Vec<_>, Vec<_>) = partitions
                    .into_iter()
                    .enumerate()
                    .map(|(i, arcs)| {
                        let id = i * major_comm_size + major_comm_rank;
                        let first = if id == 0 { 0 } else { lasts[id - 1] };
                        self.build_partition((first, lasts[id]), arcs)
                    })
                    .unzip();
                debug!(
                    "rank {} holds {} edges",
                    rank,
                    edge_partitions
                        .iter()
                        .map(EdgePartition::number_of_edges)
                        .sum::<usize>()
                );
                (
                    GraphView {
                        number_of_vertices: self.number_of_vertices,
                        vertex_partition_range_lasts: lasts.clone(),
                        major_comm_size,
                        minor_comm_size,
                        major_comm_rank,
                        minor_comm_rank,
                        edge_partitions,
                        is_symmetric: self.symmetrize,
                        is_storage_transposed: self.transposed,
                    },
                    EdgeProperty::new(values),
                )
            })
            .collect();
        info!("partitioned");
        Ok(views)
    }

    /// Builds an unweighted graph; its edge property is zero-sized.
    pub fn build_unweighted(
        &self,
        edges: Vec<(VId, VId)>,
    ) -> Result<Vec<(GraphView, EdgeProperty<()>)>> {
        self.build(edges.into_iter().map(|(src, dst)| (src, dst, ())).collect())
    }

    fn build_partition<P>(
        &self,
        major_range: (VId, VId),
        mut arcs: Vec<(VId, VId, P)>,
    ) -> (EdgePartition, Vec<P>)
    where
        P: Copy + Send,
    {
        arcs.par_sort_by_key(|&(major, minor, _)| (major, minor));
        arcs.dedup_by_key(|&mut (major, minor, _)| (major, minor));
        let (first, last) = major_range;
        let range_len = (last - first) as usize;
        let dense_len = self
            .hypersparse_threshold
            .map_or(range_len, |threshold| threshold.min(range_len));
        let hypersparse_first = first + dense_len as VId;
        let mut degrees = vec![0; dense_len];
        let (mut hypersparse_majors, mut hypersparse_degrees) = (Vec::new(), Vec::new());
        for (major, row) in GroupBy::new(&arcs, |arc| arc.0) {
            if major < hypersparse_first {
                degrees[(major - first) as usize] = row.len();
            } else {
                hypersparse_majors.push(major);
                hypersparse_degrees.push(row.len());
            }
        }
        degrees.extend(hypersparse_degrees);
        let hypersparse = self.hypersparse_threshold.map(|_| Hypersparse {
            first: hypersparse_first,
            majors: hypersparse_majors,
        });
        let partition = EdgePartition::new(
            major_range,
            exclusive_sum(&degrees),
            arcs.iter().map(|arc| arc.1).collect(),
            hypersparse,
        );
        (partition, arcs.into_iter().map(|arc| arc.2).collect())
    }
}

fn vertex_partition_range_lasts(number_of_vertices: VId, comm_size: usize) -> Vec<VId> {
    (1..=comm_size as VId)
        .map(|k| number_of_vertices * k / comm_size as VId)
        .collect()
}

/// Routes each query pair to the rank it must be issued on.
///
/// Every returned list is sorted and carries the position of the pair in `pairs`.
pub fn partition_vertex_pairs(
    router: Router<'_>,
    pairs: &[VertexPair],
) -> Vec<Vec<(usize, VertexPair)>> {
    let mut partitioned = vec![Vec::new(); router.num_buckets()];
    for (idx, &pair) in pairs.iter().enumerate() {
        partitioned[router.comm_rank_of_pair(pair)].push((idx, pair));
    }
    for local in partitioned.iter_mut() {
        local.sort_by_key(|&(idx, pair)| (pair, idx));
    }
    partitioned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_partition() {
        let shards = GraphBuilder::new(4)
            .symmetrize(true)
            .build_unweighted(vec![(0, 1), (0, 2), (1, 2), (2, 3), (1, 0)])
            .unwrap();
        assert_eq!(shards.len(), 1);
        let (graph_view, _) = &shards[0];
        assert!(!graph_view.is_multi_gpu());
        let partition = graph_view.edge_partition(0);
        assert_eq!(partition.number_of_edges(), 8);
        assert_eq!(partition.local_edges(2).0, &[0, 1, 3]);
        assert_eq!(partition.degree(3), 1);
    }

    #[test]
    fn test_grid_placement() {
        // 2x2 grid, vertex partitions [0, 2), [2, 4), [4, 6), [6, 8)
        let edges = vec![(0, 5, 1.0), (4, 1, 2.0), (7, 6, 3.0), (2, 3, 4.0)];
        let shards = GraphBuilder::new(8).grid(2, 2).build(edges).unwrap();
        assert_eq!(shards.len(), 4);
        // (0, 5): major partition 0 -> major rank 0, edge partition 0; minor partition 2 -> minor rank 1
        let (view, values) = &shards[2];
        assert_eq!(view.edge_partition(0).local_edges(0).0, &[5]);
        assert_eq!(values.values(0), &[1.0]);
        assert_eq!(view.local_minor_range(), (4, 8));
        // (7, 6): major partition 3 -> major rank 1, edge partition 1; minor rank 1
        let (view, values) = &shards[3];
        assert_eq!(view.edge_partition(1).major_range(), (6, 8));
        assert_eq!(view.edge_partition(1).local_edges(7).0, &[6]);
        assert_eq!(values.values(1), &[3.0]);
        // (2, 3): major partition 1 -> major rank 1, edge partition 0; minor rank 0
        let (view, _) = &shards[1];
        assert_eq!(view.find_edge_partition(3), Some(0));
        assert_eq!(view.find_edge_partition(4), None);
        assert_eq!(view.find_edge_partition(-1), None);
        assert_eq!(view.find_edge_partition(8), None);
        assert_eq!(shards[3].0.find_edge_partition(7), Some(1));
        assert_eq!(view.edge_partition(0).degree(2), 1);
    }

    #[test]
    fn test_hypersparse_layout() {
        let shards = GraphBuilder::new(6)
            .hypersparse_threshold(Some(2))
            .build_unweighted(vec![(0, 1), (4, 2), (4, 5), (1, 0)])
            .unwrap();
        let partition = shards[0].0.edge_partition(0);
        assert_eq!(partition.hypersparse_first(), Some(2));
        assert_eq!(partition.offsets(), &[0, 1, 2, 4]);
        assert_eq!(partition.local_edges(4).0, &[2, 5]);
        assert_eq!(partition.degree(3), 0);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            GraphBuilder::new(3).build_unweighted(vec![(0, 3)]).unwrap_err(),
            Error::InvalidVertex(3)
        );
        assert_eq!(
            GraphBuilder::new(3).grid(0, 2).build_unweighted(vec![]).unwrap_err(),
            Error::InvalidGrid(0, 2)
        );
    }

    #[test]
    fn test_partition_vertex_pairs() {
        let lasts = [2, 4, 6, 8];
        let router = Router::new(&lasts, 2, 2);
        let partitioned = partition_vertex_pairs(router, &[(5, 1), (0, 7), (0, 6), (2, 2)]);
        assert_eq!(partitioned[0], vec![(0, (5, 1))]);
        assert_eq!(partitioned[1], vec![(3, (2, 2))]);
        assert_eq!(partitioned[2], vec![(2, (0, 6)), (1, (0, 7))]);
        assert!(partitioned[3].is_empty());
    }
}
