//! Various types shared by the graph, the runtime and the intersection.

/// The vertex id type.
pub type VId = i64;

/// A `(first, second)` query pair.
pub type VertexPair = (VId, VId);

/// Filler for over-allocated output slots. Never a real vertex id.
pub const INVALID_VERTEX: VId = VId::MAX;

/// Which neighbor set of a pair element takes part in the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
}
