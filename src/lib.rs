//! Distributed neighbor-set intersection over 2D-partitioned graphs.

pub mod comm;
pub mod error;
pub mod graph;
pub mod intersection;
pub mod kv_store;
pub mod loader;
pub mod router;
pub mod types;
pub mod validate;

pub(crate) mod tools;

pub use error::{Error, Result};
pub use intersection::{nbr_intersection, IntersectionTask, NbrIntersection};
