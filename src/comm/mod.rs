//! Blocking collectives over a 2D process grid.
//!
//! Every call is a collective: all ranks of the communicator must issue the same
//! sequence of calls with consistent shapes, otherwise the grid stalls.

pub use local::{run_spmd, LocalComm};

use crate::error::Result;

mod local;

pub trait Comm: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Sends `send[dst]` to every `dst`; returns what each source sent here, indexed by source.
    fn all_to_all_v<T>(&self, send: Vec<Vec<T>>) -> Result<Vec<Vec<T>>>
    where
        T: Clone + Send + 'static;

    /// Returns the buffers of all ranks, indexed by rank.
    fn all_gather_v<T>(&self, send: Vec<T>) -> Result<Vec<Vec<T>>>
    where
        T: Clone + Send + 'static,
    {
        self.all_to_all_v(vec![send; self.size()])
    }

    fn all_reduce_sum(&self, value: usize) -> Result<usize> {
        Ok(self.all_gather_v(vec![value])?.into_iter().flatten().sum())
    }
}

/// The world communicator plus the two sub-communicators of the process grid.
///
/// The major communicator connects the processes sharing a minor rank, the
/// minor communicator those sharing a major rank. Global rank is
/// `minor_comm_rank * major_comm_size + major_comm_rank`.
pub struct Handle<C> {
    comm: C,
    major_comm: C,
    minor_comm: C,
}

impl<C: Comm> Handle<C> {
    pub fn new(comm: C, major_comm: C, minor_comm: C) -> Self {
        debug_assert_eq!(comm.size(), major_comm.size() * minor_comm.size());
        Self {
            comm,
            major_comm,
            minor_comm,
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn major_comm(&self) -> &C {
        &self.major_comm
    }

    pub fn minor_comm(&self) -> &C {
        &self.minor_comm
    }

    pub fn is_multi_process(&self) -> bool {
        self.comm.size() > 1
    }
}

/// Sends the first `counts[0]` values to rank 0, the next `counts[1]` to rank 1 and so on.
///
/// Returns the received values concatenated in source rank order, and how many
/// came from each source.
pub fn shuffle_values<C, T>(comm: &C, values: Vec<T>, counts: &[usize]) -> Result<(Vec<T>, Vec<usize>)>
where
    C: Comm,
    T: Clone + Send + 'static,
{
    debug_assert_eq!(counts.len(), comm.size());
    debug_assert_eq!(counts.iter().sum::<usize>(), values.len());
    let mut values = values.into_iter();
    let send = counts
        .iter()
        .map(|&count| values.by_ref().take(count).collect())
        .collect();
    let recv = comm.all_to_all_v(send)?;
    let rx_counts = recv.iter().map(Vec::len).collect();
    Ok((recv.into_iter().flatten().collect(), rx_counts))
}

/// All-gathers variable sized buffers into one, in rank order, with per-rank counts.
pub fn all_gather_flat<C, T>(comm: &C, values: Vec<T>) -> Result<(Vec<T>, Vec<usize>)>
where
    C: Comm,
    T: Clone + Send + 'static,
{
    let gathered = comm.all_gather_v(values)?;
    let counts = gathered.iter().map(Vec::len).collect();
    Ok((gathered.into_iter().flatten().collect(), counts))
}
