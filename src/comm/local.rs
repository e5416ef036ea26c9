use super::{Comm, Handle};
use crate::error::{Error, Result};
use std::{
    any::Any,
    sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError},
    thread,
};

type Slot = Option<Box<dyn Any + Send>>;

/// `slots[src * size + dst]` holds the buffer `src` sends to `dst`.
struct Mailbox {
    slots: Mutex<Vec<Slot>>,
    barrier: Barrier,
}

/// An in-process communicator whose ranks are threads.
#[derive(Clone)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl LocalComm {
    fn group(size: usize) -> Vec<LocalComm> {
        let mailbox = Arc::new(Mailbox {
            slots: Mutex::new((0..size * size).map(|_| None).collect()),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    /// Creates the handles of a `major x minor` grid, indexed by global rank.
    pub fn grid(major_comm_size: usize, minor_comm_size: usize) -> Result<Vec<Handle<LocalComm>>> {
        if major_comm_size == 0 || minor_comm_size == 0 {
            return Err(Error::InvalidGrid(major_comm_size, minor_comm_size));
        }
        let world = Self::group(major_comm_size * minor_comm_size);
        let major_comms: Vec<_> = (0..minor_comm_size)
            .map(|_| Self::group(major_comm_size))
            .collect();
        let minor_comms: Vec<_> = (0..major_comm_size)
            .map(|_| Self::group(minor_comm_size))
            .collect();
        Ok(world
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let (major_comm_rank, minor_comm_rank) =
                    (rank % major_comm_size, rank / major_comm_size);
                Handle::new(
                    comm,
                    major_comms[minor_comm_rank][major_comm_rank].clone(),
                    minor_comms[major_comm_rank][minor_comm_rank].clone(),
                )
            })
            .collect())
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.mailbox
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Handle<LocalComm> {
    /// A handle for a lone process.
    pub fn single() -> Self {
        let solo = || LocalComm::group(1).remove(0);
        Handle::new(solo(), solo(), solo())
    }
}

impl Comm for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_to_all_v<T>(&self, send: Vec<Vec<T>>) -> Result<Vec<Vec<T>>>
    where
        T: Clone + Send + 'static,
    {
        if send.len() != self.size {
            return Err(Error::CollectiveMismatch(self.rank));
        }
        if self.size == 1 {
            return Ok(send);
        }
        {
            let mut slots = self.slots();
            for (dst, buf) in send.into_iter().enumerate() {
                slots[self.rank * self.size + dst] = Some(Box::new(buf));
            }
        }
        self.mailbox.barrier.wait();
        let recv = {
            let mut slots = self.slots();
            (0..self.size)
                .map(|src| {
                    slots[src * self.size + self.rank]
                        .take()
                        .and_then(|buf| buf.downcast::<Vec<T>>().ok())
                        .map(|buf| *buf)
                })
                .collect::<Option<Vec<_>>>()
        };
        // slots are reused by the next collective
        self.mailbox.barrier.wait();
        recv.ok_or(Error::CollectiveMismatch(self.rank))
    }
}

/// Runs `f` on one thread per process and returns the results in global rank order.
pub fn run_spmd<F, R>(handles: &[Handle<LocalComm>], f: F) -> Vec<R>
where
    F: Fn(&Handle<LocalComm>) -> R + Sync,
    R: Send,
{
    let f = &f;
    thread::scope(|s| {
        let workers: Vec<_> = handles
            .iter()
            .map(|handle| s.spawn(move || f(handle)))
            .collect();
        workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{all_gather_flat, shuffle_values};

    #[test]
    fn test_grid_ranks() {
        let handles = LocalComm::grid(3, 2).unwrap();
        let ranks: Vec<_> = handles
            .iter()
            .map(|h| (h.comm().rank(), h.major_comm().rank(), h.minor_comm().rank()))
            .collect();
        assert_eq!(
            ranks,
            vec![
                (0, 0, 0),
                (1, 1, 0),
                (2, 2, 0),
                (3, 0, 1),
                (4, 1, 1),
                (5, 2, 1)
            ]
        );
        assert!(handles.iter().all(|h| h.major_comm().size() == 3));
        assert!(handles.iter().all(|h| h.minor_comm().size() == 2));
    }

    #[test]
    fn test_all_to_all() {
        let handles = LocalComm::grid(4, 1).unwrap();
        let received = run_spmd(&handles, |h| {
            let rank = h.comm().rank();
            let send = (0..4).map(|dst| vec![rank * 10 + dst; dst]).collect();
            h.comm().all_to_all_v(send).unwrap()
        });
        assert_eq!(received[2], vec![vec![2, 2], vec![12, 12], vec![22, 22], vec![32, 32]]);
        assert!(received[0].iter().all(Vec::is_empty));
    }

    #[test]
    fn test_sub_communicators() {
        let handles = LocalComm::grid(2, 2).unwrap();
        let results = run_spmd(&handles, |h| {
            let rank = h.comm().rank();
            let total = h.comm().all_reduce_sum(rank).unwrap();
            let (majors, _) = all_gather_flat(h.major_comm(), vec![rank]).unwrap();
            let (minors, _) = all_gather_flat(h.minor_comm(), vec![rank]).unwrap();
            (total, majors, minors)
        });
        assert!(results.iter().all(|r| r.0 == 6));
        assert_eq!(results[3].1, vec![2, 3]);
        assert_eq!(results[3].2, vec![1, 3]);
        assert_eq!(results[0].2, vec![0, 2]);
    }

    #[test]
    fn test_shuffle_values() {
        let handles = LocalComm::grid(2, 1).unwrap();
        let results = run_spmd(&handles, |h| {
            let rank = h.comm().rank() as i64;
            shuffle_values(h.comm(), vec![rank, rank + 10, rank + 20], &[1, 2]).unwrap()
        });
        assert_eq!(results[0], (vec![0, 1], vec![1, 1]));
        assert_eq!(results[1], (vec![10, 20, 11, 21], vec![2, 2]));
    }

    #[test]
    fn test_single() {
        let handle = Handle::single();
        assert!(!handle.is_multi_process());
        assert_eq!(handle.comm().all_gather_v(vec![1, 2]).unwrap(), vec![vec![1, 2]]);
        assert_eq!(
            handle.comm().all_to_all_v(vec![vec![1], vec![2]]).unwrap_err(),
            Error::CollectiveMismatch(0)
        );
    }
}
