use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("workspace released out of order (expected head {expected}, actual {actual})")]
    ReleaseOutOfOrder { expected: usize, actual: usize },

    #[error("workspace exhausted: requested {requested}, available {available}")]
    Exhausted { requested: usize, available: usize },
}

/// Handle to a real-valued extent of the workspace arena.
#[derive(Debug)]
#[must_use = "workspace allocations must be released in LIFO order"]
pub struct RealAlloc {
    offset: usize,
    len: usize,
}

/// Handle to an integer extent of the workspace arena.
#[derive(Debug)]
#[must_use = "workspace allocations must be released in LIFO order"]
pub struct IntAlloc {
    offset: usize,
    len: usize,
}

/// Stack-discipline arena for transient per-node buffers.
///
/// Both stacks are sized once, at the peak requirement computed by the
/// symbolic phase, and never grow. Acquisitions must be released in reverse
/// order; a release whose extent does not end at the current head is a
/// scheduling bug and reported as `ReleaseOutOfOrder` rather than silently
/// corrupting later allocations.
#[derive(Debug)]
pub struct WorkspaceManager {
    reals: Vec<f64>,
    ints: Vec<usize>,
    real_head: usize,
    int_head: usize,
}

impl WorkspaceManager {
    pub fn new(nreals: usize, nints: usize) -> Self {
        Self {
            reals: vec![0.0; nreals],
            ints: vec![0; nints],
            real_head: 0,
            int_head: 0,
        }
    }

    /// Acquire `len` reals from the top of the stack. Contents are stale.
    pub fn acquire_reals(&mut self, len: usize) -> Result<RealAlloc, WorkspaceError> {
        if self.real_head + len > self.reals.len() {
            return Err(WorkspaceError::Exhausted {
                requested: len,
                available: self.reals.len() - self.real_head,
            });
        }
        let alloc = RealAlloc {
            offset: self.real_head,
            len,
        };
        self.real_head += len;
        Ok(alloc)
    }

    pub fn acquire_ints(&mut self, len: usize) -> Result<IntAlloc, WorkspaceError> {
        if self.int_head + len > self.ints.len() {
            return Err(WorkspaceError::Exhausted {
                requested: len,
                available: self.ints.len() - self.int_head,
            });
        }
        let alloc = IntAlloc {
            offset: self.int_head,
            len,
        };
        self.int_head += len;
        Ok(alloc)
    }

    pub fn reals_mut(&mut self, alloc: &RealAlloc) -> &mut [f64] {
        &mut self.reals[alloc.offset..alloc.offset + alloc.len]
    }

    /// Borrow a real and an integer extent at the same time. The two live in
    /// separate stacks, so one `&mut self` can hand out both.
    pub fn split_mut(
        &mut self,
        reals: &RealAlloc,
        ints: &IntAlloc,
    ) -> (&mut [f64], &mut [usize]) {
        (
            &mut self.reals[reals.offset..reals.offset + reals.len],
            &mut self.ints[ints.offset..ints.offset + ints.len],
        )
    }

    pub fn release_reals(&mut self, alloc: RealAlloc) -> Result<(), WorkspaceError> {
        if alloc.offset + alloc.len != self.real_head {
            return Err(WorkspaceError::ReleaseOutOfOrder {
                expected: self.real_head,
                actual: alloc.offset + alloc.len,
            });
        }
        self.real_head = alloc.offset;
        Ok(())
    }

    pub fn release_ints(&mut self, alloc: IntAlloc) -> Result<(), WorkspaceError> {
        if alloc.offset + alloc.len != self.int_head {
            return Err(WorkspaceError::ReleaseOutOfOrder {
                expected: self.int_head,
                actual: alloc.offset + alloc.len,
            });
        }
        self.int_head = alloc.offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifo_acquire_release() {
        let mut ws = WorkspaceManager::new(16, 8);
        let a = ws.acquire_reals(4).unwrap();
        let b = ws.acquire_reals(8).unwrap();
        ws.reals_mut(&b).fill(1.0);
        ws.reals_mut(&a).fill(2.0);
        ws.release_reals(b).unwrap();
        ws.release_reals(a).unwrap();

        // head is back at zero; full capacity available again
        let c = ws.acquire_reals(16).unwrap();
        ws.release_reals(c).unwrap();
    }

    #[test]
    fn out_of_order_release_is_detected() {
        let mut ws = WorkspaceManager::new(16, 8);
        let a = ws.acquire_reals(4).unwrap();
        let b = ws.acquire_reals(4).unwrap();
        assert_eq!(
            ws.release_reals(a),
            Err(WorkspaceError::ReleaseOutOfOrder {
                expected: 8,
                actual: 4,
            })
        );
        ws.release_reals(b).unwrap();
    }

    #[test]
    fn exhaustion_is_an_error() {
        let mut ws = WorkspaceManager::new(4, 0);
        let a = ws.acquire_reals(4).unwrap();
        assert!(matches!(
            ws.acquire_reals(1),
            Err(WorkspaceError::Exhausted { .. })
        ));
        assert!(matches!(
            ws.acquire_ints(1),
            Err(WorkspaceError::Exhausted { .. })
        ));
        ws.release_reals(a).unwrap();
    }

    #[test]
    fn int_stack_is_independent() {
        let mut ws = WorkspaceManager::new(4, 4);
        let r = ws.acquire_reals(4).unwrap();
        let i = ws.acquire_ints(4).unwrap();
        {
            let (reals, ints) = ws.split_mut(&r, &i);
            reals.fill(0.5);
            ints.fill(3);
        }
        ws.release_ints(i).unwrap();
        ws.release_reals(r).unwrap();
    }
}
