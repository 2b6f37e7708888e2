use std::any::Any;
use std::cell::RefCell;
use std::io;
use std::mem;
use std::rc::Rc;
use std::task::Waker;

use io_uring::{squeue::Entry, IoUring};
use scoped_tls::scoped_thread_local;
use slab::Slab;

mod op;

pub(crate) use op::{
    Accept, Close, Completable, Connect, Connecting, Fsetxattr, Op, Read, Readv, Recv, Send,
    SendTo, Shutdown, Write, Writev,
};

scoped_thread_local!(static CURRENT: Driver);

/// Handle to the submission/completion machinery shared by every in-flight
/// operation on this thread.
#[derive(Clone)]
pub(crate) struct Driver {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    ring: IoUring,
    ops: Slab<Lifecycle>,
}

/// The per-submission completion slot. Written exactly once by the driver
/// when the matching completion event is drained, read exactly once by the
/// operation's resolution step.
enum Lifecycle {
    /// Submitted to the kernel, not yet polled by the owning future.
    Submitted,
    /// The owning future polled and went to sleep.
    Waiting(Waker),
    /// The kernel reported completion.
    Completed(CqeResult),
    /// The owning future was dropped while the request was in flight; the
    /// payload (and any kernel-visible buffers it owns) is parked here until
    /// the completion arrives.
    Ignored(Box<dyn Any>),
}

/// Raw kernel result of one completed submission, already split along the
/// sign of the value: non-negative values are the per-operation payload,
/// negative values are negated errno codes.
pub(crate) struct CqeResult {
    pub(crate) result: io::Result<i32>,
}

impl CqeResult {
    pub(crate) fn new(res: i32) -> CqeResult {
        let result = if res >= 0 {
            Ok(res)
        } else {
            Err(io::Error::from_raw_os_error(-res))
        };
        CqeResult { result }
    }
}

impl Driver {
    pub(crate) fn new(entries: u32) -> io::Result<Driver> {
        let ring = IoUring::new(entries)?;

        // check if IORING_FEAT_FAST_POLL is supported
        if !ring.params().is_feature_fast_poll() {
            panic!("IORING_FEAT_FAST_POLL not supported");
        }

        Ok(Driver {
            inner: Rc::new(RefCell::new(Inner {
                ring,
                ops: Slab::new(),
            })),
        })
    }

    pub(crate) fn with<T>(&self, f: impl FnOnce() -> T) -> T {
        CURRENT.set(self, f)
    }

    /// Submits one request and returns the key of its completion slot.
    pub(crate) fn submit(&self, entry: Entry) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        let key = inner.ops.insert(Lifecycle::Submitted);
        let entry = entry.user_data(key as u64);

        if inner.ring.submission().is_full() {
            inner.ring.submit()?;
        }
        if unsafe { inner.ring.submission().push(&entry) }.is_err() {
            inner.ops.remove(key);
            return Err(crate::other("submission queue full"));
        }
        inner.ring.submit()?;
        Ok(key)
    }

    /// Blocks until at least one completion event arrives, then drains the
    /// completion queue, writing each result into its slot.
    pub(crate) fn wait(&self) -> io::Result<()> {
        let mut wakers = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            inner.ring.submit_and_wait(1)?;

            let mut cq = inner.ring.completion();
            cq.sync();

            for cqe in cq {
                let key = cqe.user_data() as usize;
                if !inner.ops.contains(key) {
                    continue;
                }
                let slot = &mut inner.ops[key];
                match mem::replace(slot, Lifecycle::Completed(CqeResult::new(cqe.result()))) {
                    Lifecycle::Submitted => {}
                    Lifecycle::Waiting(waker) => wakers.push(waker),
                    Lifecycle::Ignored(..) => {
                        inner.ops.remove(key);
                    }
                    Lifecycle::Completed(..) => {
                        log::trace!("duplicate completion event for key {}", key);
                    }
                }
            }
        }

        for waker in wakers {
            waker.wake();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CqeResult;

    #[test]
    fn cqe_result_splits_on_sign() {
        assert_eq!(CqeResult::new(17).result.unwrap(), 17);
        assert_eq!(CqeResult::new(0).result.unwrap(), 0);

        let err = CqeResult::new(-libc::ECONNRESET).result.unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECONNRESET));
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
    }
}
