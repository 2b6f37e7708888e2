use std::future::Future;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use io_uring::squeue::Entry;

use crate::driver::{self, CqeResult, Driver, Lifecycle};

mod accept;
mod close;
mod connect;
mod fsetxattr;
mod read;
mod readv;
mod recv;
mod send;
mod send_to;
mod shutdown;
mod write;
mod writev;

pub(crate) use accept::Accept;
pub(crate) use close::Close;
pub(crate) use connect::{Connect, Connecting};
pub(crate) use fsetxattr::Fsetxattr;
pub(crate) use read::Read;
pub(crate) use readv::Readv;
pub(crate) use recv::Recv;
pub(crate) use send::Send;
pub(crate) use send_to::SendTo;
pub(crate) use shutdown::Shutdown;
pub(crate) use write::Write;
pub(crate) use writev::Writev;

/// One in-flight asynchronous request.
///
/// The payload `T` owns every buffer and address the kernel may read or
/// write while the request is in flight. Anything a raw pointer in the
/// submission entry refers to must live on the heap (`Vec`, `Box`) inside
/// the payload: the `Op` itself moves freely between the caller's stack and
/// the driver slab, but heap memory stays put.
pub(crate) struct Op<T: 'static> {
    driver: Driver,
    key: usize,
    data: Option<T>,
}

/// Resolution step of the operation protocol: interprets the raw completion
/// value for one concrete request shape.
pub(crate) trait Completable {
    type Output;

    fn complete(self, cqe: CqeResult) -> Self::Output;
}

impl<T> Op<T> {
    /// Hands the submission entry to the current driver and ties the payload
    /// to the returned completion slot.
    pub(crate) fn submit(data: T, entry: Entry) -> io::Result<Op<T>> {
        driver::CURRENT.with(|driver| {
            let key = driver.submit(entry)?;
            Ok(Op {
                driver: driver.clone(),
                key,
                data: Some(data),
            })
        })
    }
}

impl<T> Future for Op<T>
where
    T: Completable + Unpin,
{
    type Output = T::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = &mut *self;
        let mut inner = me.driver.inner.borrow_mut();
        let state = mem::replace(&mut inner.ops[me.key], Lifecycle::Submitted);

        match state {
            Lifecycle::Submitted => {
                inner.ops[me.key] = Lifecycle::Waiting(cx.waker().clone());
                Poll::Pending
            }
            Lifecycle::Waiting(waker) => {
                if !waker.will_wake(cx.waker()) {
                    inner.ops[me.key] = Lifecycle::Waiting(cx.waker().clone());
                } else {
                    inner.ops[me.key] = Lifecycle::Waiting(waker);
                }
                Poll::Pending
            }
            Lifecycle::Completed(cqe) => {
                inner.ops.remove(me.key);
                drop(inner);
                let data = me.data.take().expect("op resolved twice");
                Poll::Ready(data.complete(cqe))
            }
            Lifecycle::Ignored(..) => unreachable!("in-flight op still owned and ignored"),
        }
    }
}

impl<T> Drop for Op<T> {
    fn drop(&mut self) {
        let data = match self.data.take() {
            Some(data) => data,
            None => return,
        };
        let mut inner = self.driver.inner.borrow_mut();
        match inner.ops.get(self.key) {
            None => {}
            Some(Lifecycle::Completed(..)) => {
                inner.ops.remove(self.key);
            }
            // The kernel may still write into the payload's buffers; park it
            // in the slab until the completion event drains.
            Some(_) => {
                log::trace!("op {} dropped while in flight", self.key);
                inner.ops[self.key] = Lifecycle::Ignored(Box::new(data));
            }
        }
    }
}
