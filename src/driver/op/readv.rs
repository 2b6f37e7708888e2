use std::io;
use std::os::unix::io::RawFd;

use io_uring::{opcode, types};

use crate::driver::{Completable, CqeResult, Op};

pub(crate) struct Readv {
    bufs: Vec<Vec<u8>>,
    iovecs: Vec<libc::iovec>,
}

impl Readv {
    /// Builds one iovec per buffer, in order, spanning each buffer's full
    /// capacity. The iovec list and the buffers both live on the heap, so
    /// the payload may move while the request is in flight.
    fn new(mut bufs: Vec<Vec<u8>>) -> Readv {
        let iovecs = bufs
            .iter_mut()
            .map(|buf| libc::iovec {
                iov_base: buf.as_mut_ptr() as *mut libc::c_void,
                iov_len: buf.capacity(),
            })
            .collect();
        Readv { bufs, iovecs }
    }
}

impl Op<Readv> {
    pub(crate) fn readv(fd: RawFd, bufs: Vec<Vec<u8>>) -> io::Result<Op<Readv>> {
        let readv = Readv::new(bufs);
        let entry = opcode::Readv::new(
            types::Fd(fd),
            readv.iovecs.as_ptr(),
            readv.iovecs.len() as u32,
        )
        .build();
        Op::submit(readv, entry)
    }
}

impl Completable for Readv {
    type Output = io::Result<(usize, Vec<Vec<u8>>)>;

    fn complete(mut self, cqe: CqeResult) -> Self::Output {
        let n = cqe.result? as usize;
        // Scatter semantics: earlier buffers are filled to capacity before
        // later ones receive any bytes.
        let mut remaining = n;
        for buf in &mut self.bufs {
            let filled = remaining.min(buf.capacity());
            unsafe { buf.set_len(filled) };
            remaining -= filled;
        }
        Ok((n, self.bufs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bufs_with_capacities(caps: &[usize]) -> Vec<Vec<u8>> {
        caps.iter()
            .map(|&cap| {
                let mut buf = vec![0u8; cap];
                buf.clear();
                buf
            })
            .collect()
    }

    #[test]
    fn iovecs_span_all_buffers_in_order() {
        let readv = Readv::new(bufs_with_capacities(&[3, 5, 2]));
        assert_eq!(readv.iovecs.len(), 3);
        for (iovec, buf) in readv.iovecs.iter().zip(&readv.bufs) {
            assert_eq!(iovec.iov_base as *const u8, buf.as_ptr());
            assert_eq!(iovec.iov_len, buf.capacity());
        }
    }

    #[test]
    fn short_transfer_fills_in_list_order() {
        let readv = Readv::new(bufs_with_capacities(&[3, 5, 2]));
        let (n, bufs) = readv.complete(CqeResult::new(4)).unwrap();
        assert_eq!(n, 4);
        let lens: Vec<usize> = bufs.iter().map(Vec::len).collect();
        assert_eq!(lens, [3, 1, 0]);
    }

    #[test]
    fn full_transfer_fills_every_buffer() {
        let readv = Readv::new(bufs_with_capacities(&[3, 5, 2]));
        let (n, bufs) = readv.complete(CqeResult::new(10)).unwrap();
        assert_eq!(n, 10);
        let lens: Vec<usize> = bufs.iter().map(Vec::len).collect();
        assert_eq!(lens, [3, 5, 2]);
    }
}
