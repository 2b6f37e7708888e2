use std::io;
use std::os::unix::io::RawFd;

use io_uring::{opcode, types};

use crate::driver::{Completable, CqeResult, Op};

pub(crate) struct Writev {
    #[allow(dead_code)]
    bufs: Vec<Vec<u8>>,
    iovecs: Vec<libc::iovec>,
}

impl Writev {
    fn new(bufs: Vec<Vec<u8>>) -> Writev {
        let iovecs = bufs
            .iter()
            .map(|buf| libc::iovec {
                iov_base: buf.as_ptr() as *mut libc::c_void,
                iov_len: buf.len(),
            })
            .collect();
        Writev { bufs, iovecs }
    }
}

impl Op<Writev> {
    pub(crate) fn writev(fd: RawFd, bufs: Vec<Vec<u8>>) -> io::Result<Op<Writev>> {
        let writev = Writev::new(bufs);
        let entry = opcode::Writev::new(
            types::Fd(fd),
            writev.iovecs.as_ptr(),
            writev.iovecs.len() as u32,
        )
        .build();
        Op::submit(writev, entry)
    }
}

impl Completable for Writev {
    type Output = io::Result<usize>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        let n = cqe.result? as usize;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iovecs_match_buffer_bases_and_lengths() {
        let writev = Writev::new(vec![b"abc".to_vec(), b"defgh".to_vec(), b"ij".to_vec()]);
        assert_eq!(writev.iovecs.len(), 3);
        let lens: Vec<usize> = writev.iovecs.iter().map(|iovec| iovec.iov_len).collect();
        assert_eq!(lens, [3, 5, 2]);
        for (iovec, buf) in writev.iovecs.iter().zip(&writev.bufs) {
            assert_eq!(iovec.iov_base as *const u8, buf.as_ptr());
        }
    }
}
