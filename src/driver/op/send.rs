use std::io;
use std::os::unix::io::RawFd;

use io_uring::{opcode, types};

use crate::driver::{Completable, CqeResult, Op};

pub(crate) struct Send {
    #[allow(dead_code)]
    buf: Vec<u8>,
}

impl Op<Send> {
    pub(crate) fn send(fd: RawFd, buf: &[u8], flags: libc::c_int) -> io::Result<Op<Send>> {
        let send = Send { buf: buf.to_vec() };
        let entry = opcode::Send::new(types::Fd(fd), send.buf.as_ptr(), send.buf.len() as u32)
            .flags(flags)
            .build();
        Op::submit(send, entry)
    }
}

impl Completable for Send {
    type Output = io::Result<usize>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        let n = cqe.result? as usize;
        Ok(n)
    }
}
