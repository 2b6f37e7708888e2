use std::io::{self, IoSlice};
use std::os::unix::io::RawFd;
use std::slice;

use io_uring::{opcode, types};
use socket2::SockAddr;

use crate::driver::{Completable, CqeResult, Op};

#[allow(dead_code)]
pub(crate) struct SendTo {
    buf: Vec<u8>,
    io_slices: Vec<IoSlice<'static>>,
    socket_addr: Box<SockAddr>,
    msghdr: Box<libc::msghdr>,
}

impl Op<SendTo> {
    pub(crate) fn send_to(fd: RawFd, buf: &[u8], socket_addr: SockAddr) -> io::Result<Op<SendTo>> {
        let len = buf.len();
        let buf = buf.to_vec();
        let mut io_slices = vec![IoSlice::new(unsafe {
            slice::from_raw_parts(buf.as_ptr(), len)
        })];
        let socket_addr = Box::new(socket_addr);
        let mut msghdr: Box<libc::msghdr> = Box::new(unsafe { std::mem::zeroed() });
        msghdr.msg_iov = io_slices.as_mut_ptr().cast();
        msghdr.msg_iovlen = io_slices.len() as _;
        msghdr.msg_name = socket_addr.as_ptr() as *mut libc::c_void;
        msghdr.msg_namelen = socket_addr.len();
        let send_to = SendTo {
            buf,
            io_slices,
            socket_addr,
            msghdr,
        };
        let entry = opcode::SendMsg::new(types::Fd(fd), send_to.msghdr.as_ref() as *const _)
            .flags(libc::MSG_NOSIGNAL as u32)
            .build();
        Op::submit(send_to, entry)
    }
}

impl Completable for SendTo {
    type Output = io::Result<usize>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        let n = cqe.result? as usize;
        Ok(n)
    }
}
