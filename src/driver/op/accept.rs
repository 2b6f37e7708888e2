use std::io;
use std::mem;
use std::os::unix::io::{FromRawFd, RawFd};

use io_uring::{opcode, types};
use socket2::SockAddr;

use crate::driver::{Completable, CqeResult, Op};
use crate::socket::Socket;

pub(crate) struct Accept {
    /// Storage the kernel fills with the peer address; pre-sized to the
    /// largest address any family can produce.
    socketaddr: Box<(libc::sockaddr_storage, libc::socklen_t)>,
}

impl Op<Accept> {
    pub(crate) fn accept(fd: RawFd) -> io::Result<Op<Accept>> {
        let mut socketaddr = Box::new((
            unsafe { mem::zeroed() },
            mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
        ));
        let entry = opcode::Accept::new(
            types::Fd(fd),
            &mut socketaddr.0 as *mut _ as *mut _,
            &mut socketaddr.1,
        )
        .flags(libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK)
        .build();
        Op::submit(Accept { socketaddr }, entry)
    }
}

impl Completable for Accept {
    type Output = io::Result<(Socket, SockAddr)>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        let fd = cqe.result?;
        let (storage, len) = *self.socketaddr;
        // The kernel-reported length is taken at face value.
        let addr = unsafe { SockAddr::new(storage, len) };
        Ok((unsafe { Socket::from_raw_fd(fd) }, addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_accept() -> Accept {
        Accept {
            socketaddr: Box::new((
                unsafe { mem::zeroed() },
                mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
            )),
        }
    }

    #[test]
    fn negative_result_surfaces_errno() {
        let err = pending_accept()
            .complete(CqeResult::new(-libc::ECONNRESET))
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ECONNRESET));
    }

    #[test]
    fn positive_result_is_the_new_descriptor() {
        let fd = syscall!(dup(0)).unwrap();
        let (socket, _addr) = pending_accept().complete(CqeResult::new(fd)).unwrap();
        assert_eq!(socket.raw_fd(), fd);
        // dropping `socket` closes the dup'd descriptor
    }
}
