use std::future::Future;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use io_uring::{opcode, types};
use socket2::SockAddr;

use crate::driver::{Completable, CqeResult, Op};
use crate::socket::Socket;

pub(crate) struct Connect {
    /// Present when the operation owns the descriptor it is connecting
    /// (stream connect with lazy socket creation); on success it is handed
    /// back out, on failure it closes with the payload.
    socket: Option<Socket>,
    #[allow(dead_code)]
    sock_addr: Box<SockAddr>,
}

impl Op<Connect> {
    /// Connect on a descriptor the caller keeps (datagram sockets).
    pub(crate) fn connect(fd: RawFd, sock_addr: Box<SockAddr>) -> io::Result<Op<Connect>> {
        Op::submit_connect(fd, None, sock_addr)
    }

    /// Connect on a freshly created descriptor owned by the operation.
    pub(crate) fn connect_owned(socket: Socket, sock_addr: Box<SockAddr>) -> io::Result<Op<Connect>> {
        let fd = socket.raw_fd();
        Op::submit_connect(fd, Some(socket), sock_addr)
    }

    fn submit_connect(
        fd: RawFd,
        socket: Option<Socket>,
        sock_addr: Box<SockAddr>,
    ) -> io::Result<Op<Connect>> {
        let connect = Connect { socket, sock_addr };
        let entry = opcode::Connect::new(
            types::Fd(fd),
            connect.sock_addr.as_ptr(),
            connect.sock_addr.len(),
        )
        .build();
        Op::submit(connect, entry)
    }
}

impl Completable for Connect {
    type Output = io::Result<Option<Socket>>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        cqe.result?;
        Ok(self.socket)
    }
}

/// Stream connect with lazy socket creation.
///
/// The socket is created at the first poll, not at construction: when
/// creation fails the future resolves on the same turn with the error and
/// no request is ever submitted.
pub(crate) struct Connecting {
    state: State,
}

enum State {
    Idle(Box<SockAddr>),
    Connecting(Op<Connect>),
    Done,
}

impl Connecting {
    pub(crate) fn new(addr: SockAddr) -> Connecting {
        Connecting {
            state: State::Idle(Box::new(addr)),
        }
    }
}

impl Future for Connecting {
    type Output = io::Result<Socket>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        loop {
            match &mut me.state {
                State::Idle(..) => {
                    let addr = match mem::replace(&mut me.state, State::Done) {
                        State::Idle(addr) => addr,
                        _ => unreachable!(),
                    };
                    let socket = match Socket::build(addr.family().into(), libc::SOCK_STREAM) {
                        Ok(socket) => socket,
                        // Resolved without suspending; nothing was submitted.
                        Err(e) => return Poll::Ready(Err(e)),
                    };
                    me.state = State::Connecting(Op::connect_owned(socket, addr)?);
                }
                State::Connecting(op) => {
                    let socket = ready!(Pin::new(op).poll(cx))?;
                    me.state = State::Done;
                    return Poll::Ready(Ok(socket.expect("stream connect owns its socket")));
                }
                State::Done => panic!("polled after completion"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waker_fn::waker_fn;

    #[test]
    fn failed_socket_creation_resolves_without_submitting() {
        // A bogus address family makes socket creation fail before any
        // request reaches the driver; no driver is installed here, so a
        // submission attempt would panic the scoped-tls access.
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        // libc doesn't export `AF_MAX` for linux-gnu; use the largest
        // representable family, which is likewise past any valid family and
        // makes socket creation fail with EAFNOSUPPORT.
        storage.ss_family = libc::sa_family_t::MAX;
        let len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let addr = unsafe { SockAddr::new(storage, len) };

        let waker = waker_fn(|| {});
        let mut cx = Context::from_waker(&waker);
        let mut connecting = Connecting::new(addr);
        match Pin::new(&mut connecting).poll(&mut cx) {
            Poll::Ready(Err(err)) => {
                assert_eq!(err.raw_os_error(), Some(libc::EAFNOSUPPORT));
            }
            Poll::Ready(Ok(..)) => panic!("connect to nowhere succeeded"),
            Poll::Pending => panic!("suspended despite failed socket creation"),
        }
    }
}
