use std::cell::RefCell;
use std::future::poll_fn;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use socket2::SockAddr;

use super::Socket;
use crate::driver::{self, Op};

pub(crate) struct Listener {
    inner: RefCell<Inner>,
    io: Socket,
}

impl Listener {
    pub(crate) fn new(io: Socket) -> Listener {
        Listener {
            io,
            inner: RefCell::new(Inner {
                accept: AcceptState::Idle,
            }),
        }
    }

    pub(crate) fn bind(addr: SockAddr) -> io::Result<Listener> {
        let socket = Socket::build_listener(addr)?;
        Ok(Listener::new(socket))
    }

    pub(crate) fn get_ref(&self) -> &Socket {
        &self.io
    }

    pub(crate) async fn accept(&self) -> io::Result<(Socket, SockAddr)> {
        poll_fn(|cx| self.poll_accept(cx)).await
    }

    pub(crate) fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(Socket, SockAddr)>> {
        self.inner.borrow_mut().poll_accept(cx, &self.io)
    }

    pub(crate) fn local_addr(&self) -> io::Result<SockAddr> {
        self.io.local_addr()
    }
}

struct Inner {
    accept: AcceptState,
}

enum AcceptState {
    Idle,
    Accepting(Op<driver::Accept>),
}

impl Inner {
    fn poll_accept(
        &mut self,
        cx: &mut Context<'_>,
        io: &Socket,
    ) -> Poll<io::Result<(Socket, SockAddr)>> {
        loop {
            match &mut self.accept {
                AcceptState::Idle => {
                    self.accept = AcceptState::Accepting(Op::accept(io.raw_fd())?);
                }
                AcceptState::Accepting(op) => {
                    let (socket, addr) = ready!(Pin::new(op).poll(cx))?;
                    self.accept = AcceptState::Idle;
                    return Poll::Ready(Ok((socket, addr)));
                }
            }
        }
    }
}
