#[macro_export]
macro_rules! pin_mut {
    ($($x:ident),* $(,)?) => { $(
        // Move the value to ensure that it is owned
        let mut $x = $x;
        // Shadow the original binding so that it can't be directly accessed
        // ever again.
        #[allow(unused_mut)]
        let mut $x = unsafe {
            std::pin::Pin::new_unchecked(&mut $x)
        };
    )* }
}

macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

use std::future::Future;
use std::io;

mod driver;
pub mod local_executor;
pub mod net;
pub mod runtime;
mod socket;
mod waker_fn;

pub use async_task::Task;

pub fn spawn_local<T: 'static>(future: impl Future<Output = T> + 'static) -> Task<T> {
    local_executor::spawn_local(future)
}

/// Runs a future to completion on a freshly built single-threaded runtime.
pub fn block_on<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    let rt = runtime::Runtime::new().expect("failed to build runtime");
    rt.block_on(future)
}

pub(crate) fn other(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, msg)
}
