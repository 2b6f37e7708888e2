use std::future::Future;
use std::io;
use std::task::{Context, Poll};

use crate::driver::Driver;
use crate::local_executor::LocalExecutor;
use crate::waker_fn::waker_fn;

const DEFAULT_RING_ENTRIES: u32 = 256;
const DEFAULT_MAX_TASKS_PER_TICK: usize = 64;

/// Tuning knobs for the runtime.
pub struct Builder {
    ring_entries: u32,
    max_tasks_per_tick: usize,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            ring_entries: DEFAULT_RING_ENTRIES,
            max_tasks_per_tick: DEFAULT_MAX_TASKS_PER_TICK,
        }
    }

    /// Size of the submission queue.
    pub fn ring_entries(mut self, entries: u32) -> Builder {
        self.ring_entries = entries;
        self
    }

    /// How many ready tasks run per executor tick before the driver is
    /// polled again.
    pub fn max_tasks_per_tick(mut self, n: usize) -> Builder {
        self.max_tasks_per_tick = n;
        self
    }

    pub fn build(self) -> io::Result<Runtime> {
        Ok(Runtime {
            local_executor: LocalExecutor::new(self.max_tasks_per_tick),
            driver: Driver::new(self.ring_entries)?,
        })
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

pub struct Runtime {
    local_executor: LocalExecutor,
    driver: Driver,
}

impl Runtime {
    pub fn new() -> io::Result<Runtime> {
        Builder::new().build()
    }

    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        pin_mut!(future);

        let waker = waker_fn(|| {});
        let cx = &mut Context::from_waker(&waker);

        self.driver.with(|| {
            self.local_executor.with(|| loop {
                if let Poll::Ready(output) = future.as_mut().poll(cx) {
                    return output;
                }

                if self.local_executor.tick() {
                    continue;
                }

                self.driver.wait().expect("driver wait error");
            })
        })
    }
}
