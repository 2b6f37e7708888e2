use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use async_task::{Runnable, Task};
use scoped_tls::scoped_thread_local;

scoped_thread_local!(static CURRENT: LocalExecutor);

/// Single-threaded run queue for tasks spawned on this runtime.
pub struct LocalExecutor {
    queue: RefCell<VecDeque<Runnable>>,
    max_tasks_per_tick: usize,
}

pub fn spawn_local<T: 'static>(future: impl Future<Output = T> + 'static) -> Task<T> {
    if !CURRENT.is_set() {
        panic!("`spawn_local` called from outside of a runtime");
    }

    CURRENT.with(|local_executor| local_executor.spawn(future))
}

impl LocalExecutor {
    pub(crate) fn new(max_tasks_per_tick: usize) -> LocalExecutor {
        LocalExecutor {
            queue: RefCell::new(VecDeque::new()),
            max_tasks_per_tick,
        }
    }

    /// Runs up to one batch of ready tasks; returns whether the batch was
    /// exhausted (more tasks may be ready).
    pub(crate) fn tick(&self) -> bool {
        for _ in 0..self.max_tasks_per_tick {
            match self.next_task() {
                Some(task) => {
                    task.run();
                }
                None => return false,
            }
        }
        true
    }

    fn next_task(&self) -> Option<Runnable> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn spawn<T: 'static>(&self, future: impl Future<Output = T> + 'static) -> Task<T> {
        let schedule = |runnable| {
            CURRENT.with(|local_executor| {
                local_executor.queue.borrow_mut().push_back(runnable);
            });
        };

        let (runnable, task) = async_task::spawn_local(future, schedule);
        runnable.schedule();
        task
    }

    pub(crate) fn with<T>(&self, f: impl FnOnce() -> T) -> T {
        CURRENT.set(self, f)
    }
}
