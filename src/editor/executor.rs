//! UI-owned task queue
//!
//! Models the editor's single-threaded dispatch loop. [`UiExecutor::invoke_later`]
//! may be called from any thread; the editor owner drains the queue with
//! [`UiQueue::run_pending`]. Tasks queued while a cycle is running (including
//! tasks queued by other tasks) run in the next cycle, never re-entrantly inside
//! the current one.

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::host::Editor;

pub type UiTask = Box<dyn FnOnce(&mut Editor) + Send + 'static>;

struct Scheduled {
    name: String,
    task: UiTask,
}

/// Cloneable handle for scheduling work on the UI context
#[derive(Clone)]
pub struct UiExecutor {
    tx: mpsc::UnboundedSender<Scheduled>,
}

/// Receiving side, owned by whoever owns the [`Editor`]
pub struct UiQueue {
    rx: mpsc::UnboundedReceiver<Scheduled>,
}

impl UiExecutor {
    pub fn new() -> (Self, UiQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiQueue { rx })
    }

    /// The receiving [`UiQueue`] is gone; nothing scheduled will ever run
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queues `task` to run after the current dispatch cycle
    ///
    /// Returns `false` if the queue has been dropped (editor closed).
    pub fn invoke_later(
        &self,
        name: impl Into<String>,
        task: impl FnOnce(&mut Editor) + Send + 'static,
    ) -> bool {
        let name = name.into();
        trace!("Scheduling UI task '{}'", name);
        match self.tx.send(Scheduled {
            name,
            task: Box::new(task),
        }) {
            Ok(()) => true,
            Err(mpsc::error::SendError(scheduled)) => {
                warn!("UI queue closed; dropping task '{}'", scheduled.name);
                false
            }
        }
    }
}

impl std::fmt::Debug for UiExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiExecutor")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl UiQueue {
    /// Runs every task queued before this call
    ///
    /// # Returns
    /// Number of tasks executed in this cycle
    pub fn run_pending(&mut self, editor: &mut Editor) -> usize {
        let mut cycle = Vec::new();
        while let Ok(scheduled) = self.rx.try_recv() {
            cycle.push(scheduled);
        }

        let count = cycle.len();
        for Scheduled { name, task } in cycle {
            debug!("Running UI task '{}'", name);
            task(editor);
        }
        count
    }

    /// Runs cycles until the queue is empty
    pub fn run_until_idle(&mut self, editor: &mut Editor) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending(editor);
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Document;
    use url::Url;

    fn editor() -> Editor {
        Editor::new(Document::new(
            Url::parse("file:///tmp/q.txt").unwrap(),
            "text",
            "",
        ))
    }

    #[test]
    fn test_tasks_run_only_when_drained() {
        let (executor, mut queue) = UiExecutor::new();
        let mut ed = editor();
        executor.invoke_later("append", |ed| {
            ed.transact("append", |ed| ed.insert(0, "a").unwrap());
        });
        assert_eq!(ed.text().to_string(), "");
        assert_eq!(queue.run_pending(&mut ed), 1);
        assert_eq!(ed.text().to_string(), "a");
    }

    #[test]
    fn test_tasks_scheduled_by_tasks_run_next_cycle() {
        let (executor, mut queue) = UiExecutor::new();
        let mut ed = editor();
        let inner = executor.clone();
        executor.invoke_later("outer", move |ed| {
            ed.transact("outer", |ed| ed.insert(0, "1").unwrap());
            inner.invoke_later("inner", |ed| {
                let end = ed.text().len_chars();
                ed.transact("inner", |ed| ed.insert(end, "2").unwrap());
            });
        });

        assert_eq!(queue.run_pending(&mut ed), 1);
        assert_eq!(ed.text().to_string(), "1");
        assert_eq!(queue.run_pending(&mut ed), 1);
        assert_eq!(ed.text().to_string(), "12");
        assert_eq!(queue.run_until_idle(&mut ed), 0);
    }

    #[test]
    fn test_closed_queue_reports_failure() {
        let (executor, queue) = UiExecutor::new();
        assert!(!executor.is_closed());
        drop(queue);
        assert!(executor.is_closed());
        assert!(!executor.invoke_later("late", |_| {}));
    }
}
