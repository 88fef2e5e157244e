// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`CallQueue`] implementation.

use alloc::collections::VecDeque;
use alloc::string::String;
use core::fmt;

use hashbrown::HashMap;

/// A queued unit of work.
///
/// The name identifies the task for duplicate suppression and for
/// [`CallQueue::dequeue`]; the payload is whatever the caller needs to
/// invoke the work (typically a callback plus its arguments).
pub struct Task<T> {
    /// The name the task was enqueued under.
    pub name: String,
    /// The caller-supplied payload.
    pub payload: T,
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered, reentrancy-guarded dispatch queue.
///
/// Tasks are yielded strictly in enqueue order. A task popped during a
/// drain may enqueue further tasks; those are appended and yielded by the
/// same drain, never executed via a nested call.
///
/// See the [crate docs](crate) for the drain protocol.
pub struct CallQueue<T> {
    tasks: VecDeque<Entry<T>>,
    /// Live (not yet popped, not cancelled) task counts by name.
    pending: HashMap<String, usize>,
    skip_duplicates: bool,
    draining: bool,
}

struct Entry<T> {
    task: Task<T>,
    cancelled: bool,
}

impl<T> CallQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            pending: HashMap::new(),
            skip_duplicates: false,
            draining: false,
        }
    }

    /// Creates an empty queue which suppresses duplicate task names.
    ///
    /// While a task with some name is pending, a second [`enqueue`]
    /// (`CallQueue::enqueue`) with the same name returns `false` without
    /// adding anything.
    #[must_use]
    pub fn with_skip_duplicates() -> Self {
        Self {
            skip_duplicates: true,
            ..Self::new()
        }
    }

    /// Returns the number of live (non-cancelled) queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.values().sum()
    }

    /// Returns `true` if no live tasks are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a drain is currently in progress.
    #[must_use]
    #[inline]
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Appends a task to the queue.
    ///
    /// Returns `false` if the queue was built with
    /// [`with_skip_duplicates`](Self::with_skip_duplicates) and a task with
    /// this name is already pending; the task is not added in that case.
    pub fn enqueue(&mut self, name: impl Into<String>, payload: T) -> bool {
        let name = name.into();

        if self.skip_duplicates && self.pending.get(&name).is_some_and(|&n| n > 0) {
            log::debug!("skipping duplicate task {name}");
            return false;
        }

        log::debug!("queueing task {name} ({} queued)", self.tasks.len());

        *self.pending.entry(name.clone()).or_insert(0) += 1;
        self.tasks.push_back(Entry {
            task: Task { name, payload },
            cancelled: false,
        });
        true
    }

    /// Soft-cancels every currently queued task with the given name.
    ///
    /// Cancelled tasks are skipped when popped. Tasks that have already
    /// been popped are unaffected. Returns the number of tasks cancelled.
    pub fn dequeue(&mut self, name: &str) -> usize {
        let mut cancelled = 0;
        for entry in &mut self.tasks {
            if !entry.cancelled && entry.task.name == name {
                entry.cancelled = true;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            log::debug!("cancelled {cancelled} queued task(s) named {name}");
            match self.pending.get_mut(name) {
                Some(n) if *n > cancelled => *n -= cancelled,
                _ => {
                    self.pending.remove(name);
                }
            }
        }
        cancelled
    }

    /// Marks a drain as in progress.
    ///
    /// Returns `false` if a drain is already running, in which case the
    /// caller must not pop tasks; the in-progress drain will deliver any
    /// newly enqueued work.
    pub fn try_begin_drain(&mut self) -> bool {
        if self.draining {
            return false;
        }
        self.draining = true;
        true
    }

    /// Pops the next live task, skipping cancelled entries.
    pub fn pop_task(&mut self) -> Option<Task<T>> {
        while let Some(entry) = self.tasks.pop_front() {
            if entry.cancelled {
                continue;
            }
            match self.pending.get_mut(&entry.task.name) {
                Some(n) if *n > 1 => *n -= 1,
                _ => {
                    self.pending.remove(&entry.task.name);
                }
            }
            return Some(entry.task);
        }
        None
    }

    /// Marks the current drain as finished.
    ///
    /// Must be called by the caller that observed `true` from
    /// [`try_begin_drain`](Self::try_begin_drain), after
    /// [`pop_task`](Self::pop_task) returns `None`.
    pub fn finish_drain(&mut self) {
        self.draining = false;
    }
}

impl<T> Default for CallQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CallQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallQueue")
            .field("len", &self.len())
            .field("skip_duplicates", &self.skip_duplicates)
            .field("draining", &self.draining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn drain_all(queue: &mut CallQueue<u32>) -> Vec<u32> {
        let mut seen = Vec::new();
        if queue.try_begin_drain() {
            while let Some(task) = queue.pop_task() {
                seen.push(task.payload);
            }
            queue.finish_drain();
        }
        seen
    }

    #[test]
    fn fifo_order() {
        let mut queue = CallQueue::new();
        queue.enqueue("a", 1);
        queue.enqueue("b", 2);
        queue.enqueue("c", 3);
        assert_eq!(drain_all(&mut queue), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_names_allowed_by_default() {
        let mut queue = CallQueue::new();
        assert!(queue.enqueue("a", 1));
        assert!(queue.enqueue("a", 2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn skip_duplicates_suppresses_pending_names() {
        let mut queue = CallQueue::with_skip_duplicates();
        assert!(queue.enqueue("a", 1));
        assert!(!queue.enqueue("a", 2));
        assert!(queue.enqueue("b", 3));
        assert_eq!(drain_all(&mut queue), vec![1, 3]);

        // Once popped, the name may be enqueued again.
        assert!(queue.enqueue("a", 4));
    }

    #[test]
    fn dequeue_cancels_queued_tasks() {
        let mut queue = CallQueue::new();
        queue.enqueue("a", 1);
        queue.enqueue("b", 2);
        queue.enqueue("a", 3);
        assert_eq!(queue.dequeue("a"), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(drain_all(&mut queue), vec![2]);
    }

    #[test]
    fn dequeue_unknown_name_is_noop() {
        let mut queue = CallQueue::<u32>::new();
        queue.enqueue("a", 1);
        assert_eq!(queue.dequeue("nope"), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn nested_drain_is_refused() {
        let mut queue = CallQueue::<u32>::new();
        assert!(queue.try_begin_drain());
        assert!(!queue.try_begin_drain());
        queue.finish_drain();
        assert!(queue.try_begin_drain());
        queue.finish_drain();
    }

    #[test]
    fn tasks_enqueued_mid_drain_are_delivered_in_order() {
        let mut queue = CallQueue::new();
        queue.enqueue("a", 1);
        queue.enqueue("b", 2);

        let mut seen = Vec::new();
        assert!(queue.try_begin_drain());
        while let Some(task) = queue.pop_task() {
            if task.payload == 1 {
                // Work triggered from within the drain queues behind
                // everything already pending.
                queue.enqueue("c", 3);
            }
            seen.push(task.payload);
        }
        queue.finish_drain();

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn pending_counts_survive_mixed_cancel_and_pop() {
        let mut queue = CallQueue::new();
        queue.enqueue("a", 1);
        queue.enqueue("a", 2);
        queue.enqueue("a", 3);
        assert_eq!(queue.dequeue("a"), 3);
        assert!(queue.is_empty());
        assert!(queue.pop_task().is_none());
    }
}
