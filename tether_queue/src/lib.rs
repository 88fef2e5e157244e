// Copyright 2026 the Tether Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tether Queue: a FIFO, reentrancy-guarded call queue.
//!
//! This crate provides [`CallQueue`], the dispatch primitive used by the
//! `tether_property` crate to serialize listener invocation. A notification
//! triggered while another notification is being delivered is appended to
//! the queue rather than executed via a nested call, which keeps delivery
//! in FIFO order and bounds stack depth.
//!
//! ## Drain Protocol
//!
//! The queue stores tasks; it does not call them. Payloads are invoked by
//! the caller, which lets the payload type borrow whatever context the
//! caller owns (the property world, in `tether_property`'s case):
//!
//! ```rust
//! use tether_queue::CallQueue;
//!
//! let mut queue = CallQueue::new();
//! queue.enqueue("first", 1);
//! queue.enqueue("second", 2);
//!
//! let mut seen = Vec::new();
//! if queue.try_begin_drain() {
//!     while let Some(task) = queue.pop_task() {
//!         // Invoking a payload may enqueue more tasks; the loop picks
//!         // them up because it runs until the queue is empty.
//!         seen.push(task.payload);
//!     }
//!     queue.finish_drain();
//! }
//! assert_eq!(seen, vec![1, 2]);
//! ```
//!
//! A nested drain attempt (`try_begin_drain` while a drain is in progress)
//! returns `false`; the caller bails out and the outer drain delivers the
//! newly enqueued tasks in order.
//!
//! ## Cancellation
//!
//! Every task carries a name. [`CallQueue::dequeue`] soft-cancels all
//! currently queued tasks with a given name; they are skipped when popped.
//! Tasks that have already been popped are unaffected. When the queue is
//! built with [`CallQueue::with_skip_duplicates`], enqueueing a name that is
//! already pending is a no-op.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod queue;

pub use queue::{CallQueue, Task};
