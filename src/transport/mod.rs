//! Transport adapters feeding the channel queues.
//!
//! Each adapter owns exactly one inbound stream and never blocks the
//! dispatch loop: the TCP listener runs on its own task and the notify
//! adapter executes on whatever thread the wireless stack calls it from.
//! Both only classify chunks and enqueue them; all protocol interpretation
//! happens in the dispatch loop's state machines.

pub mod notify;
pub mod tcp;
