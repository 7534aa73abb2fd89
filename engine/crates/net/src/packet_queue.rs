use crossbeam::queue::SegQueue;

use crate::protocol::Packet;

/// Lock-free, growable MPMC queue of owned packets. One per session.
#[derive(Debug, Default)]
pub struct PacketQueue {
    inner: SegQueue<Packet>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    pub fn push(&self, packet: Packet) {
        self.inner.push(packet);
    }

    pub fn pop(&self) -> Option<Packet> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every queued packet, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.inner.pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}
