//! Input pins: a bounded FIFO of incoming data, fed by zero or more
//! connected output pins.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

use crate::data::Data;

/// Default bound for an input pin's FIFO when the pipeline doesn't
/// override it (see `PipelineConfig::default_pin_queue_bound`).
pub const DEFAULT_QUEUE_BOUND: usize = 16;

/// A bounded multi-producer, single-consumer FIFO of incoming data.
///
/// Multiple output pins may be connected to the same input (arrival
/// order across distinct upstreams is unspecified), so
/// this is MPSC rather than SPSC: any number of `sender()` clones may
/// push concurrently, and exactly one consumer (the owning module's
/// executor) pops.
pub struct InputPin {
    sender: Sender<Data>,
    receiver: Receiver<Data>,
}

impl InputPin {
    pub fn new(bound: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(bound.max(1));
        Self { sender, receiver }
    }

    /// A cloneable handle an output pin can push into when connecting.
    pub fn sender(&self) -> Sender<Data> {
        self.sender.clone()
    }

    /// Enqueues one datum, blocking while the FIFO is full — this is
    /// the pin-level backpressure point alongside `BufferPool::acquire`.
    pub fn push(&self, data: Data) {
        // The pin always holds its own sender clone, so send() can
        // only fail if every receiver were dropped, which can't
        // happen while `self` (which owns the receiver) is alive.
        self.sender.send(data).expect("input pin's own receiver dropped unexpectedly");
    }

    /// Non-blocking push. Returns the datum back if the FIFO is full.
    pub fn try_push(&self, data: Data) -> Result<(), Data> {
        match self.sender.try_send(data) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(data)) => Err(data),
            Err(TrySendError::Disconnected(_)) => {
                unreachable!("input pin's own receiver dropped unexpectedly")
            }
        }
    }

    /// Dequeues one datum, blocking while the FIFO is empty.
    pub fn pop(&self) -> Data {
        self.receiver
            .recv()
            .expect("input pin's own sender dropped unexpectedly")
    }

    /// Dequeues with a bound on how long to block, for tests that
    /// need to assert "nothing arrived" without hanging forever.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Data> {
        match self.receiver.recv_timeout(timeout) {
            Ok(data) => Some(data),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                unreachable!("input pin's own sender dropped unexpectedly")
            }
        }
    }

    /// Non-blocking dequeue.
    pub fn try_pop(&self) -> Option<Data> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// The raw receiver, exposed so the pipeline executor can multiplex
    /// several input pins with `crossbeam_channel::Select` instead of
    /// busy-polling each one.
    pub(crate) fn receiver(&self) -> &Receiver<Data> {
        &self.receiver
    }

    /// A cheap, reference-counted clone of the raw receiver, used by
    /// the pipeline executor to snapshot a module's input receivers
    /// once up front rather than re-borrowing through the module on
    /// every loop iteration (which would require holding the module's
    /// lock across a blocking `Select`).
    pub(crate) fn receiver_clone(&self) -> Receiver<Data> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metadata;

    fn sample(n: u8) -> Data {
        Data::from_bytes(bytes::BytesMut::from(&[n][..]), Metadata::default())
    }

    #[test]
    fn fifo_preserves_push_order() {
        let pin = InputPin::new(8);
        for i in 0..5 {
            pin.push(sample(i));
        }
        for i in 0..5 {
            assert_eq!(pin.pop().as_slice(), &[i]);
        }
    }

    #[test]
    fn try_push_rejects_when_full() {
        let pin = InputPin::new(1);
        pin.push(sample(1));
        assert!(pin.try_push(sample(2)).is_err());
    }

    #[test]
    fn try_pop_on_empty_returns_none() {
        let pin = InputPin::new(4);
        assert!(pin.try_pop().is_none());
    }

    #[test]
    fn multiple_senders_both_deliver() {
        let pin = InputPin::new(8);
        let a = pin.sender();
        let b = pin.sender();
        a.send(sample(1)).unwrap();
        b.send(sample(2)).unwrap();
        let mut seen: Vec<u8> = vec![pin.pop().as_slice()[0], pin.pop().as_slice()[0]];
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
    }
}
