//! Status channel from the processing context to the control side

use crate::message::StatusEvent;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Destination for status events raised inside a tick
pub trait EventSink {
    fn send(&mut self, event: StatusEvent);
}

impl EventSink for Vec<StatusEvent> {
    fn send(&mut self, event: StatusEvent) {
        self.push(event);
    }
}

/// Create a status channel holding up to `capacity` pending events
pub fn status_channel(capacity: usize) -> (StatusSender, StatusReceiver) {
    let (prod, cons) = HeapRb::<StatusEvent>::new(capacity.max(2)).split();
    (StatusSender { prod, dropped: 0 }, StatusReceiver { cons })
}

/// Non-blocking producer half; a full queue drops the newest event
pub struct StatusSender {
    prod: HeapProd<StatusEvent>,
    dropped: u64,
}

impl StatusSender {
    /// Events lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EventSink for StatusSender {
    fn send(&mut self, event: StatusEvent) {
        if self.prod.try_push(event).is_err() {
            self.dropped += 1;
        }
    }
}

/// Consumer half drained by the control side
pub struct StatusReceiver {
    cons: HeapCons<StatusEvent>,
}

impl StatusReceiver {
    pub fn try_recv(&mut self) -> Option<StatusEvent> {
        self.cons.try_pop()
    }

    /// Iterate over every pending event
    pub fn drain(&mut self) -> impl Iterator<Item = StatusEvent> + '_ {
        self.cons.pop_iter()
    }
}
