//! Processor contract and the tick loop that serialises messages with processing

use crate::buffer::IqBuffer;
use crate::message::Message;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// A task driven once per filled hardware buffer
pub trait BasebandProcessor {
    /// Process one hardware buffer in place. Must not block or allocate.
    fn execute(&mut self, buffer: &mut IqBuffer);

    /// Apply a control message; only ever called between ticks
    fn on_message(&mut self, message: Message);
}

/// Control-side handle for queueing messages to a dispatcher
pub struct MessageSender {
    prod: HeapProd<Message>,
}

impl MessageSender {
    /// Queue a message, handing it back if the queue is full
    pub fn send(&mut self, message: Message) -> Result<(), Message> {
        self.prod.try_push(message)
    }
}

/// Owns a processor and drains its message queue before every tick
pub struct EventDispatcher<P> {
    processor: P,
    messages: HeapCons<Message>,
}

impl<P: BasebandProcessor> EventDispatcher<P> {
    pub fn new(processor: P, queue_len: usize) -> (Self, MessageSender) {
        let (prod, messages) = HeapRb::<Message>::new(queue_len.max(2)).split();
        (Self { processor, messages }, MessageSender { prod })
    }

    /// Apply all queued messages, returning how many were handled
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.messages.try_pop() {
            self.processor.on_message(message);
            handled += 1;
        }
        handled
    }

    /// One hardware-buffer interrupt: settle configuration, then process
    pub fn tick(&mut self, buffer: &mut IqBuffer) {
        self.dispatch_pending();
        self.processor.execute(buffer);
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Complex8, IQ_BUFFER_LEN};

    #[derive(Default)]
    struct Recorder {
        log: Vec<&'static str>,
    }

    impl BasebandProcessor for Recorder {
        fn execute(&mut self, buffer: &mut IqBuffer) {
            buffer.fill(Complex8::new(1, 1));
            self.log.push("execute");
        }

        fn on_message(&mut self, message: Message) {
            self.log.push(match message {
                Message::FifoData => "fifo",
                _ => "other",
            });
        }
    }

    #[test]
    fn test_messages_applied_before_tick() {
        let (mut dispatcher, mut sender) = EventDispatcher::new(Recorder::default(), 4);
        sender.send(Message::FifoData).unwrap();
        sender.send(Message::UpdateSpectrum).unwrap();

        let mut buffer = IqBuffer::new(IQ_BUFFER_LEN, 1_536_000).unwrap();
        dispatcher.tick(&mut buffer);
        dispatcher.tick(&mut buffer);

        assert_eq!(
            dispatcher.processor().log,
            vec!["fifo", "other", "execute", "execute"]
        );
        assert_eq!(buffer[0], Complex8::new(1, 1));
    }

    #[test]
    fn test_full_queue_returns_message() {
        let (_dispatcher, mut sender) = EventDispatcher::new(Recorder::default(), 2);
        sender.send(Message::FifoData).unwrap();
        sender.send(Message::FifoData).unwrap();
        assert!(matches!(sender.send(Message::FifoData), Err(Message::FifoData)));
    }
}
