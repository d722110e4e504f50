//! Lock-free control → audio command queue.

use ostinato_core::Id;
use ostinato_sampler::ChannelEvent;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Work the audio thread picks up at the head of its next block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Live event for one channel.
    Channel { channel: Id, event: ChannelEvent },
    /// Start or stop replaying recorded actions without waiting for a beat.
    ReadActions { channel: Id, read: bool },
    /// Playhead back to frame 0.
    Rewind,
}

/// Control-side end.
pub struct CommandProducer {
    producer: HeapProd<Command>,
}

impl CommandProducer {
    /// Returns false if the queue is full.
    #[inline]
    pub fn push(&mut self, command: Command) -> bool {
        self.producer.try_push(command).is_ok()
    }
}

/// Audio-thread end.
pub struct CommandConsumer {
    consumer: HeapCons<Command>,
}

impl CommandConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<Command> {
        self.consumer.try_pop()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn command_queue(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    (CommandProducer { producer }, CommandConsumer { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_and_capacity() {
        let (mut tx, mut rx) = command_queue(2);
        assert!(tx.push(Command::Rewind));
        assert!(tx.push(Command::Channel {
            channel: 3,
            event: ChannelEvent::KeyKill,
        }));
        assert!(!tx.push(Command::Rewind));
        assert_eq!(rx.pending_count(), 2);

        assert_eq!(rx.pop(), Some(Command::Rewind));
        assert!(matches!(rx.pop(), Some(Command::Channel { channel: 3, .. })));
        assert_eq!(rx.pop(), None);
    }
}
