//! Core traits for transport, time, and randomness abstraction.
//!
//! These traits allow the protocol to be used with different:
//! - Radio backends (sub-GHz transceivers, simulation)
//! - Time sources (hardware timers, simulated time)
//! - Random number generators
//!
//! The node never talks to hardware directly; everything it needs from
//! the platform comes through these seams.

use alloc::vec::Vec;
use core::future::Future;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::debug::DebugEvent;
use crate::time::Timestamp;
use crate::types::{Command, Event};

/// Queue size for transport channels.
pub(crate) const TRANSPORT_QUEUE_SIZE: usize = 8;

/// Queue size for the operator command channel.
pub(crate) const COMMAND_QUEUE_SIZE: usize = 4;

/// Queue size for the application event channel.
pub(crate) const EVENT_QUEUE_SIZE: usize = 16;

/// Queue size for the debug trace channel.
pub(crate) const DEBUG_QUEUE_SIZE: usize = 32;

/// Mutex type used for channels.
pub(crate) type ChannelMutex = CriticalSectionRawMutex;

/// Raw frames received from the radio.
pub type TransportInChannel = Channel<ChannelMutex, Vec<u8>, TRANSPORT_QUEUE_SIZE>;

/// Encoded frames queued for transmission.
pub type TransportOutChannel = Channel<ChannelMutex, Vec<u8>, TRANSPORT_QUEUE_SIZE>;

/// Operator commands driving the node.
pub type CommandChannel = Channel<ChannelMutex, Command, COMMAND_QUEUE_SIZE>;

/// Protocol events for the application/display task.
pub type EventChannel = Channel<ChannelMutex, Event, EVENT_QUEUE_SIZE>;

/// Debug trace events.
pub type DebugChannel = Channel<ChannelMutex, DebugEvent, DEBUG_QUEUE_SIZE>;

/// Transport trait for radio backends.
///
/// The medium is a shared broadcast channel: addressing lives in the
/// frame header and the radio simply puts bytes on the air. Frames may
/// be lost at any time; the protocol never assumes delivery.
///
/// # Usage Contract
///
/// - Radio ISR → `incoming().try_send(bytes)` on reception
/// - Simulator → `incoming().try_send(bytes)` to deliver frames
/// - Node → `incoming().receive().await` and `outgoing().try_send(bytes)`
/// - Transmit task → `outgoing().receive().await` to drain for the air
pub trait Transport {
    /// Maximum transmission unit for this transport.
    ///
    /// The protocol checks frame size before queueing.
    fn mtu(&self) -> usize;

    /// Queue of encoded frames awaiting transmission.
    fn outgoing(&self) -> &TransportOutChannel;

    /// Channel of received frames.
    fn incoming(&self) -> &TransportInChannel;
}

/// Time source trait for real or simulated time.
///
/// Allows the protocol to work with:
/// - Real hardware time (embassy_time, std::time)
/// - Simulated time (controlled by the simulator for deterministic tests)
pub trait Clock {
    /// Future type returned by sleep_until.
    type SleepFuture<'a>: Future<Output = ()>
    where
        Self: 'a;

    /// Get the current timestamp.
    fn now(&self) -> Timestamp;

    /// Sleep until the given timestamp.
    ///
    /// For simulation, this should complete when the simulator advances
    /// time past the given timestamp.
    fn sleep_until(&self, time: Timestamp) -> Self::SleepFuture<'_>;
}

/// Random number generator trait.
///
/// Used for request correlation tags.
pub trait Random {
    /// Generate a random u64 in the range [min, max).
    fn gen_range(&mut self, min: u64, max: u64) -> u64;

    /// Generate a random byte.
    fn gen_u8(&mut self) -> u8 {
        self.gen_range(0, 256) as u8
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_impls {
    //! Mock implementations of traits for unit testing.
    //!
    //! Available when running tests or with the `test-support` feature
    //! enabled.

    use core::cell::Cell;
    use core::future::{ready, Ready};

    use super::*;
    use crate::time::Duration;
    use crate::types::MAX_PACKET_SIZE;

    /// Mock transport backed by plain channels.
    pub struct MockTransport {
        mtu: usize,
        outgoing: TransportOutChannel,
        incoming: TransportInChannel,
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self {
                mtu: MAX_PACKET_SIZE,
                outgoing: Channel::new(),
                incoming: Channel::new(),
            }
        }
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_mtu(mtu: usize) -> Self {
            Self {
                mtu,
                ..Self::default()
            }
        }

        /// Inject a frame as if it was received (for testing).
        pub fn inject_rx(&self, data: Vec<u8>) {
            let _ = self.incoming.try_send(data);
        }

        /// Take all queued outgoing frames (for testing).
        pub fn take_sent(&self) -> Vec<Vec<u8>> {
            let mut frames = Vec::new();
            while let Ok(frame) = self.outgoing.try_receive() {
                frames.push(frame);
            }
            frames
        }
    }

    impl Transport for MockTransport {
        fn mtu(&self) -> usize {
            self.mtu
        }

        fn outgoing(&self) -> &TransportOutChannel {
            &self.outgoing
        }

        fn incoming(&self) -> &TransportInChannel {
            &self.incoming
        }
    }

    /// Mock clock for testing (synchronous, time advances manually).
    pub struct MockClock {
        current: Cell<Timestamp>,
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self {
                current: Cell::new(Timestamp::ZERO),
            }
        }
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(time: Timestamp) -> Self {
            Self {
                current: Cell::new(time),
            }
        }

        /// Advance time to the given timestamp.
        pub fn set(&self, time: Timestamp) {
            self.current.set(time);
        }

        /// Advance time by the given duration.
        pub fn advance(&self, duration: Duration) {
            self.current.set(self.current.get() + duration);
        }
    }

    impl Clock for MockClock {
        type SleepFuture<'a> = Ready<()>;

        fn now(&self) -> Timestamp {
            self.current.get()
        }

        fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
            // In synchronous tests, sleep completes immediately.
            // The test code should advance time manually.
            ready(())
        }
    }

    /// Mock random for testing (deterministic LCG).
    pub struct MockRandom {
        pub state: u64,
    }

    impl Default for MockRandom {
        fn default() -> Self {
            Self { state: 12345 }
        }
    }

    impl MockRandom {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_seed(seed: u64) -> Self {
            Self { state: seed }
        }
    }

    impl Random for MockRandom {
        fn gen_range(&mut self, min: u64, max: u64) -> u64 {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let range = max - min;
            if range == 0 {
                return min;
            }
            min + (self.state % range)
        }
    }
}
