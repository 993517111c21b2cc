//! SimNode wrapper for simulated packrat nodes.

use std::cell::Cell;
use std::future::{ready, Ready};

use embassy_sync::channel::Channel;
use packrat::traits::{Clock, Random, Transport, TransportInChannel, TransportOutChannel};
use packrat::{
    Command, DefaultConfig, Duration, Error, Event, GroupId, Node, NodeId, OpOutcome, RequestTag,
    Timestamp, MAX_PACKET_SIZE,
};

/// Mock transport for simulation.
pub struct SimTransport {
    mtu: usize,
    outgoing: TransportOutChannel,
    incoming: TransportInChannel,
}

impl SimTransport {
    pub fn new() -> Self {
        Self {
            mtu: MAX_PACKET_SIZE,
            outgoing: Channel::new(),
            incoming: Channel::new(),
        }
    }

    /// Inject a frame as if received from the radio.
    pub fn inject_rx(&self, data: Vec<u8>) {
        let _ = self.incoming.try_send(data);
    }

    /// Take all outgoing frames.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outgoing.try_receive() {
            frames.push(frame);
        }
        frames
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimTransport {
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

/// Mock clock for simulation.
///
/// Time is controlled externally by the simulator.
pub struct SimClock {
    current: Cell<Timestamp>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current: Cell::new(Timestamp::ZERO),
        }
    }

    pub fn at(time: Timestamp) -> Self {
        Self {
            current: Cell::new(time),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.current.set(time);
    }

    pub fn advance(&self, duration: Duration) {
        self.current.set(self.current.get() + duration);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    type SleepFuture<'a> = Ready<()>;

    fn now(&self) -> Timestamp {
        self.current.get()
    }

    fn sleep_until(&self, _time: Timestamp) -> Self::SleepFuture<'_> {
        ready(())
    }
}

/// Mock random for simulation (deterministic LCG).
pub struct SimRandom {
    state: u64,
}

impl SimRandom {
    pub fn new() -> Self {
        Self { state: 12345 }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Default for SimRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl Random for SimRandom {
    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let range = max - min;
        if range == 0 {
            return min;
        }
        min + (self.state % range)
    }
}

/// Type alias for simulated nodes.
pub type SimNodeInner = Node<SimTransport, SimRandom, SimClock, DefaultConfig>;

/// Wrapper around a packrat Node for simulation.
pub struct SimNode {
    inner: SimNodeInner,
}

impl SimNode {
    /// Create a node with the given identity and RNG seed.
    pub fn new(node_id: NodeId, group_id: GroupId, seed: u64, created_at: Timestamp) -> Self {
        let inner = Node::with_identity(
            SimTransport::new(),
            SimRandom::with_seed(seed),
            SimClock::at(created_at),
            node_id,
            group_id,
        );
        Self { inner }
    }

    /// Get the node's id.
    pub fn node_id(&self) -> NodeId {
        self.inner.node_id()
    }

    /// Get a reference to the inner node.
    pub fn inner(&self) -> &SimNodeInner {
        &self.inner
    }

    /// Get a mutable reference to the inner node.
    pub fn inner_mut(&mut self) -> &mut SimNodeInner {
        &mut self.inner
    }

    /// Peers found by the current/most recent discovery session.
    pub fn neighbor_ids(&self) -> Vec<NodeId> {
        self.inner.neighbors().as_slice().to_vec()
    }

    /// Occupied slots in the local record store.
    pub fn occupied_records(&self) -> usize {
        self.inner.store().occupied()
    }

    /// Text stored in a local slot, if any.
    pub fn record_text(&self, slot: u8) -> Option<String> {
        self.inner.store().get(slot).map(|r| r.text.clone())
    }

    /// True while a remote operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }

    /// True while a discovery session is running.
    pub fn is_discovering(&self) -> bool {
        self.inner.is_discovering()
    }

    /// Handle an incoming frame.
    pub fn handle_transport_rx(&mut self, data: &[u8], now: Timestamp) {
        // Keep the clock in step so anything reading clock.now() agrees.
        self.inner.clock().set(now);
        self.inner.handle_transport_rx(data, now);
    }

    /// Handle timer events.
    pub fn handle_timer(&mut self, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_timer(now);
    }

    /// Execute an operator command.
    pub fn handle_command(&mut self, command: Command, now: Timestamp) {
        self.inner.clock().set(now);
        self.inner.handle_command(command, now);
    }

    /// Issue a create directly, returning the operation handle.
    pub fn create_record(
        &mut self,
        target: NodeId,
        text: &str,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        self.inner.clock().set(now);
        self.inner.create_record(target, text, now)
    }

    /// Issue a retrieve directly, returning the operation handle.
    pub fn retrieve_record(
        &mut self,
        target: NodeId,
        slot: u8,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        self.inner.clock().set(now);
        self.inner.retrieve_record(target, slot, now)
    }

    /// Issue a delete directly, returning the operation handle.
    pub fn delete_record(
        &mut self,
        target: NodeId,
        slot: u8,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        self.inner.clock().set(now);
        self.inner.delete_record(target, slot, now)
    }

    /// Read (and consume) the outcome of an operation.
    pub fn poll_outcome(&mut self, tag: RequestTag) -> OpOutcome {
        self.inner.poll_outcome(tag)
    }

    /// Take the text delivered by the last successful retrieve.
    pub fn take_retrieved(&mut self) -> Option<String> {
        self.inner.take_retrieved()
    }

    /// Take all outgoing frames from the transport.
    pub fn take_outgoing(&self) -> Vec<Vec<u8>> {
        self.inner.transport().take_sent()
    }

    /// Drain the node's event channel.
    pub fn take_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.inner.events().try_receive() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrat::wire::{Decode, Encode};
    use packrat::{Body, Header, Packet};

    #[test]
    fn test_simnode_creation() {
        let node = SimNode::new(3, 1, 42, Timestamp::ZERO);
        assert_eq!(node.node_id(), 3);
        assert_eq!(node.occupied_records(), 0);
        assert!(!node.is_busy());
    }

    #[test]
    fn test_simnode_answers_probe() {
        let mut node = SimNode::new(2, 1, 42, Timestamp::ZERO);
        let probe = Packet {
            header: Header {
                group: 1,
                tag: 9,
                sender: 1,
                receiver: 0,
            },
            body: Body::ProbeRequest,
        }
        .encode_to_vec();

        node.handle_transport_rx(&probe, Timestamp::from_millis(5));

        let sent = node.take_outgoing();
        assert_eq!(sent.len(), 1);
        let reply = Packet::decode_from_slice(&sent[0]).unwrap();
        assert_eq!(reply.body, Body::ProbeResponse);
        assert_eq!(reply.header.receiver, 1);
    }

    #[test]
    fn test_simnode_clock_follows_events() {
        let mut node = SimNode::new(2, 1, 42, Timestamp::ZERO);
        node.handle_timer(Timestamp::from_secs(7));
        assert_eq!(node.inner().now(), Timestamp::from_secs(7));
    }
}
