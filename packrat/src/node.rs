//! Node implementation - the protocol state machine.
//!
//! The Node struct owns all protocol state (record store, neighbor
//! table, the single pending operation) and provides an async `run()`
//! method that drives it. It is fully event-driven:
//! - Incoming frames trigger dispatch (probe answering, record
//!   request serving, response correlation)
//! - Operator commands trigger discovery or remote operations
//! - Timers advance discovery rounds and expire the response deadline
//!
//! There are no other suspension points: between events the node is
//! inert, which is what lets a cooperative scheduler interleave it with
//! the operator task over shared state without locks.
//!
//! # Usage
//!
//! ```ignore
//! let mut node = Node::with_identity(transport, random, clock, 1, 1);
//!
//! // Spawn the node's run loop
//! spawn(async move {
//!     node.run().await;
//! });
//!
//! // Drive it from the operator task
//! node.commands().send(Command::BeginDiscovery).await;
//! let event = node.events().receive().await;
//! ```

use alloc::string::String;
use core::marker::PhantomData;

use crate::config::{DefaultConfig, NodeConfig};
use crate::debug::DebugEvent;
use crate::neighbors::{InsertOutcome, NeighborTable};
use crate::store::RecordStore;
use crate::time::Timestamp;
use crate::traits::{
    Clock, CommandChannel, DebugChannel, EventChannel, Random, Transport,
};
use crate::types::{
    Body, Command, Error, Event, GroupId, Header, LinkMetrics, NodeId, OpKind, OpOutcome, Packet,
    RequestTag, Status, BROADCAST, DISCOVERY_ROUNDS, DISCOVERY_ROUND_INTERVAL, IDLE_WAKE_INTERVAL,
    MAX_NODE_ID, MAX_RECORD_TEXT, MIN_NODE_ID, RESPONSE_TIMEOUT,
};
use crate::wire::{Decode, Encode};

/// The one in-flight remote operation. At most one exists at a time;
/// issuing another before this resolves returns [`Error::Busy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingOp {
    /// Which operation was issued.
    pub kind: OpKind,
    /// Node the request was addressed to.
    pub target: NodeId,
    /// Slot named in the request (retrieve/delete only).
    pub slot: Option<u8>,
    /// Correlation tag the response must echo.
    pub tag: RequestTag,
    /// When the operation resolves to [`OpOutcome::TimedOut`].
    pub deadline: Timestamp,
}

/// A resolved operation waiting to be read by the caller.
#[derive(Clone, Copy, Debug)]
struct Resolution {
    tag: RequestTag,
    outcome: OpOutcome,
}

/// An in-progress discovery session.
#[derive(Clone, Copy, Debug)]
struct DiscoverySession {
    /// Probes broadcast so far (1-based).
    probes_sent: u8,
    /// When the next round starts, or when the session concludes.
    next_deadline: Timestamp,
}

/// The main protocol node.
///
/// Generic over:
/// - `T`: Transport implementation
/// - `R`: Random number generator
/// - `Clk`: Clock/timer implementation
/// - `C`: Capacity configuration
///
/// The node is fully event-driven. Call `run()` to start the main loop,
/// or drive `handle_transport_rx` / `handle_command` / `handle_timer`
/// directly (the simulator does this).
pub struct Node<T, R, Clk, C = DefaultConfig> {
    // Dependencies (injected)
    transport: T,
    random: R,
    clock: Clk,

    // Identity
    node_id: NodeId,
    group_id: GroupId,

    // Shared protocol state
    store: RecordStore<C>,
    neighbors: NeighborTable<C>,
    discovery: Option<DiscoverySession>,
    pending: Option<PendingOp>,
    resolved: Option<Resolution>,
    retrieved: Option<String>,

    // Channels to the operator/application task
    commands: CommandChannel,
    events: EventChannel,
    debug: DebugChannel,

    // Metrics
    metrics: LinkMetrics,

    _config: PhantomData<C>,
}

impl<T, R, Clk, C> Node<T, R, Clk, C>
where
    T: Transport,
    R: Random,
    Clk: Clock,
    C: NodeConfig,
{
    /// Create a node with the factory identity (node 1, group 1).
    pub fn new(transport: T, random: R, clock: Clk) -> Self {
        Self::with_identity(transport, random, clock, 1, 1)
    }

    /// Create a node with a specific identity.
    pub fn with_identity(
        transport: T,
        random: R,
        clock: Clk,
        node_id: NodeId,
        group_id: GroupId,
    ) -> Self {
        debug_assert!((MIN_NODE_ID..=MAX_NODE_ID).contains(&node_id));

        Self {
            transport,
            random,
            clock,

            node_id,
            group_id,

            store: RecordStore::new(),
            neighbors: NeighborTable::new(),
            discovery: None,
            pending: None,
            resolved: None,
            retrieved: None,

            commands: CommandChannel::new(),
            events: EventChannel::new(),
            debug: DebugChannel::new(),

            metrics: LinkMetrics::new(),

            _config: PhantomData,
        }
    }

    // --- Identity ---

    /// This node's id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// This node's group.
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Change this node's id. Ids outside 1..=25 are rejected.
    pub fn set_node_id(&mut self, node_id: NodeId) -> Result<(), Error> {
        if !(MIN_NODE_ID..=MAX_NODE_ID).contains(&node_id) {
            return Err(Error::InvalidNodeId);
        }
        self.node_id = node_id;
        Ok(())
    }

    /// Change this node's group.
    pub fn set_group_id(&mut self, group_id: GroupId) {
        self.group_id = group_id;
    }

    // --- Read surfaces for the operator/display task ---

    /// The local record store (listing, counters).
    pub fn store(&self) -> &RecordStore<C> {
        &self.store
    }

    /// Peers found in the current/most recent discovery session.
    pub fn neighbors(&self) -> &NeighborTable<C> {
        &self.neighbors
    }

    /// The in-flight operation, if any.
    pub fn pending(&self) -> Option<&PendingOp> {
        self.pending.as_ref()
    }

    /// True while a remote operation awaits its response or deadline.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// True while a discovery session is running.
    pub fn is_discovering(&self) -> bool {
        self.discovery.is_some()
    }

    /// Frame-level counters.
    pub fn metrics(&self) -> &LinkMetrics {
        &self.metrics
    }

    /// Channel for operator commands.
    pub fn commands(&self) -> &CommandChannel {
        &self.commands
    }

    /// Channel for protocol events.
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Channel for debug trace events.
    pub fn debug_channel(&self) -> &DebugChannel {
        &self.debug
    }

    /// Get the transport reference.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the clock reference.
    pub fn clock(&self) -> &Clk {
        &self.clock
    }

    /// Get the current timestamp from the clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Clear the local record store and both counters.
    pub fn reset_store(&mut self) {
        self.store.reset();
    }

    // --- Discovery (requester side) ---

    /// Start a discovery session: reset the neighbor table, broadcast
    /// the first probe, and arm the round timer. The session concludes
    /// one round interval after the final probe, at which point the
    /// neighbor table is stable and [`Event::DiscoveryComplete`] fires.
    pub fn begin_discovery(&mut self, now: Timestamp) {
        self.neighbors.clear();
        self.send_probe(1);
        self.discovery = Some(DiscoverySession {
            probes_sent: 1,
            next_deadline: now + DISCOVERY_ROUND_INTERVAL,
        });
    }

    fn send_probe(&mut self, round: u8) {
        let tag = self.random.gen_u8();
        let probe = Packet {
            header: Header {
                group: self.group_id,
                tag,
                sender: self.node_id,
                receiver: BROADCAST,
            },
            body: Body::ProbeRequest,
        };
        let _ = self.transmit(&probe);
        self.push_debug(DebugEvent::ProbeSent { round });
    }

    // --- Remote operations (requester side) ---

    /// Ask `target` to store `text`. Returns the operation handle.
    pub fn create_record(
        &mut self,
        target: NodeId,
        text: &str,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        if text.len() > MAX_RECORD_TEXT {
            return Err(Error::TextTooLong);
        }
        self.issue(
            OpKind::Create,
            target,
            None,
            Body::CreateRequest {
                text: String::from(text),
            },
            now,
        )
    }

    /// Ask `target` for the record in `slot`. On success the text lands
    /// in [`take_retrieved`](Self::take_retrieved).
    pub fn retrieve_record(
        &mut self,
        target: NodeId,
        slot: u8,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        self.issue(
            OpKind::Retrieve,
            target,
            Some(slot),
            Body::RetrieveRequest { slot },
            now,
        )
    }

    /// Ask `target` to clear `slot`.
    pub fn delete_record(
        &mut self,
        target: NodeId,
        slot: u8,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        self.issue(
            OpKind::Delete,
            target,
            Some(slot),
            Body::DeleteRequest { slot },
            now,
        )
    }

    /// Read the outcome of the operation identified by `tag`.
    ///
    /// Returns [`OpOutcome::Unset`] while the operation is unresolved or
    /// the tag is unknown. A resolved outcome is consumed by the read,
    /// returning the requester to idle.
    pub fn poll_outcome(&mut self, tag: RequestTag) -> OpOutcome {
        match self.resolved.take() {
            Some(res) if res.tag == tag => res.outcome,
            other => {
                self.resolved = other;
                OpOutcome::Unset
            }
        }
    }

    /// Take the text delivered by the last successful retrieve.
    pub fn take_retrieved(&mut self) -> Option<String> {
        self.retrieved.take()
    }

    fn issue(
        &mut self,
        kind: OpKind,
        target: NodeId,
        slot: Option<u8>,
        body: Body,
        now: Timestamp,
    ) -> Result<RequestTag, Error> {
        if self.pending.is_some() {
            return Err(Error::Busy);
        }
        if !(MIN_NODE_ID..=MAX_NODE_ID).contains(&target) {
            return Err(Error::InvalidTarget);
        }

        let tag = self.random.gen_u8();
        let request = Packet {
            header: Header {
                group: self.group_id,
                tag,
                sender: self.node_id,
                receiver: target,
            },
            body,
        };
        // A refused frame aborts the attempt without arming anything.
        self.transmit(&request)?;

        // A stale unread outcome from an earlier operation is discarded.
        self.resolved = None;
        self.retrieved = None;
        self.pending = Some(PendingOp {
            kind,
            target,
            slot,
            tag,
            deadline: now + RESPONSE_TIMEOUT,
        });
        self.push_debug(DebugEvent::RequestIssued { kind, target, tag });
        Ok(tag)
    }

    // --- Dispatcher (receiver side) ---

    /// Handle one inbound frame. Malformed and foreign frames are
    /// counted and dropped; everything else dispatches by message type.
    pub fn handle_transport_rx(&mut self, data: &[u8], now: Timestamp) {
        let packet = match Packet::decode_from_slice(data) {
            Ok(p) => p,
            Err(_) => {
                self.metrics.malformed += 1;
                self.push_debug(DebugEvent::DecodeFailed { len: data.len() });
                return;
            }
        };

        let header = packet.header;
        // Accept only own-group frames addressed to us or to everyone.
        if header.group != self.group_id {
            self.metrics.filtered += 1;
            self.push_debug(DebugEvent::Filtered { reason: "group" });
            return;
        }
        if header.receiver != BROADCAST && header.receiver != self.node_id {
            self.metrics.filtered += 1;
            self.push_debug(DebugEvent::Filtered { reason: "receiver" });
            return;
        }
        self.metrics.received += 1;

        match packet.body {
            Body::ProbeRequest => self.on_probe_request(header),
            Body::ProbeResponse => self.on_probe_response(header),
            Body::CreateRequest { text } => self.on_create_request(header, &text, now),
            Body::DeleteRequest { slot } => self.on_delete_request(header, slot),
            Body::RetrieveRequest { slot } => self.on_retrieve_request(header, slot),
            Body::OperationResponse {
                slot: _,
                status,
                text,
            } => self.on_operation_response(header, status, text),
        }
    }

    /// Probe answering is always-on: every reachable own-group node
    /// responds whether or not it is discovering itself.
    fn on_probe_request(&mut self, header: Header) {
        let reply = Packet {
            header: Header {
                group: self.group_id,
                tag: header.tag,
                sender: self.node_id,
                receiver: header.sender,
            },
            body: Body::ProbeResponse,
        };
        let _ = self.transmit(&reply);
        self.push_debug(DebugEvent::ProbeResponseSent { to: header.sender });
    }

    fn on_probe_response(&mut self, header: Header) {
        match self.neighbors.insert(header.sender) {
            InsertOutcome::Added => {
                self.push_debug(DebugEvent::NeighborAdded {
                    node: header.sender,
                });
                self.push_event(Event::NeighborFound {
                    node: header.sender,
                });
            }
            InsertOutcome::AlreadyKnown => {}
            InsertOutcome::Full => self.push_debug(DebugEvent::NeighborTableFull {
                node: header.sender,
            }),
        }
    }

    fn on_create_request(&mut self, header: Header, text: &str, now: Timestamp) {
        self.push_debug(DebugEvent::RequestReceived {
            kind: OpKind::Create,
            from: header.sender,
        });
        let (slot, status) = match self.store.insert(header.sender, text, now.as_secs() as u32) {
            Ok(slot) => {
                self.push_event(Event::RecordStored {
                    slot,
                    owner: header.sender,
                });
                (slot, Status::Success)
            }
            Err(_) => (0, Status::StoreFull),
        };
        self.respond(header, slot, status, None);
    }

    fn on_delete_request(&mut self, header: Header, slot: u8) {
        self.push_debug(DebugEvent::RequestReceived {
            kind: OpKind::Delete,
            from: header.sender,
        });
        let status = match self.store.delete(slot) {
            Ok(()) => {
                self.push_event(Event::RecordDeleted {
                    slot,
                    by: header.sender,
                });
                Status::Success
            }
            Err(_) => Status::InvalidSlot,
        };
        self.respond(header, slot, status, None);
    }

    fn on_retrieve_request(&mut self, header: Header, slot: u8) {
        self.push_debug(DebugEvent::RequestReceived {
            kind: OpKind::Retrieve,
            from: header.sender,
        });
        let found = self.store.get(slot).map(|record| record.text.clone());
        match found {
            Some(text) => self.respond(header, slot, Status::Success, Some(text)),
            None => self.respond(header, slot, Status::NoSuchRecord, None),
        }
    }

    /// Every request gets exactly one response, within this dispatch
    /// step. The responder never retries.
    fn respond(&mut self, request: Header, slot: u8, status: Status, text: Option<String>) {
        let reply = Packet {
            header: Header {
                group: self.group_id,
                tag: request.tag,
                sender: self.node_id,
                receiver: request.sender,
            },
            body: Body::OperationResponse { slot, status, text },
        };
        let _ = self.transmit(&reply);
        self.push_debug(DebugEvent::ResponseSent {
            to: request.sender,
            status,
        });
    }

    fn on_operation_response(&mut self, header: Header, status: Status, text: Option<String>) {
        let (target_ok, tag_ok) = match &self.pending {
            Some(p) => (header.sender == p.target, header.tag == p.tag),
            None => {
                self.push_debug(DebugEvent::ResponseIgnored {
                    reason: "no operation pending",
                });
                return;
            }
        };
        if !target_ok {
            self.push_debug(DebugEvent::ResponseIgnored {
                reason: "sender is not the target",
            });
            return;
        }
        if !tag_ok {
            self.push_debug(DebugEvent::ResponseIgnored {
                reason: "tag mismatch",
            });
            return;
        }

        let Some(pending) = self.pending.take() else {
            return;
        };
        let outcome = match status {
            Status::Success => {
                if pending.kind == OpKind::Retrieve {
                    self.retrieved = Some(text.unwrap_or_default());
                }
                OpOutcome::Success
            }
            _ => OpOutcome::Failure,
        };
        self.resolved = Some(Resolution {
            tag: pending.tag,
            outcome,
        });
        self.push_debug(DebugEvent::ResponseMatched {
            tag: pending.tag,
            outcome,
        });
        self.push_event(Event::OperationResolved {
            tag: pending.tag,
            outcome,
        });
    }

    // --- Timers ---

    /// Advance timer-driven state: discovery rounds and the response
    /// deadline. Safe to call at any time; nothing happens unless a
    /// deadline has actually passed.
    pub fn handle_timer(&mut self, now: Timestamp) {
        if let Some((probes_sent, deadline)) = self
            .discovery
            .as_ref()
            .map(|s| (s.probes_sent, s.next_deadline))
        {
            if now >= deadline {
                if probes_sent < DISCOVERY_ROUNDS {
                    self.send_probe(probes_sent + 1);
                    self.discovery = Some(DiscoverySession {
                        probes_sent: probes_sent + 1,
                        next_deadline: now + DISCOVERY_ROUND_INTERVAL,
                    });
                } else {
                    self.discovery = None;
                    let found = self.neighbors.len();
                    self.push_debug(DebugEvent::DiscoveryFinished { found });
                    self.push_event(Event::DiscoveryComplete { found });
                }
            }
        }

        if let Some(deadline) = self.pending.as_ref().map(|p| p.deadline) {
            if now >= deadline {
                if let Some(pending) = self.pending.take() {
                    self.resolved = Some(Resolution {
                        tag: pending.tag,
                        outcome: OpOutcome::TimedOut,
                    });
                    self.push_debug(DebugEvent::DeadlineExpired { tag: pending.tag });
                    self.push_event(Event::OperationResolved {
                        tag: pending.tag,
                        outcome: OpOutcome::TimedOut,
                    });
                }
            }
        }
    }

    /// The earliest time the node needs a timer event.
    pub fn next_wake(&self, now: Timestamp) -> Timestamp {
        let mut wake = now + IDLE_WAKE_INTERVAL;
        if let Some(session) = &self.discovery {
            wake = wake.min(session.next_deadline);
        }
        if let Some(pending) = &self.pending {
            wake = wake.min(pending.deadline);
        }
        wake
    }

    // --- Commands ---

    /// Execute one operator command. Rejections surface as
    /// [`Event::CommandRejected`] on the event channel.
    pub fn handle_command(&mut self, command: Command, now: Timestamp) {
        let result = match command {
            Command::BeginDiscovery => {
                self.begin_discovery(now);
                Ok(())
            }
            Command::Create { target, text } => {
                self.create_record(target, &text, now).map(|_| ())
            }
            Command::Retrieve { target, slot } => {
                self.retrieve_record(target, slot, now).map(|_| ())
            }
            Command::Delete { target, slot } => self.delete_record(target, slot, now).map(|_| ()),
            Command::SetNodeId(node_id) => self.set_node_id(node_id),
            Command::SetGroupId(group_id) => {
                self.set_group_id(group_id);
                Ok(())
            }
            Command::ResetStore => {
                self.reset_store();
                Ok(())
            }
        };
        if let Err(error) = result {
            self.push_event(Event::CommandRejected { error });
        }
    }

    // --- Main loop ---

    /// Run the node's main loop.
    ///
    /// Fully event-driven and runs forever: waits for the next inbound
    /// frame, operator command, or timer deadline, handles it, and goes
    /// back to waiting. Call this from an async task/executor.
    pub async fn run(&mut self) -> ! {
        use embassy_futures::select::{select3, Either3};

        loop {
            let wake = self.next_wake(self.clock.now());

            let result = select3(
                self.transport.incoming().receive(),
                self.commands.receive(),
                self.clock.sleep_until(wake),
            )
            .await;

            match result {
                Either3::First(frame) => {
                    let now = self.clock.now();
                    self.handle_transport_rx(&frame, now);
                }
                Either3::Second(command) => {
                    let now = self.clock.now();
                    self.handle_command(command, now);
                }
                Either3::Third(()) => {
                    let now = self.clock.now();
                    self.handle_timer(now);
                }
            }
        }
    }

    // --- Internals ---

    fn transmit(&mut self, packet: &Packet) -> Result<(), Error> {
        let bytes = packet.encode_to_vec();
        if bytes.len() > self.transport.mtu() {
            self.metrics.send_failed += 1;
            return Err(Error::FrameTooLarge);
        }
        if self.transport.outgoing().try_send(bytes).is_err() {
            self.metrics.send_failed += 1;
            return Err(Error::QueueFull);
        }
        self.metrics.sent += 1;
        Ok(())
    }

    fn push_event(&mut self, event: Event) {
        let _ = self.events.try_send(event);
    }

    fn push_debug(&mut self, event: DebugEvent) {
        let _ = self.debug.try_send(event);
    }
}
