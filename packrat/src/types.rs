//! Core types and constants for the packrat protocol.

use alloc::string::String;
use core::fmt;

use crate::time::Duration;

/// Node identifier. Valid deployment ids are 1..=25; `0` is both the
/// broadcast address and the empty-slot owner sentinel on the wire.
pub type NodeId = u8;

/// Logical partition id. Frames from a different group are invisible.
pub type GroupId = u16;

/// Opaque correlation value chosen by a requester, echoed by responders.
pub type RequestTag = u8;

/// Broadcast receiver address.
pub const BROADCAST: NodeId = 0;

/// Lowest valid node id.
pub const MIN_NODE_ID: NodeId = 1;

/// Highest valid node id.
pub const MAX_NODE_ID: NodeId = 25;

/// Maximum frame size including the header.
pub const MAX_PACKET_SIZE: usize = 250;

/// Fixed frame header length in bytes.
pub const HEADER_LEN: usize = 6;

/// Maximum record text length in bytes, excluding the NUL terminator.
pub const MAX_RECORD_TEXT: usize = 19;

/// Probes broadcast per discovery session.
pub const DISCOVERY_ROUNDS: u8 = 2;

/// Wait after each probe before the next round (or session end).
pub const DISCOVERY_ROUND_INTERVAL: Duration = Duration::from_secs(3);

/// Deadline for a remote operation response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Fallback wake interval when no timer is armed.
pub const IDLE_WAKE_INTERVAL: Duration = Duration::from_secs(60);

// Message type bytes (frame header offset 2)
pub const MSG_PROBE_REQUEST: u8 = 0x00;
pub const MSG_PROBE_RESPONSE: u8 = 0x01;
pub const MSG_CREATE_REQUEST: u8 = 0x02;
pub const MSG_DELETE_REQUEST: u8 = 0x03;
pub const MSG_RETRIEVE_REQUEST: u8 = 0x04;
pub const MSG_OPERATION_RESPONSE: u8 = 0x05;

// Operation response status bytes
pub const ST_SUCCESS: u8 = 0x01;
pub const ST_STORE_FULL: u8 = 0x02;
pub const ST_INVALID_SLOT: u8 = 0x03;
pub const ST_NO_SUCH_RECORD: u8 = 0x04;

/// Status code carried in an [`Body::OperationResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The requested operation was applied.
    Success,
    /// Create failed: no free slot on the target.
    StoreFull,
    /// Delete failed: slot out of range or already empty.
    InvalidSlot,
    /// Retrieve failed: slot out of range or empty.
    NoSuchRecord,
}

impl Status {
    /// Wire byte for this status.
    pub fn as_u8(self) -> u8 {
        match self {
            Status::Success => ST_SUCCESS,
            Status::StoreFull => ST_STORE_FULL,
            Status::InvalidSlot => ST_INVALID_SLOT,
            Status::NoSuchRecord => ST_NO_SUCH_RECORD,
        }
    }

    /// Parse a wire status byte.
    pub fn from_u8(byte: u8) -> Option<Status> {
        match byte {
            ST_SUCCESS => Some(Status::Success),
            ST_STORE_FULL => Some(Status::StoreFull),
            ST_INVALID_SLOT => Some(Status::InvalidSlot),
            ST_NO_SUCH_RECORD => Some(Status::NoSuchRecord),
            _ => None,
        }
    }
}

/// Fixed frame header. The message type byte is carried by the
/// [`Body`] discriminant, not stored here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Logical partition the frame belongs to.
    pub group: GroupId,
    /// Correlation tag (chosen by requesters, echoed by responders).
    pub tag: RequestTag,
    /// Origin node.
    pub sender: NodeId,
    /// Intended recipient; [`BROADCAST`] addresses every listener.
    pub receiver: NodeId,
}

/// Type-specific frame payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// Broadcast neighbor probe.
    ProbeRequest,
    /// Unicast answer to a probe.
    ProbeResponse,
    /// Store this text on the receiver.
    CreateRequest { text: String },
    /// Clear the given slot on the receiver.
    DeleteRequest { slot: u8 },
    /// Read the given slot on the receiver.
    RetrieveRequest { slot: u8 },
    /// Answer to any of the three record requests. `text` is present
    /// only on a successful retrieve.
    OperationResponse {
        slot: u8,
        status: Status,
        text: Option<String>,
    },
}

impl Body {
    /// Wire message type byte for this payload.
    pub fn msg_type(&self) -> u8 {
        match self {
            Body::ProbeRequest => MSG_PROBE_REQUEST,
            Body::ProbeResponse => MSG_PROBE_RESPONSE,
            Body::CreateRequest { .. } => MSG_CREATE_REQUEST,
            Body::DeleteRequest { .. } => MSG_DELETE_REQUEST,
            Body::RetrieveRequest { .. } => MSG_RETRIEVE_REQUEST,
            Body::OperationResponse { .. } => MSG_OPERATION_RESPONSE,
        }
    }
}

/// A complete protocol frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub body: Body,
}

/// Kind of remote record operation a requester can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Create,
    Retrieve,
    Delete,
}

/// Outcome of a remote operation, as seen by the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpOutcome {
    /// No resolution yet (or unknown handle).
    Unset,
    /// The target applied the operation.
    Success,
    /// The target answered with a failure status.
    Failure,
    /// No matching response arrived within the deadline.
    TimedOut,
}

/// Operator commands accepted on the node's command channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a neighbor discovery session.
    BeginDiscovery,
    /// Store `text` on `target`.
    Create { target: NodeId, text: String },
    /// Read `slot` from `target`.
    Retrieve { target: NodeId, slot: u8 },
    /// Clear `slot` on `target`.
    Delete { target: NodeId, slot: u8 },
    /// Change this node's id (validated against 1..=25).
    SetNodeId(NodeId),
    /// Change this node's group.
    SetGroupId(GroupId),
    /// Clear the local record store and both counters.
    ResetStore,
}

/// Events emitted by the node for the application/display task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A peer answered a probe and entered the neighbor table.
    NeighborFound { node: NodeId },
    /// The discovery session finished; the neighbor table is stable.
    DiscoveryComplete { found: usize },
    /// A remote operation issued by this node resolved.
    OperationResolved { tag: RequestTag, outcome: OpOutcome },
    /// A peer stored a record in our local store.
    RecordStored { slot: u8, owner: NodeId },
    /// A peer deleted a record from our local store.
    RecordDeleted { slot: u8, by: NodeId },
    /// A command from the command channel was rejected.
    CommandRejected { error: Error },
}

/// Error type for node operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A remote operation is already in flight.
    Busy,
    /// Target node id outside 1..=25.
    InvalidTarget,
    /// Node id outside 1..=25.
    InvalidNodeId,
    /// Record text longer than the wire limit.
    TextTooLong,
    /// Encoded frame exceeds the transport MTU.
    FrameTooLarge,
    /// The transport's outgoing queue refused the frame.
    QueueFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Busy => write!(f, "an operation is already pending"),
            Error::InvalidTarget => write!(f, "target id outside 1..=25"),
            Error::InvalidNodeId => write!(f, "node id outside 1..=25"),
            Error::TextTooLong => write!(f, "record text exceeds {} bytes", MAX_RECORD_TEXT),
            Error::FrameTooLarge => write!(f, "encoded frame exceeds transport MTU"),
            Error::QueueFull => write!(f, "transport outgoing queue full"),
        }
    }
}

/// Frame-level counters for monitoring.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkMetrics {
    /// Frames handed to the transport.
    pub sent: u64,
    /// Frames the transport refused (queue full or oversized).
    pub send_failed: u64,
    /// Frames that decoded and passed the filter.
    pub received: u64,
    /// Frames dropped by the group/receiver filter.
    pub filtered: u64,
    /// Frames that failed to decode.
    pub malformed: u64,
}

impl LinkMetrics {
    pub const fn new() -> Self {
        Self {
            sent: 0,
            send_failed: 0,
            received: 0,
            filtered: 0,
            malformed: 0,
        }
    }
}
