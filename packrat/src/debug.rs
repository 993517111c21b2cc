//! Debug events for protocol tracing.
//!
//! Emitted on a bounded channel so test harnesses and the simulator can
//! follow protocol flow without a logger.

use crate::types::{NodeId, OpKind, OpOutcome, RequestTag, Status};

/// Debug events emitted by the node.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    /// Discovery probe broadcast (round is 1-based).
    ProbeSent { round: u8 },
    /// Answered a peer's probe.
    ProbeResponseSent { to: NodeId },
    /// Peer entered the neighbor table.
    NeighborAdded { node: NodeId },
    /// Peer dropped: neighbor table at capacity.
    NeighborTableFull { node: NodeId },
    /// Discovery session concluded.
    DiscoveryFinished { found: usize },
    /// Inbound frame dropped by the group/receiver filter.
    Filtered { reason: &'static str },
    /// Inbound frame failed to decode.
    DecodeFailed { len: usize },
    /// Record request received from a peer.
    RequestReceived { kind: OpKind, from: NodeId },
    /// Operation response sent back to a peer.
    ResponseSent { to: NodeId, status: Status },
    /// Remote operation issued.
    RequestIssued {
        kind: OpKind,
        target: NodeId,
        tag: RequestTag,
    },
    /// Response matched the pending operation.
    ResponseMatched { tag: RequestTag, outcome: OpOutcome },
    /// Response did not match the pending operation.
    ResponseIgnored { reason: &'static str },
    /// Pending operation hit its deadline.
    DeadlineExpired { tag: RequestTag },
}
