#![forbid(unsafe_code)]
#![no_std]
//! packrat - remote record storage for single-channel radio nodes
//!
//! A compact request/response protocol that lets battery-powered radio
//! nodes discover nearby peers and create, retrieve, and delete small
//! text records in each other's fixed-capacity stores, over a lossy
//! shared broadcast medium with no underlying reliability.
//!
//! This crate is `no_std` but **requires the `alloc` crate**. Per-node
//! state is bounded at construction (see [`NodeConfig`](config::NodeConfig));
//! only frame buffers and record text allocate at runtime.
//!
//! # Key Properties
//!
//! - Fixed 6-byte frame header; a 16-bit group id partitions unrelated
//!   deployments sharing the channel
//! - Two-round broadcast discovery; probe answering is always-on
//! - One outstanding remote operation at a time, resolved by a
//!   tag-matched response or a fixed 3-second deadline - never by
//!   blocking
//! - Fully event-driven: the node makes progress only on
//!   {frame received, command received, timer fired} events, so a
//!   cooperative scheduler can interleave it freely
//!
//! # Example (frame codec)
//!
//! ```
//! use packrat::{Body, Header, Packet};
//! use packrat::wire::{Decode, Encode};
//!
//! let probe = Packet {
//!     header: Header { group: 1, tag: 0x2a, sender: 1, receiver: 0 },
//!     body: Body::ProbeRequest,
//! };
//!
//! let bytes = probe.encode_to_vec();
//! assert_eq!(bytes.len(), 6);
//! assert_eq!(Packet::decode_from_slice(&bytes).unwrap(), probe);
//! ```
//!
//! # Example (integration pattern)
//!
//! ```text
//! use packrat::{Command, Node};
//!
//! // Implement Transport, Clock, and Random for your platform...
//!
//! // let mut node = Node::with_identity(transport, random, clock, 1, 1);
//!
//! // Spawn the run loop on your executor:
//! // spawn(async move { node.run().await });
//!
//! // Drive it from the operator task:
//! // node.commands().send(Command::BeginDiscovery).await;
//! // ... read node.events() for outcomes, node.store() for display.
//! ```
//!
//! # Module Structure
//!
//! - [`types`] - Core types (NodeId, Header, Body, Status, etc.)
//! - [`wire`] - Wire format serialization
//! - [`traits`] - Transport, Clock, Random traits
//! - [`node`] - Main Node struct and public API
//! - [`store`] - Fixed-capacity record store
//! - [`neighbors`] - Per-session neighbor table
//! - [`time`] - Timestamp and Duration types
//! - [`config`] - Compile-time capacity configuration
//! - [`debug`] - Protocol trace events

extern crate alloc;

pub mod config;
pub mod debug;
pub mod neighbors;
pub mod node;
pub mod store;
pub mod time;
pub mod traits;
pub mod types;
pub mod wire;

pub use config::{DefaultConfig, NodeConfig, SmallConfig};
pub use neighbors::{InsertOutcome, NeighborTable};
pub use node::{Node, PendingOp};
pub use store::{Record, RecordStore, StoreError};
pub use time::{Duration, Timestamp};
pub use traits::{Clock, Random, Transport};
pub use types::{
    Body, Command, Error, Event, GroupId, Header, LinkMetrics, NodeId, OpKind, OpOutcome, Packet,
    RequestTag, Status, BROADCAST, MAX_NODE_ID, MAX_PACKET_SIZE, MAX_RECORD_TEXT, MIN_NODE_ID,
};
pub use wire::{Decode, DecodeError, Encode};
