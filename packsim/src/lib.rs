//! packsim - Discrete event network simulator for packrat protocol testing.
//!
//! This crate provides a deterministic, discrete-event simulator for
//! exercising the packrat protocol across many nodes without real-time
//! delays or a radio.
//!
//! # Features
//!
//! - **Discrete event simulation**: no real-time delays, deterministic
//!   ordering via a `(time, sequence)` heap
//! - **Shared-medium model**: every transmitted frame is broadcast to
//!   all topology neighbors; addressing is the receiver's problem
//! - **Link properties**: frame loss and delay per link, partitions
//! - **Scenario builder**: node fleets, scheduled operator commands,
//!   scheduled link failures
//! - **Metrics**: frames sent/dropped/delivered
//!
//! # Example
//!
//! ```
//! use packsim::{ScenarioBuilder, Duration};
//!
//! // Three idle nodes: a quiet network sends nothing.
//! let result = ScenarioBuilder::new(3)
//!     .with_seed(42)
//!     .fully_connected()
//!     .run_for(Duration::from_secs(2));
//!
//! assert_eq!(result.metrics.messages_sent, 0);
//! ```
//!
//! # Architecture
//!
//! The simulator pops events ordered by (time, sequence_number):
//! 1. Advance simulation time
//! 2. Process the event (call the node's handler directly)
//! 3. Collect the node's outgoing frames
//! 4. Broadcast each frame through the topology, scheduling deliveries
//!
//! Key insight: handlers (`handle_transport_rx`, `handle_timer`,
//! `handle_command`) are called directly instead of using the async
//! `node.run()` loop, so thousands of simulated seconds cost nothing.

pub mod event;
pub mod metrics;
pub mod node;
pub mod scenario;
pub mod sim;
pub mod topology;

// Re-export main types
pub use event::{Event, ScenarioAction, ScheduledEvent};
pub use metrics::{SimMetrics, SimulationResult};
pub use node::SimNode;
pub use packrat::{Duration, NodeId, Timestamp};
pub use scenario::{simple_scenario, ScenarioBuilder};
pub use sim::Simulator;
pub use topology::{Link, Topology};
