//! Discrete event simulator for packrat networks.

use std::collections::BinaryHeap;

use hashbrown::HashMap;
use packrat::{Command, Duration, GroupId, NodeId, Timestamp};

use crate::event::{Event, ScenarioAction, ScheduledEvent, SequenceNumber};
use crate::metrics::{SimMetrics, SimulationResult};
use crate::node::SimNode;
use crate::topology::Topology;

/// How often each node's timer fires, absent any tighter deadline.
const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_millis(250);

/// Discrete event simulator for packrat networks.
///
/// Drives nodes by calling their `handle_transport_rx` / `handle_timer`
/// / `handle_command` entry points directly, with simulated time from a
/// `(time, sequence)`-ordered event heap. Every transmitted frame is
/// broadcast to all topology neighbors with active links, subject to
/// per-link loss and delay - the shared-medium model the protocol is
/// written for.
pub struct Simulator {
    /// All nodes in the simulation.
    nodes: HashMap<NodeId, SimNode>,
    /// Network topology.
    topology: Topology,
    /// Current simulation time.
    current_time: Timestamp,
    /// Priority queue of scheduled events.
    event_queue: BinaryHeap<ScheduledEvent>,
    /// Collected metrics.
    metrics: SimMetrics,
    /// Next sequence number for event ordering.
    next_seq: u64,
    /// RNG state for frame loss.
    rng_state: u64,
    /// Interval between periodic per-node timer fires.
    timer_interval: Duration,
}

impl Simulator {
    /// Create a new simulator with given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            topology: Topology::new(),
            current_time: Timestamp::ZERO,
            event_queue: BinaryHeap::new(),
            metrics: SimMetrics::new(),
            next_seq: 0,
            rng_state: seed,
            timer_interval: DEFAULT_TIMER_INTERVAL,
        }
    }

    /// Set the network topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the periodic timer interval.
    pub fn with_timer_interval(mut self, interval: Duration) -> Self {
        self.timer_interval = interval;
        self
    }

    /// Add a node with the given identity. Returns its id.
    pub fn add_node(&mut self, node_id: NodeId, group_id: GroupId) -> NodeId {
        let seed = self
            .rng_state
            .wrapping_add((node_id as u64).wrapping_mul(0x9E3779B97F4A7C15));
        let node = SimNode::new(node_id, group_id, seed, self.current_time);
        self.nodes.insert(node_id, node);

        self.schedule_timer(node_id, self.current_time + self.timer_interval);
        node_id
    }

    /// Get a reference to a node.
    pub fn node(&self, id: &NodeId) -> Option<&SimNode> {
        self.nodes.get(id)
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut SimNode> {
        self.nodes.get_mut(id)
    }

    /// Get all node IDs.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Get the current simulation time.
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// Get the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get mutable topology.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Get collected metrics.
    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    /// Schedule an event.
    pub fn schedule(&mut self, time: Timestamp, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    /// Schedule a timer event for a node.
    fn schedule_timer(&mut self, node: NodeId, time: Timestamp) {
        self.schedule(time, Event::TimerFire { node });
    }

    /// Schedule an operator command at a node.
    pub fn schedule_command(&mut self, time: Timestamp, node: NodeId, command: Command) {
        self.schedule(time, Event::Command { node, command });
    }

    /// Schedule a scenario action.
    pub fn schedule_action(&mut self, time: Timestamp, action: ScenarioAction) {
        self.schedule(time, Event::ScenarioAction(action));
    }

    /// Run simulation until specified time.
    pub fn run_until(&mut self, end_time: Timestamp) -> SimulationResult {
        while let Some(event) = self.event_queue.peek() {
            if event.time > end_time {
                break;
            }

            if let Some(event) = self.event_queue.pop() {
                self.advance_time(event.time);
                self.process_event(event.event);
            }
        }

        // Advance to end_time even if no more events.
        self.advance_time(end_time);

        SimulationResult {
            end_time: self.current_time,
            metrics: self.metrics.clone(),
            queue_exhausted: self.event_queue.peek().is_none(),
        }
    }

    /// Run simulation for specified duration.
    pub fn run_for(&mut self, duration: Duration) -> SimulationResult {
        self.run_until(self.current_time + duration)
    }

    /// Advance simulation time.
    fn advance_time(&mut self, time: Timestamp) {
        if time > self.current_time {
            self.current_time = time;
        }
    }

    /// Process a single event.
    fn process_event(&mut self, event: Event) {
        match event {
            Event::MessageDelivery { to, data, from: _ } => {
                self.deliver_message(to, data);
            }
            Event::TimerFire { node } => {
                self.fire_timer(node);
            }
            Event::Command { node, command } => {
                self.run_command(node, command);
            }
            Event::ScenarioAction(action) => {
                self.execute_action(action);
            }
        }
    }

    /// Deliver a frame to a node.
    fn deliver_message(&mut self, to: NodeId, data: Vec<u8>) {
        let now = self.current_time;
        if let Some(node) = self.nodes.get_mut(&to) {
            node.handle_transport_rx(&data, now);
            self.metrics.messages_delivered += 1;
        }
        // Collect and route outgoing frames (separate borrow).
        self.collect_outgoing(to);
    }

    /// Fire timer for a node and schedule the next tick.
    fn fire_timer(&mut self, node_id: NodeId) {
        let now = self.current_time;
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.handle_timer(now);
        } else {
            return;
        }
        self.collect_outgoing(node_id);
        self.schedule_timer(node_id, now + self.timer_interval);
    }

    /// Run an operator command at a node.
    fn run_command(&mut self, node_id: NodeId, command: Command) {
        let now = self.current_time;
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.handle_command(command, now);
        }
        self.collect_outgoing(node_id);
    }

    /// Collect outgoing frames from a node and put them on the air.
    fn collect_outgoing(&mut self, sender: NodeId) {
        let frames = match self.nodes.get(&sender) {
            Some(node) => node.take_outgoing(),
            None => return,
        };

        for frame in frames {
            self.route_message(sender, frame);
        }
    }

    /// Broadcast a frame to every neighbor with an active link.
    ///
    /// The medium carries every frame to every listener in range;
    /// unicast addressing is the receiver's filter, not the channel's.
    fn route_message(&mut self, sender: NodeId, data: Vec<u8>) {
        self.metrics.messages_sent += 1;

        let neighbors = self.topology.neighbors(sender);
        let current_time = self.current_time;

        let mut deliveries = Vec::with_capacity(neighbors.len());
        let mut dropped_count = 0u64;

        for neighbor in neighbors {
            if let Some(link) = self.topology.get_link(sender, neighbor) {
                if !link.active {
                    continue;
                }

                let loss_rate = link.loss_rate;
                let delay = link.delay;

                if loss_rate > 0.0 && self.random_f64() < loss_rate {
                    dropped_count += 1;
                    continue;
                }

                deliveries.push((neighbor, delay));
            }
        }

        self.metrics.messages_dropped += dropped_count;

        for (neighbor, delay) in deliveries {
            self.schedule(
                current_time + delay,
                Event::MessageDelivery {
                    to: neighbor,
                    from: sender,
                    data: data.clone(),
                },
            );
        }
    }

    /// Execute a scenario action.
    fn execute_action(&mut self, action: ScenarioAction) {
        match action {
            ScenarioAction::Partition { groups } => {
                self.topology.partition(&groups);
            }
            ScenarioAction::HealPartition => {
                self.topology.heal();
            }
            ScenarioAction::DisableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = false;
                }
            }
            ScenarioAction::EnableLink { from, to } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.active = true;
                }
            }
            ScenarioAction::SetLossRate { from, to, rate } => {
                if let Some(link) = self.topology.get_link_mut(from, to) {
                    link.loss_rate = rate.clamp(0.0, 1.0);
                }
            }
        }
    }

    /// Generate a random f64 in [0, 1).
    fn random_f64(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Link;

    #[test]
    fn test_simulator_creation() {
        let sim = Simulator::new(42);
        assert_eq!(sim.current_time(), Timestamp::ZERO);
        assert!(sim.node_ids().is_empty());
    }

    #[test]
    fn test_add_nodes() {
        let mut sim = Simulator::new(42);
        sim.add_node(1, 1);
        sim.add_node(2, 1);

        assert_eq!(sim.node_ids().len(), 2);
        assert!(sim.node(&1).is_some());
        assert!(sim.node(&3).is_none());
    }

    #[test]
    fn test_run_advances_time() {
        let mut sim = Simulator::new(42);
        sim.add_node(1, 1);
        let result = sim.run_for(Duration::from_secs(1));
        assert_eq!(result.end_time, Timestamp::from_secs(1));
    }

    #[test]
    fn test_quiet_network_sends_nothing() {
        let topo = Topology::fully_connected(&[1, 2]);
        let mut sim = Simulator::new(42).with_topology(topo);
        sim.add_node(1, 1);
        sim.add_node(2, 1);

        let result = sim.run_for(Duration::from_secs(5));
        assert_eq!(result.metrics.messages_sent, 0);
    }

    #[test]
    fn test_probe_crosses_the_link() {
        let topo = Topology::fully_connected(&[1, 2]);
        let mut sim = Simulator::new(42).with_topology(topo);
        sim.add_node(1, 1);
        sim.add_node(2, 1);

        sim.schedule_command(Timestamp::from_millis(10), 1, Command::BeginDiscovery);
        sim.run_for(Duration::from_secs(1));

        // Probe went out and the response came back.
        assert!(sim.metrics().messages_delivered >= 2);
        assert_eq!(sim.node(&1).unwrap().neighbor_ids(), vec![2]);
    }

    #[test]
    fn test_total_loss_drops_everything() {
        let mut topo = Topology::new();
        topo.add_link(1, 2, Link::new().with_loss_rate(1.0));
        let mut sim = Simulator::new(42).with_topology(topo);
        sim.add_node(1, 1);
        sim.add_node(2, 1);

        sim.schedule_command(Timestamp::from_millis(10), 1, Command::BeginDiscovery);
        let result = sim.run_for(Duration::from_secs(10));

        assert!(result.metrics.messages_dropped >= 2);
        assert_eq!(result.metrics.messages_delivered, 0);
        assert!(sim.node(&1).unwrap().neighbor_ids().is_empty());
    }

    #[test]
    fn test_scenario_action_disables_link() {
        let topo = Topology::fully_connected(&[1, 2]);
        let mut sim = Simulator::new(42).with_topology(topo);
        sim.add_node(1, 1);
        sim.add_node(2, 1);

        sim.schedule_action(
            Timestamp::from_millis(5),
            ScenarioAction::DisableLink { from: 1, to: 2 },
        );
        sim.run_for(Duration::from_secs(1));

        assert!(!sim.topology().is_connected(1, 2));
    }
}
