//! Scenario builder for setting up and running simulations.

use packrat::{Command, Duration, GroupId, NodeId, Timestamp, MAX_NODE_ID};

use crate::event::ScenarioAction;
use crate::metrics::SimulationResult;
use crate::sim::Simulator;
use crate::topology::Topology;

/// Type of topology to generate.
#[derive(Debug, Clone)]
enum TopologyType {
    /// Everyone hears everyone.
    FullyConnected,
    /// Each node hears only its chain neighbors.
    Chain,
    /// First node is the hub.
    Star,
    /// Custom topology provided by the caller.
    Custom(Topology),
}

/// Builder for simulation scenarios.
///
/// Nodes are numbered 1..=N and all share one group id (use the
/// simulator directly for mixed-group setups).
pub struct ScenarioBuilder {
    /// Number of nodes to create.
    num_nodes: usize,
    /// Group id shared by every node.
    group: GroupId,
    /// RNG seed for determinism.
    seed: u64,
    /// Topology type to generate (must be explicitly specified).
    topology_type: Option<TopologyType>,
    /// Global frame loss rate.
    loss_rate: f64,
    /// Link delay.
    delay: Duration,
    /// Scheduled operator commands.
    commands: Vec<(Timestamp, NodeId, Command)>,
    /// Scheduled scenario actions.
    actions: Vec<(Timestamp, ScenarioAction)>,
}

impl ScenarioBuilder {
    /// Create a new scenario with the specified number of nodes.
    ///
    /// Note: You MUST specify a topology before calling build().
    /// Use `.fully_connected()`, `.chain_topology()`, `.star_topology()`,
    /// or `.topology(custom)`.
    pub fn new(num_nodes: usize) -> Self {
        assert!(
            num_nodes <= MAX_NODE_ID as usize,
            "node ids are limited to 1..={}",
            MAX_NODE_ID
        );
        Self {
            num_nodes,
            group: 1,
            seed: 42,
            topology_type: None,
            loss_rate: 0.0,
            delay: Duration::from_millis(1),
            commands: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the group id shared by all nodes.
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = group;
        self
    }

    /// Set a custom network topology.
    pub fn topology(mut self, topo: Topology) -> Self {
        self.topology_type = Some(TopologyType::Custom(topo));
        self
    }

    /// Use fully connected topology.
    pub fn fully_connected(mut self) -> Self {
        self.topology_type = Some(TopologyType::FullyConnected);
        self
    }

    /// Use chain topology (each node hears only its neighbors).
    pub fn chain_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Chain);
        self
    }

    /// Use star topology (node 1 is the hub).
    pub fn star_topology(mut self) -> Self {
        self.topology_type = Some(TopologyType::Star);
        self
    }

    /// Set global frame loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set link delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Schedule an operator command at a node.
    pub fn command_at(mut self, time: Timestamp, node: NodeId, command: Command) -> Self {
        self.commands.push((time, node, command));
        self
    }

    /// Schedule a scenario action.
    pub fn action_at(mut self, time: Timestamp, action: ScenarioAction) -> Self {
        self.actions.push((time, action));
        self
    }

    /// Build the simulator with all nodes and topology.
    pub fn build(self) -> (Simulator, Vec<NodeId>) {
        let node_ids: Vec<NodeId> = (1..=self.num_nodes as NodeId).collect();

        let mut topo = match self.topology_type {
            Some(TopologyType::FullyConnected) => Topology::fully_connected(&node_ids),
            Some(TopologyType::Chain) => Topology::chain(&node_ids),
            Some(TopologyType::Star) => Topology::star(&node_ids),
            Some(TopologyType::Custom(t)) => t,
            None => panic!(
                "Topology must be explicitly specified. \
                Use .fully_connected(), .chain_topology(), .star_topology(), or .topology()"
            ),
        };

        if self.loss_rate > 0.0 {
            topo.set_global_loss_rate(self.loss_rate);
        }

        // Apply the custom delay everywhere.
        for i in 0..node_ids.len() {
            for j in (i + 1)..node_ids.len() {
                if let Some(link) = topo.get_link_mut(node_ids[i], node_ids[j]) {
                    link.delay = self.delay;
                }
            }
        }

        let mut sim = Simulator::new(self.seed).with_topology(topo);
        for &id in &node_ids {
            sim.add_node(id, self.group);
        }

        for (time, node, command) in self.commands {
            sim.schedule_command(time, node, command);
        }
        for (time, action) in self.actions {
            sim.schedule_action(time, action);
        }

        (sim, node_ids)
    }

    /// Build and run the simulation for the specified duration.
    pub fn run_for(self, duration: Duration) -> SimulationResult {
        let (mut sim, _) = self.build();
        sim.run_for(duration)
    }
}

/// Convenience function for a simple N-node fully connected scenario.
pub fn simple_scenario(num_nodes: usize) -> ScenarioBuilder {
    ScenarioBuilder::new(num_nodes).fully_connected()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_builder_basic() {
        let (sim, nodes) = ScenarioBuilder::new(3)
            .with_seed(123)
            .fully_connected()
            .build();

        assert_eq!(nodes, vec![1, 2, 3]);
        assert_eq!(sim.node_ids().len(), 3);
        assert!(sim.topology().is_connected(1, 3));
    }

    #[test]
    fn test_scenario_run_for() {
        let result = simple_scenario(2).run_for(Duration::from_secs(1));
        assert!(result.end_time >= Timestamp::from_secs(1));
        assert_eq!(result.metrics.messages_sent, 0);
    }

    #[test]
    fn test_scenario_with_loss() {
        let (sim, nodes) = ScenarioBuilder::new(2)
            .fully_connected()
            .with_loss_rate(0.5)
            .build();

        let link = sim.topology().get_link(nodes[0], nodes[1]).unwrap();
        assert_eq!(link.loss_rate, 0.5);
    }

    #[test]
    fn test_scenario_schedules_commands() {
        let (mut sim, nodes) = ScenarioBuilder::new(2)
            .fully_connected()
            .command_at(Timestamp::from_millis(10), 1, Command::BeginDiscovery)
            .build();

        sim.run_for(Duration::from_secs(10));
        assert_eq!(sim.node(&nodes[0]).unwrap().neighbor_ids(), vec![2]);
    }

    #[test]
    #[should_panic(expected = "Topology must be explicitly specified")]
    fn test_missing_topology_panics() {
        let _ = ScenarioBuilder::new(2).build();
    }
}
