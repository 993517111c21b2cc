//! Network topology and link properties.

use hashbrown::HashMap;
use packrat::{Duration, NodeId};

/// Properties of a radio link between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    /// Frame loss rate (0.0 to 1.0).
    pub loss_rate: f64,
    /// Propagation plus processing delay.
    pub delay: Duration,
    /// Whether the link is currently usable.
    pub active: bool,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            delay: Duration::from_millis(1),
            active: true,
        }
    }
}

impl Link {
    /// Create a new link with default properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loss rate.
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Set the delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set whether the link is active.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Network topology defining which nodes can hear each other.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Links between pairs of nodes (bidirectional).
    links: HashMap<(NodeId, NodeId), Link>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
        }
    }

    /// Create a fully connected topology for the given nodes.
    pub fn fully_connected(nodes: &[NodeId]) -> Self {
        let mut topo = Self::new();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in nodes.iter().skip(i + 1) {
                topo.add_link(a, b, Link::default());
            }
        }
        topo
    }

    /// Create a chain topology (each node hears only its neighbors).
    pub fn chain(nodes: &[NodeId]) -> Self {
        let mut topo = Self::new();
        for window in nodes.windows(2) {
            topo.add_link(window[0], window[1], Link::default());
        }
        topo
    }

    /// Create a star topology (first node is hub, hears all others).
    pub fn star(nodes: &[NodeId]) -> Self {
        let mut topo = Self::new();
        if nodes.is_empty() {
            return topo;
        }
        let hub = nodes[0];
        for &spoke in nodes.iter().skip(1) {
            topo.add_link(hub, spoke, Link::default());
        }
        topo
    }

    /// Add a bidirectional link between two nodes.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, link: Link) {
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.insert((lo, hi), link);
    }

    /// Get a link between two nodes.
    pub fn get_link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.get(&(lo, hi))
    }

    /// Get a mutable link between two nodes.
    pub fn get_link_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Link> {
        let (lo, hi) = Self::canonical_pair(a, b);
        self.links.get_mut(&(lo, hi))
    }

    /// Check if two nodes are connected (link exists and is active).
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.get_link(a, b).is_some_and(|link| link.active)
    }

    /// All nodes a given node can reach over active links.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for (&(a, b), link) in &self.links {
            if !link.active {
                continue;
            }
            if a == node {
                result.push(b);
            } else if b == node {
                result.push(a);
            }
        }
        result
    }

    /// Deactivate every link that crosses group boundaries.
    pub fn partition(&mut self, groups: &[Vec<NodeId>]) {
        let group_of = |node: NodeId| groups.iter().position(|g| g.contains(&node));
        for (&(a, b), link) in self.links.iter_mut() {
            if group_of(a) != group_of(b) {
                link.active = false;
            }
        }
    }

    /// Reactivate every link.
    pub fn heal(&mut self) {
        for link in self.links.values_mut() {
            link.active = true;
        }
    }

    /// Set the loss rate on every link.
    pub fn set_global_loss_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        for link in self.links.values_mut() {
            link.loss_rate = rate;
        }
    }

    fn canonical_pair(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        (a.min(b), a.max(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_connected() {
        let topo = Topology::fully_connected(&[1, 2, 3]);
        assert!(topo.is_connected(1, 2));
        assert!(topo.is_connected(2, 3));
        assert!(topo.is_connected(1, 3));
        assert_eq!(topo.neighbors(1).len(), 2);
    }

    #[test]
    fn test_chain() {
        let topo = Topology::chain(&[1, 2, 3]);
        assert!(topo.is_connected(1, 2));
        assert!(topo.is_connected(2, 3));
        assert!(!topo.is_connected(1, 3));
    }

    #[test]
    fn test_star() {
        let topo = Topology::star(&[1, 2, 3, 4]);
        assert_eq!(topo.neighbors(1).len(), 3);
        assert!(!topo.is_connected(2, 3));
    }

    #[test]
    fn test_link_direction_is_canonical() {
        let mut topo = Topology::new();
        topo.add_link(5, 2, Link::new().with_loss_rate(0.25));
        assert_eq!(topo.get_link(2, 5).unwrap().loss_rate, 0.25);
        assert_eq!(topo.get_link(5, 2).unwrap().loss_rate, 0.25);
    }

    #[test]
    fn test_partition_and_heal() {
        let mut topo = Topology::fully_connected(&[1, 2, 3, 4]);
        topo.partition(&[vec![1, 2], vec![3, 4]]);

        assert!(topo.is_connected(1, 2));
        assert!(topo.is_connected(3, 4));
        assert!(!topo.is_connected(1, 3));
        assert!(!topo.is_connected(2, 4));

        topo.heal();
        assert!(topo.is_connected(1, 3));
    }

    #[test]
    fn test_inactive_links_are_not_neighbors() {
        let mut topo = Topology::fully_connected(&[1, 2, 3]);
        topo.get_link_mut(1, 2).unwrap().active = false;
        let neighbors = topo.neighbors(1);
        assert_eq!(neighbors, vec![3]);
    }
}
