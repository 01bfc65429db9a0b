use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;

use bit_set::BitSet;
use petgraph::graph::{self, NodeIndex};
use petgraph::{Graph, Undirected};
use tracing::debug;

use crate::errors::*;
use crate::geometry::Vec2;
use crate::units::{EdgesCount, NodeId, NodesCount};

type NavIndexType = u32;

#[derive(PartialEq, Copy, Clone, Debug)]
pub struct Node {
    pub position: Vec2,
    /// Disabled nodes are skipped by searches and by the connectivity check.
    pub enabled: bool,
}

/// Undirected graph of positioned nodes that searches and agents move over.
///
/// Node ids are dense, in the order the nodes were added. Nodes are never removed, only disabled.
pub struct NavGraph {
    graph: Graph<Node, (), Undirected, NavIndexType>,
    // None when nodes or connections changed since the last check
    fully_connected: Cell<Option<bool>>,
}

impl fmt::Debug for NavGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "NavGraph :: nodes: {}, connections: {}, fully connected: {:?}",
               self.graph.node_count(),
               self.graph.edge_count(),
               self.fully_connected.get())
    }
}

impl Default for NavGraph {
    fn default() -> Self {
        NavGraph::new()
    }
}

impl NavGraph {
    pub fn new() -> NavGraph {
        NavGraph::with_capacity(NodesCount(0), EdgesCount(0))
    }

    pub fn with_capacity(nodes: NodesCount, edges: EdgesCount) -> NavGraph {
        NavGraph {
            graph: Graph::with_capacity(nodes.0, edges.0),
            fully_connected: Cell::new(None),
        }
    }

    /// Add an enabled node.
    pub fn add_node(&mut self, position: Vec2) -> NodeId {
        self.fully_connected.set(None);
        let index = self.graph.add_node(Node { position, enabled: true });
        NodeId(index.index())
    }

    /// Connect two nodes. Connecting nodes that are already connected changes nothing.
    /// Returns false for a connection of a node to itself, which is ignored.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        let a_index = self.index(a)?;
        let b_index = self.index(b)?;
        if a == b {
            return Ok(false);
        }
        self.fully_connected.set(None);
        let _ = self.graph.update_edge(a_index, b_index, ());
        Ok(true)
    }

    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        match (self.index(a), self.index(b)) {
            (Ok(a_index), Ok(b_index)) => self.graph.find_edge(a_index, b_index).is_some(),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.graph.node_count()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        let index = self.index(id)?;
        Ok(&self.graph[index])
    }

    pub fn position(&self, id: NodeId) -> Result<Vec2> {
        self.node(id).map(|n| n.position)
    }

    pub fn is_enabled(&self, id: NodeId) -> Result<bool> {
        self.node(id).map(|n| n.enabled)
    }

    pub fn nodes<'a>(&'a self) -> impl Iterator<Item = (NodeId, &'a Node)> + 'a {
        self.graph
            .node_indices()
            .map(move |i| (NodeId(i.index()), &self.graph[i]))
    }

    /// Every connection once, lower node id first.
    pub fn connections<'a>(&'a self) -> impl Iterator<Item = (NodeId, NodeId)> + 'a {
        self.graph.raw_edges().iter().map(|e: &graph::Edge<(), NavIndexType>| {
            let (a, b) = (e.source().index(), e.target().index());
            (NodeId(a.min(b)), NodeId(a.max(b)))
        })
    }

    /// Nodes connected to `id`, whether enabled or not.
    /// Unknown nodes have no neighbours.
    pub fn neighbours<'a>(&'a self, id: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        let index = self.index(id).ok();
        index.into_iter()
            .flat_map(move |i| self.graph.neighbors(i))
            .map(|i| NodeId(i.index()))
    }

    /// Enabled nodes connected to `id`.
    pub fn enabled_neighbours<'a>(&'a self, id: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        self.neighbours(id).filter(move |n| self.graph[NodeIndex::new(n.0)].enabled)
    }

    /// Enable or disable a node.
    ///
    /// Returns the new fully connected state if it changed, which is what observers of the graph's
    /// connectivity need to hear about.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<Option<bool>> {
        let index = self.index(id)?;
        let was_fully_connected = self.is_fully_connected();
        if self.graph[index].enabled == enabled {
            return Ok(None);
        }
        self.graph[index].enabled = enabled;

        let now_fully_connected = self.check_fully_connected();
        self.fully_connected.set(Some(now_fully_connected));
        debug!(node = id.0, enabled, fully_connected = now_fully_connected, "node toggled");

        if now_fully_connected != was_fully_connected {
            Ok(Some(now_fully_connected))
        } else {
            Ok(None)
        }
    }

    /// Flip a node between enabled and disabled.
    pub fn toggle(&mut self, id: NodeId) -> Result<Option<bool>> {
        let enabled = self.is_enabled(id)?;
        self.set_enabled(id, !enabled)
    }

    /// Can every enabled node reach every other enabled node through enabled nodes?
    /// A graph with no enabled nodes counts as fully connected.
    pub fn is_fully_connected(&self) -> bool {
        match self.fully_connected.get() {
            Some(connected) => connected,
            None => {
                let connected = self.check_fully_connected();
                self.fully_connected.set(Some(connected));
                connected
            }
        }
    }

    /// Recompute connectivity with a breadth first flood from the first enabled node.
    fn check_fully_connected(&self) -> bool {
        let enabled_count = self.graph.node_indices().filter(|&i| self.graph[i].enabled).count();
        let start = match self.graph.node_indices().find(|&i| self.graph[i].enabled) {
            Some(start) => start,
            None => return true,
        };

        let mut visited = BitSet::with_capacity(self.graph.node_count());
        let mut frontier = VecDeque::new();
        visited.insert(start.index());
        frontier.push_back(start);
        let mut reached = 1;

        while let Some(current) = frontier.pop_front() {
            for next in self.graph.neighbors(current) {
                if self.graph[next].enabled && visited.insert(next.index()) {
                    reached += 1;
                    frontier.push_back(next);
                }
            }
        }

        reached == enabled_count
    }

    /// The node closest to a position, disabled nodes included.
    pub fn nearest_node(&self, position: Vec2) -> Option<NodeId> {
        self.nodes()
            .map(|(id, n)| (id, n.position.distance_squared(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }

    #[inline]
    fn index(&self, id: NodeId) -> Result<NodeIndex<NavIndexType>> {
        if self.contains(id) {
            Ok(NodeIndex::new(id.0))
        } else {
            bail!(ErrorKind::UnknownNode(id.0))
        }
    }
}
