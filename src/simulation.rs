//! Ties a generated dungeon, its navigation graph and one agent together, driven by user interaction
//! and a fixed tick.

use std::collections::VecDeque;

use rand::seq::IteratorRandom;
use tracing::{debug, info};

use crate::agent::{AgentEvent, NavigatingAgent, RetargetPolicy};
use crate::config::DungeonConfig;
use crate::dungeon::{generate, Dungeon};
use crate::errors::*;
use crate::generators::rng_from_seed;
use crate::graph_builders::build_graph;
use crate::navgraph::NavGraph;
use crate::pathing::{Path, PathFinder};
use crate::units::NodeId;

/// Distance per tick an agent covers by default, in cells.
pub const DEFAULT_AGENT_SPEED: f32 = 0.5;

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Interaction {
    /// Primary action on a node: send the agent there.
    NodeSelected(NodeId),
    /// Secondary action on a node: flip it between enabled and disabled.
    NodeToggled(NodeId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationEvent {
    ConnectivityChanged { fully_connected: bool },
    PathComputed { target: NodeId, path: Option<Path> },
    ArrivedAtHop(NodeId),
    ReachedTarget(NodeId),
}

impl From<AgentEvent> for SimulationEvent {
    fn from(event: AgentEvent) -> SimulationEvent {
        match event {
            AgentEvent::PathComputed { target, path } => SimulationEvent::PathComputed { target, path },
            AgentEvent::ArrivedAtHop(node) => SimulationEvent::ArrivedAtHop(node),
            AgentEvent::ReachedTarget(node) => SimulationEvent::ReachedTarget(node),
        }
    }
}

#[derive(Debug)]
pub struct Simulation {
    dungeon: Dungeon,
    graph: NavGraph,
    agent: NavigatingAgent,
    interactions: VecDeque<Interaction>,
    events: Vec<SimulationEvent>,
    ticks: u64,
}

impl Simulation {
    /// Generate a dungeon and its graph and place the agent on a random enabled node, chosen from the
    /// dungeon's seed.
    pub fn new(config: &DungeonConfig, finder: Box<dyn PathFinder>, policy: RetargetPolicy) -> Result<Simulation> {
        let dungeon = generate(config)?;
        let graph = build_graph(&dungeon, config.graph_strategy)?;

        let mut rng = rng_from_seed(dungeon.seed());
        let start = graph.nodes()
            .filter(|&(_, node)| node.enabled)
            .map(|(id, _)| id)
            .choose(&mut rng)
            .ok_or_else(|| Error::from(ErrorKind::EmptyGraph))?;

        Simulation::with_parts(dungeon, graph, start, finder, policy)
    }

    /// Run a simulation over an existing dungeon and graph with the agent starting on `start`.
    pub fn with_parts(dungeon: Dungeon,
                      graph: NavGraph,
                      start: NodeId,
                      finder: Box<dyn PathFinder>,
                      policy: RetargetPolicy)
                      -> Result<Simulation> {
        let agent = NavigatingAgent::new(&graph, start, finder, policy, DEFAULT_AGENT_SPEED)?;
        info!(nodes = graph.node_count(),
              connections = graph.connection_count(),
              fully_connected = graph.is_fully_connected(),
              start = start.0,
              finder = agent.finder_name(),
              policy = ?agent.policy(),
              "simulation ready");
        Ok(Simulation {
            dungeon,
            graph,
            agent,
            interactions: VecDeque::new(),
            events: vec![],
            ticks: 0,
        })
    }

    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    pub fn graph(&self) -> &NavGraph {
        &self.graph
    }

    pub fn agent(&self) -> &NavigatingAgent {
        &self.agent
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn on_node_selected(&mut self, node: NodeId) {
        self.interactions.push_back(Interaction::NodeSelected(node));
    }

    pub fn on_node_toggled(&mut self, node: NodeId) {
        self.interactions.push_back(Interaction::NodeToggled(node));
    }

    /// Apply the interactions received since the last tick in order, then step the agent once.
    pub fn tick(&mut self) -> Result<()> {
        self.ticks += 1;
        while let Some(interaction) = self.interactions.pop_front() {
            debug!(?interaction, tick = self.ticks, "interaction");
            match interaction {
                Interaction::NodeSelected(node) => {
                    let produced = self.agent.request_target(&self.graph, node)?;
                    self.events.extend(produced.into_iter().map(SimulationEvent::from));
                }
                Interaction::NodeToggled(node) => {
                    if let Some(fully_connected) = self.graph.toggle(node)? {
                        info!(fully_connected, "connectivity changed");
                        self.events.push(SimulationEvent::ConnectivityChanged { fully_connected });
                    }
                }
            }
        }

        let produced = self.agent.step(&self.graph)?;
        self.events.extend(produced.into_iter().map(SimulationEvent::from));
        Ok(())
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::{GraphStrategy, QualityTier};
    use crate::geometry::Vec2;
    use crate::pathing::BreadthFirst;
    use crate::units::{Height, Width};

    fn line_simulation() -> Simulation {
        let mut g = NavGraph::new();
        let ids = (0..3).map(|i| g.add_node(Vec2::new(i as f32, 0.0))).collect::<Vec<_>>();
        g.connect(ids[0], ids[1]).unwrap();
        g.connect(ids[1], ids[2]).unwrap();
        let dungeon = Dungeon::from_parts(Width(3), Height(1), vec![], vec![], vec![]);
        Simulation::with_parts(dungeon, g, NodeId(0), Box::new(BreadthFirst), RetargetPolicy::Queue).unwrap()
    }

    #[test]
    fn selecting_a_node_sends_the_agent_there() {
        let mut sim = line_simulation();
        sim.on_node_selected(NodeId(2));
        assert!(sim.drain_events().is_empty());

        for _ in 0..20 {
            sim.tick().unwrap();
        }
        let events = sim.drain_events();
        assert_eq!(events.first(),
                   Some(&SimulationEvent::PathComputed {
                       target: NodeId(2),
                       path: Some(vec![NodeId(0), NodeId(1), NodeId(2)]),
                   }));
        assert!(events.contains(&SimulationEvent::ArrivedAtHop(NodeId(1))));
        assert_eq!(events.last(), Some(&SimulationEvent::ReachedTarget(NodeId(2))));
        assert!(sim.drain_events().is_empty());
        assert_eq!(sim.ticks(), 20);
    }

    #[test]
    fn toggling_a_bridge_reports_connectivity() {
        let mut sim = line_simulation();
        sim.on_node_toggled(NodeId(1));
        sim.on_node_selected(NodeId(2));
        sim.tick().unwrap();
        assert_eq!(sim.drain_events(),
                   vec![SimulationEvent::ConnectivityChanged { fully_connected: false },
                        SimulationEvent::PathComputed { target: NodeId(2), path: None }]);
        assert!(sim.agent().is_idle());

        sim.on_node_toggled(NodeId(1));
        sim.tick().unwrap();
        assert_eq!(sim.drain_events(), vec![SimulationEvent::ConnectivityChanged { fully_connected: true }]);
    }

    #[test]
    fn unknown_nodes_fail_the_tick() {
        let mut sim = line_simulation();
        sim.on_node_toggled(NodeId(7));
        assert!(sim.tick().is_err());
    }

    #[test]
    fn generated_simulation_places_the_agent_on_the_graph() {
        let config = DungeonConfig {
            width: Width(40),
            height: Height(30),
            minimum_room_size: 5,
            seed: Some(99),
            quality: QualityTier::WithShrinkAndHallways,
            graph_strategy: GraphStrategy::LowLevelGrid,
            ..DungeonConfig::default()
        };
        let sim = Simulation::new(&config, Box::new(BreadthFirst), RetargetPolicy::Restart).unwrap();
        let again = Simulation::new(&config, Box::new(BreadthFirst), RetargetPolicy::Restart).unwrap();
        assert!(sim.agent().is_idle());
        assert_eq!(sim.agent().state(), again.agent().state());
        assert_eq!(sim.dungeon(), again.dungeon());
        assert!(sim.graph().node_count() > 0);
    }
}
