use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::errors::*;
use crate::geometry::Vec2;
use crate::navgraph::NavGraph;
use crate::pathing::{Path, PathFinder};
use crate::units::NodeId;

/// What a moving agent does with a new target.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum RetargetPolicy {
    /// Drop the request.
    Ignore,
    /// Finish the current route, then head for the queued targets in order.
    Queue,
    /// Abandon the current route and path from whichever end of the current hop is closer.
    Restart,
}

impl FromStr for RetargetPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<RetargetPolicy> {
        match s.to_lowercase().as_ref() {
            "ignore" => Ok(RetargetPolicy::Ignore),
            "queue" => Ok(RetargetPolicy::Queue),
            "restart" => Ok(RetargetPolicy::Restart),
            _ => Err(ErrorKind::ParseSetting("retarget policy", s.to_string()).into()),
        }
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum AgentState {
    Idle { at: NodeId },
    /// Travelling along the hop from `from` to `to`.
    Moving { from: NodeId, to: NodeId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AgentEvent {
    /// A path was searched for a new target, `None` if the target cannot be reached.
    PathComputed { target: NodeId, path: Option<Path> },
    /// Reached a node along the route that is not the final target.
    ArrivedAtHop(NodeId),
    ReachedTarget(NodeId),
}

/// Moves along navigation graph paths at a fixed speed, one step per tick.
pub struct NavigatingAgent {
    finder: Box<dyn PathFinder>,
    policy: RetargetPolicy,
    speed: f32,
    position: Vec2,
    state: AgentState,
    // Hops still to travel after the current one
    remaining: VecDeque<NodeId>,
    queued_targets: VecDeque<NodeId>,
    route: Path,
}

impl fmt::Debug for NavigatingAgent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "NavigatingAgent :: finder: {}, policy: {:?}, state: {:?}, position: {:?}, remaining: {:?}",
               self.finder.name(),
               self.policy,
               self.state,
               self.position,
               self.remaining)
    }
}

impl NavigatingAgent {
    /// An idle agent standing on `start`. `speed` is the distance covered per step.
    pub fn new(graph: &NavGraph,
               start: NodeId,
               finder: Box<dyn PathFinder>,
               policy: RetargetPolicy,
               speed: f32)
               -> Result<NavigatingAgent> {
        let position = graph.position(start)?;
        Ok(NavigatingAgent {
            finder,
            policy,
            speed,
            position,
            state: AgentState::Idle { at: start },
            remaining: VecDeque::new(),
            queued_targets: VecDeque::new(),
            route: vec![],
        })
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn policy(&self) -> RetargetPolicy {
        self.policy
    }

    pub fn is_idle(&self) -> bool {
        match self.state {
            AgentState::Idle { .. } => true,
            AgentState::Moving { .. } => false,
        }
    }

    /// The full path of the route currently being travelled, empty when idle.
    pub fn route(&self) -> &[NodeId] {
        &self.route
    }

    pub fn queued_targets(&self) -> impl Iterator<Item = &NodeId> {
        self.queued_targets.iter()
    }

    pub fn finder_name(&self) -> &'static str {
        self.finder.name()
    }

    /// Ask the agent to go to `target`.
    pub fn request_target(&mut self, graph: &NavGraph, target: NodeId) -> Result<Vec<AgentEvent>> {
        if !graph.contains(target) {
            bail!(ErrorKind::UnknownNode(target.0));
        }

        match self.state {
            AgentState::Idle { at } => self.start_route(graph, at, target),
            AgentState::Moving { from, to } => {
                match self.policy {
                    RetargetPolicy::Ignore => {
                        debug!(target = target.0, "ignored new target while moving");
                        Ok(vec![])
                    }
                    RetargetPolicy::Queue => {
                        self.queued_targets.push_back(target);
                        Ok(vec![])
                    }
                    RetargetPolicy::Restart => self.restart_route(graph, from, to, target),
                }
            }
        }
    }

    fn start_route(&mut self, graph: &NavGraph, at: NodeId, target: NodeId) -> Result<Vec<AgentEvent>> {
        let path = self.finder.find_path(graph, at, target)?;
        if let Some(ref p) = path {
            if p.len() > 1 {
                self.route = p.clone();
                self.remaining = p[2..].iter().cloned().collect();
                self.state = AgentState::Moving { from: at, to: p[1] };
                debug!(from = at.0, target = target.0, hops = p.len() - 1, "route started");
            }
        }
        Ok(vec![AgentEvent::PathComputed { target, path }])
    }

    fn restart_route(&mut self,
                     graph: &NavGraph,
                     from: NodeId,
                     to: NodeId,
                     target: NodeId)
                     -> Result<Vec<AgentEvent>> {
        let from_distance = graph.position(from)?.distance_squared(self.position);
        let to_distance = graph.position(to)?.distance_squared(self.position);
        let anchor = if from_distance < to_distance { from } else { to };

        let path = self.finder.find_path(graph, anchor, target)?;
        if let Some(ref p) = path {
            // Head back to the anchor first, then along the new path
            self.route = p.clone();
            self.remaining = p[1..].iter().cloned().collect();
            self.state = AgentState::Moving { from: if anchor == to { from } else { to }, to: anchor };
            self.queued_targets.clear();
            debug!(anchor = anchor.0, target = target.0, hops = p.len() - 1, "route restarted");
        }
        Ok(vec![AgentEvent::PathComputed { target, path }])
    }

    /// Move towards the current hop by at most `speed`. Does nothing while idle.
    pub fn step(&mut self, graph: &NavGraph) -> Result<Vec<AgentEvent>> {
        let to = match self.state {
            AgentState::Idle { .. } => return Ok(vec![]),
            AgentState::Moving { to, .. } => to,
        };

        let destination = graph.position(to)?;
        let offset = destination - self.position;
        let distance = offset.length();
        if distance > self.speed {
            self.position = self.position + offset * (self.speed / distance);
            trace!(x = self.position.x, y = self.position.y, "agent moved");
            return Ok(vec![]);
        }

        self.position = destination;
        match self.remaining.pop_front() {
            Some(next) => {
                self.state = AgentState::Moving { from: to, to: next };
                Ok(vec![AgentEvent::ArrivedAtHop(to)])
            }
            None => {
                self.state = AgentState::Idle { at: to };
                self.route.clear();
                debug!(node = to.0, "target reached");
                let mut events = vec![AgentEvent::ReachedTarget(to)];
                // Unreachable or trivial targets leave the agent idle, move on to the next one
                while self.is_idle() {
                    match self.queued_targets.pop_front() {
                        Some(next_target) => events.extend(self.start_route(graph, to, next_target)?),
                        None => break,
                    }
                }
                Ok(events)
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::pathing::BreadthFirst;

    /// Four nodes one unit apart on a line.
    fn line() -> NavGraph {
        let mut g = NavGraph::new();
        let ids = (0..4).map(|i| g.add_node(Vec2::new(i as f32, 0.0))).collect::<Vec<_>>();
        for w in ids.windows(2) {
            g.connect(w[0], w[1]).unwrap();
        }
        g
    }

    fn agent(g: &NavGraph, policy: RetargetPolicy, speed: f32) -> NavigatingAgent {
        NavigatingAgent::new(g, NodeId(0), Box::new(BreadthFirst), policy, speed).unwrap()
    }

    fn run_until_idle(a: &mut NavigatingAgent, g: &NavGraph) -> Vec<AgentEvent> {
        let mut events = vec![];
        for _ in 0..1000 {
            if a.is_idle() {
                break;
            }
            events.extend(a.step(g).unwrap());
        }
        events
    }

    #[test]
    fn walks_the_path_hop_by_hop() {
        let g = line();
        let mut a = agent(&g, RetargetPolicy::Queue, 0.5);
        let events = a.request_target(&g, NodeId(3)).unwrap();
        assert_eq!(events,
                   vec![AgentEvent::PathComputed {
                            target: NodeId(3),
                            path: Some(vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]),
                        }]);
        assert_eq!(a.state(), AgentState::Moving { from: NodeId(0), to: NodeId(1) });

        assert_eq!(a.step(&g).unwrap(), vec![]);
        assert_eq!(a.position(), Vec2::new(0.5, 0.0));

        let events = run_until_idle(&mut a, &g);
        assert_eq!(events,
                   vec![AgentEvent::ArrivedAtHop(NodeId(1)),
                        AgentEvent::ArrivedAtHop(NodeId(2)),
                        AgentEvent::ReachedTarget(NodeId(3))]);
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(3) });
        assert_eq!(a.position(), Vec2::new(3.0, 0.0));
        assert!(a.route().is_empty());
    }

    #[test]
    fn trivial_or_missing_paths_leave_the_agent_idle() {
        let mut g = line();
        let mut a = agent(&g, RetargetPolicy::Queue, 1.0);
        a.request_target(&g, NodeId(0)).unwrap();
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(0) });
        assert_eq!(a.step(&g).unwrap(), vec![]);

        g.set_enabled(NodeId(2), false).unwrap();
        let events = a.request_target(&g, NodeId(3)).unwrap();
        assert_eq!(events, vec![AgentEvent::PathComputed { target: NodeId(3), path: None }]);
        assert!(a.is_idle());

        assert!(a.request_target(&g, NodeId(8)).is_err());
    }

    #[test]
    fn ignore_policy_drops_new_targets() {
        let g = line();
        let mut a = agent(&g, RetargetPolicy::Ignore, 0.25);
        a.request_target(&g, NodeId(3)).unwrap();
        a.step(&g).unwrap();
        assert_eq!(a.request_target(&g, NodeId(0)).unwrap(), vec![]);
        run_until_idle(&mut a, &g);
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(3) });
    }

    #[test]
    fn queue_policy_resumes_with_the_next_target() {
        let g = line();
        let mut a = agent(&g, RetargetPolicy::Queue, 1.0);
        a.request_target(&g, NodeId(2)).unwrap();
        a.request_target(&g, NodeId(0)).unwrap();
        assert_eq!(a.queued_targets().count(), 1);

        let events = run_until_idle(&mut a, &g);
        assert_eq!(events[1], AgentEvent::ReachedTarget(NodeId(2)));
        assert_eq!(events[2],
                   AgentEvent::PathComputed {
                       target: NodeId(0),
                       path: Some(vec![NodeId(2), NodeId(1), NodeId(0)]),
                   });
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(0) });
        assert_eq!(events.last(), Some(&AgentEvent::ReachedTarget(NodeId(0))));
    }

    #[test]
    fn queue_policy_skips_targets_it_cannot_reach() {
        let mut g = line();
        let island = g.add_node(Vec2::new(9.0, 9.0));
        let mut a = agent(&g, RetargetPolicy::Queue, 1.0);
        a.request_target(&g, NodeId(2)).unwrap();
        a.request_target(&g, island).unwrap();
        a.request_target(&g, NodeId(2)).unwrap();
        a.request_target(&g, NodeId(0)).unwrap();
        assert_eq!(a.queued_targets().count(), 3);

        let events = run_until_idle(&mut a, &g);
        assert_eq!(&events[1..5],
                   &[AgentEvent::ReachedTarget(NodeId(2)),
                     AgentEvent::PathComputed { target: island, path: None },
                     AgentEvent::PathComputed { target: NodeId(2), path: Some(vec![NodeId(2)]) },
                     AgentEvent::PathComputed {
                         target: NodeId(0),
                         path: Some(vec![NodeId(2), NodeId(1), NodeId(0)]),
                     }]);
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(0) });
        assert_eq!(a.queued_targets().count(), 0);
    }

    #[test]
    fn queue_policy_goes_idle_when_every_queued_target_fails() {
        let mut g = line();
        let island = g.add_node(Vec2::new(9.0, 9.0));
        let mut a = agent(&g, RetargetPolicy::Queue, 1.0);
        a.request_target(&g, NodeId(1)).unwrap();
        a.request_target(&g, island).unwrap();
        a.request_target(&g, island).unwrap();

        let events = run_until_idle(&mut a, &g);
        assert_eq!(events.len(), 3);
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(1) });
        assert_eq!(a.queued_targets().count(), 0);
        assert_eq!(a.policy(), RetargetPolicy::Queue);
    }

    #[test]
    fn restart_policy_paths_from_the_nearer_hop_end() {
        let g = line();
        let mut a = agent(&g, RetargetPolicy::Restart, 0.25);
        a.request_target(&g, NodeId(3)).unwrap();
        a.step(&g).unwrap();
        // A quarter of the way from 0 to 1, 0 is nearer
        let events = a.request_target(&g, NodeId(0)).unwrap();
        assert_eq!(events, vec![AgentEvent::PathComputed { target: NodeId(0), path: Some(vec![NodeId(0)]) }]);
        assert_eq!(a.state(), AgentState::Moving { from: NodeId(1), to: NodeId(0) });

        let events = run_until_idle(&mut a, &g);
        assert_eq!(events, vec![AgentEvent::ReachedTarget(NodeId(0))]);
        assert_eq!(a.position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn restart_policy_keeps_moving_when_unreachable() {
        let mut g = line();
        let mut a = agent(&g, RetargetPolicy::Restart, 0.25);
        a.request_target(&g, NodeId(2)).unwrap();
        g.set_enabled(NodeId(3), false).unwrap();
        a.step(&g).unwrap();
        let events = a.request_target(&g, NodeId(3)).unwrap();
        assert_eq!(events, vec![AgentEvent::PathComputed { target: NodeId(3), path: None }]);
        run_until_idle(&mut a, &g);
        assert_eq!(a.state(), AgentState::Idle { at: NodeId(2) });
    }

    #[test]
    fn policies_parse() {
        assert_eq!("Restart".parse::<RetargetPolicy>().unwrap(), RetargetPolicy::Restart);
        assert!("wander".parse::<RetargetPolicy>().is_err());
    }
}
