use std::collections::BTreeMap;

use tracing::debug;

use crate::config::GraphStrategy;
use crate::dungeon::Dungeon;
use crate::errors::*;
use crate::geometry::Point;
use crate::navgraph::NavGraph;
use crate::tiles::TileMap;
use crate::units::{EdgesCount, NodeId, NodesCount, RoomId};

/// Turns a dungeon into a navigation graph.
pub trait GraphBuilder {
    fn name(&self) -> &'static str;
    fn build(&self, dungeon: &Dungeon) -> Result<NavGraph>;
}

pub fn builder_for(strategy: GraphStrategy) -> Box<dyn GraphBuilder> {
    match strategy {
        GraphStrategy::LowLevelGrid => Box::new(LowLevelGridBuilder),
        GraphStrategy::HighLevelWaypoint => Box::new(HighLevelWaypointBuilder),
    }
}

/// Build the navigation graph for a dungeon with the given strategy.
pub fn build_graph(dungeon: &Dungeon, strategy: GraphStrategy) -> Result<NavGraph> {
    let builder = builder_for(strategy);
    let graph = builder.build(dungeon)?;
    debug!(builder = builder.name(),
           nodes = graph.node_count(),
           connections = graph.connection_count(),
           fully_connected = graph.is_fully_connected(),
           "navigation graph built");
    Ok(graph)
}

/// A node at the centre of every walkable cell (room floors, doors and hallways), connected to the
/// walkable cells around it in all eight directions. Nodes are numbered row by row.
#[derive(Debug, Copy, Clone)]
pub struct LowLevelGridBuilder;

const OFFSETS: [(i32, i32); 8] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

impl GraphBuilder for LowLevelGridBuilder {
    fn name(&self) -> &'static str {
        "low level grid"
    }

    fn build(&self, dungeon: &Dungeon) -> Result<NavGraph> {
        let tiles = TileMap::from_dungeon(dungeon);
        let (width, height) = (tiles.width(), tiles.height());

        let walkable = tiles.walkable_cells().collect::<Vec<Point>>();
        let mut graph = NavGraph::with_capacity(NodesCount(walkable.len()), EdgesCount(walkable.len() * 4));
        let mut cell_nodes: Vec<Option<NodeId>> = vec![None; width * height];
        let cell_index = |p: Point| p.y as usize * width + p.x as usize;

        for p in &walkable {
            cell_nodes[cell_index(*p)] = Some(graph.add_node(p.cell_centre()));
        }

        for p in &walkable {
            let node = match cell_nodes[cell_index(*p)] {
                Some(node) => node,
                None => continue,
            };
            for &(dx, dy) in &OFFSETS {
                let q = Point::new(p.x + dx, p.y + dy);
                if !tiles.is_walkable(q) {
                    continue;
                }
                if let Some(neighbour) = cell_nodes[cell_index(q)] {
                    graph.connect(node, neighbour)?;
                }
            }
        }

        Ok(graph)
    }
}

/// A node at the centre of every room, one at every door connected to both its rooms, and one at
/// each end of every hallway, the start connected to its first room and the end to its second.
#[derive(Debug, Copy, Clone)]
pub struct HighLevelWaypointBuilder;

impl GraphBuilder for HighLevelWaypointBuilder {
    fn name(&self) -> &'static str {
        "high level waypoint"
    }

    fn build(&self, dungeon: &Dungeon) -> Result<NavGraph> {
        let nodes = dungeon.rooms_count() + dungeon.doors_count() + 2 * dungeon.hallways_count();
        let edges = 2 * dungeon.doors_count() + 3 * dungeon.hallways_count();
        let mut graph = NavGraph::with_capacity(NodesCount(nodes), EdgesCount(edges));

        let room_nodes = dungeon.rooms()
            .map(|room| (room.id, graph.add_node(room.bounds.centre())))
            .collect::<BTreeMap<_, _>>();
        let room_node = |id: RoomId| room_nodes.get(&id).cloned().ok_or_else(|| Error::from(ErrorKind::UnknownRoom(id.0)));

        for door in dungeon.doors() {
            let node = graph.add_node(door.position.cell_centre());
            graph.connect(node, room_node(door.first)?)?;
            graph.connect(node, room_node(door.second)?)?;
        }

        for hallway in dungeon.hallways() {
            let start = graph.add_node(hallway.start.cell_centre());
            let end = graph.add_node(hallway.end.cell_centre());
            graph.connect(room_node(hallway.first)?, start)?;
            graph.connect(start, end)?;
            graph.connect(end, room_node(hallway.second)?)?;
        }

        Ok(graph)
    }
}
