use docopt::Docopt;
use error_chain::bail;
use dungeons::{
    agent::RetargetPolicy,
    config::{ConnectionPolicy, DungeonConfigBuilder, GraphStrategy, QualityTier, SplitPolicy},
    dungeon::{generate, Dungeon, RoomClass},
    geometry::Point,
    graph_builders::build_graph,
    navgraph::NavGraph,
    pathing::{self, Heuristic, PathFinderKind},
    simulation::{Simulation, SimulationEvent},
    tiles::{PathOverlay, StartEndOverlay, TileMap},
    units::{Height, NodeId, Width},
};
use serde_derive::Deserialize;
use std::{
    fs::File,
    io,
    io::prelude::*,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Dungeons

Usage:
    dungeons_driver -h | --help
    dungeons_driver [options]

Options:
    -h --help               Show this screen.
    --width=<w>             Dungeon width in cells [default: 85].
    --height=<h>            Dungeon height in cells [default: 48].
    --min-room-size=<n>     Smallest room floor the space divider leaves on either side of a split [default: 10].
    --seed=<n>              Random seed. A fresh seed is drawn and logged if not given.
    --quality=<tier>        basic, cleanup or shrink. Cleanup drops the largest and smallest rooms, shrink also pulls rooms apart and lays hallways [default: basic].
    --policy=<p>            Door policy: full (every adjacent pair) or minimal (a spanning tree) [default: full].
    --split=<s>             First axis to split: random or longest [default: random].
    --graph=<g>             Navigation graph: low (one node per walkable cell) or high (room, door and hallway waypoints) [default: high].
    --finder=<f>            Path finder: bfs, queue, dijkstra or astar [default: bfs].
    --heuristic=<h>         A* heuristic: euclidean, squared, manhattan, chebyshev or mindxdy [default: euclidean].
    --agent=<a>             What a moving agent does with a new target: ignore, queue or restart [default: queue].
    --from=<id>             Node the agent starts on. Defaults to the first enabled node.
    --to=<id>               Node the agent is sent to. Defaults to the last enabled node.
    --disable=<ids>         Comma separated node ids to disable before sending the agent.
    --max-ticks=<n>         Give up on the agent after this many ticks [default: 100000].
    --text-out=<path>       Write the rendered dungeon to a file instead of standard output.
    --save-edges=<path>     Serialize the navigation graph to a text file: each line is a pair of numbers. Line 1: n(#vertices) m(#edges). Line 2+ edge between vertices. Uses 1-based vertex indices.
";
#[derive(Debug, Deserialize)]
struct DriverArgs {
    flag_width: usize,
    flag_height: usize,
    flag_min_room_size: usize,
    flag_seed: Option<u64>,
    flag_quality: String,
    flag_policy: String,
    flag_split: String,
    flag_graph: String,
    flag_finder: String,
    flag_heuristic: String,
    flag_agent: String,
    flag_from: Option<usize>,
    flag_to: Option<usize>,
    flag_disable: String,
    flag_max_ticks: u64,
    flag_text_out: String,
    flag_save_edges: String,
}

mod errors {
    use error_chain::*;
    error_chain! {

        links {
            Dungeon(::dungeons::errors::Error, ::dungeons::errors::ErrorKind);
        }

        foreign_links {
            DocOptFailure(::docopt::Error);
            Io(::std::io::Error);
            ParseInt(::std::num::ParseIntError);
        }
    }
}
use crate::errors::*;

fn main() -> Result<()> {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args: DriverArgs = Docopt::new(USAGE).and_then(|d| d.deserialize())?;

    let config = DungeonConfigBuilder::new()
        .size(Width(args.flag_width), Height(args.flag_height))
        .minimum_room_size(args.flag_min_room_size)
        .seed(args.flag_seed)
        .quality(args.flag_quality.parse::<QualityTier>()?)
        .connection_policy(args.flag_policy.parse::<ConnectionPolicy>()?)
        .split_policy(args.flag_split.parse::<SplitPolicy>()?)
        .graph_strategy(args.flag_graph.parse::<GraphStrategy>()?)
        .build()?;
    let finder_kind = args.flag_finder.parse::<PathFinderKind>()?;
    let heuristic = args.flag_heuristic.parse::<Heuristic>()?;
    let policy = args.flag_agent.parse::<RetargetPolicy>()?;

    let dungeon = generate(&config)?;
    info!(seed = dungeon.seed(), "replay this dungeon with --seed={}", dungeon.seed());
    log_room_classes(&dungeon);

    let graph = build_graph(&dungeon, config.graph_strategy)?;
    if !args.flag_save_edges.is_empty() {
        save_graph(&graph, &args.flag_save_edges)?;
    }

    let enabled = graph.nodes().filter(|&(_, n)| n.enabled).map(|(id, _)| id).collect::<Vec<_>>();
    let start = args.flag_from.map(NodeId).or_else(|| enabled.first().cloned());
    let target = args.flag_to.map(NodeId).or_else(|| enabled.last().cloned());
    let (start, target) = match (start, target) {
        (Some(start), Some(target)) => (start, target),
        _ => bail!("the navigation graph has no nodes to path between"),
    };

    let finder = pathing::path_finder(finder_kind, heuristic);
    let mut sim = Simulation::with_parts(dungeon, graph, start, finder, policy)?;

    for id in parse_node_ids(&args.flag_disable)? {
        sim.on_node_toggled(id);
    }
    sim.on_node_selected(target);
    sim.tick()?;

    let mut path = None;
    let mut ticks = 1;
    let mut events = sim.drain_events();
    loop {
        for event in &events {
            match *event {
                SimulationEvent::ConnectivityChanged { fully_connected } => {
                    info!(fully_connected, "navigation graph connectivity changed");
                }
                SimulationEvent::PathComputed { target, path: ref found } => {
                    match *found {
                        Some(ref p) => info!(target = target.0, hops = p.len() - 1, "path found"),
                        None => warn!(target = target.0, "target unreachable"),
                    }
                    path = found.clone();
                }
                SimulationEvent::ArrivedAtHop(node) => info!(node = node.0, "agent arrived at hop"),
                SimulationEvent::ReachedTarget(node) => info!(node = node.0, ticks, "agent reached target"),
            }
        }
        if sim.agent().is_idle() {
            break;
        }
        if ticks >= args.flag_max_ticks {
            warn!(ticks, "agent still moving, giving up");
            break;
        }
        sim.tick()?;
        ticks += 1;
        events = sim.drain_events();
    }

    let rendered = render(&sim, start, target, path.as_ref().map(|p| p.as_slice()))?;
    if args.flag_text_out.is_empty() {
        println!("{}", sim.dungeon());
        println!("{}", rendered);
    } else {
        write_text_to_file(&rendered, &args.flag_text_out)
            .chain_err(|| format!("Failed to write dungeon to text file {}", args.flag_text_out))?;
    }

    Ok(())
}

fn log_room_classes(dungeon: &Dungeon) {
    let counts = dungeon.connection_counts();
    let classes = counts.values().map(|&c| RoomClass::from_connections(c));
    let (mut isolated, mut dead_ends, mut passages, mut hubs) = (0, 0, 0, 0);
    for class in classes {
        match class {
            RoomClass::Isolated => isolated += 1,
            RoomClass::DeadEnd => dead_ends += 1,
            RoomClass::Passage => passages += 1,
            RoomClass::Hub => hubs += 1,
        }
    }
    info!(isolated, dead_ends, passages, hubs, "room connections");
}

/// The tile map with the path drawn over it and its ends marked `S` and `E`.
fn render(sim: &Simulation, start: NodeId, target: NodeId, path: Option<&[NodeId]>) -> Result<String> {
    let graph = sim.graph();
    let cell_of = |id: NodeId| -> Result<Point> {
        let p = graph.position(id)?;
        Ok(Point::new(p.x.floor() as i32, p.y.floor() as i32))
    };

    let path_cells = path.unwrap_or(&[])
        .iter()
        .map(|&id| cell_of(id))
        .collect::<Result<Vec<Point>>>()?;
    let on_path = PathOverlay::new(&path_cells);
    let overlay = StartEndOverlay {
        start: cell_of(start)?,
        end: cell_of(target)?,
        inner: &on_path,
    };

    Ok(TileMap::from_dungeon(sim.dungeon()).render_with(&overlay))
}

fn parse_node_ids(ids: &str) -> Result<Vec<NodeId>> {
    ids.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map(NodeId).map_err(Error::from))
        .collect()
}

fn write_text_to_file(data: &str, file_name: &str) -> io::Result<()> {
    let mut f = File::create(file_name)?;
    f.write_all(data.as_bytes())?;
    Ok(())
}

fn save_graph(graph: &NavGraph, file_path: &str) -> Result<()> {

    let mut graph_data = String::new();
    graph_data.push_str(&format!("{} {}\n", graph.node_count(), graph.connection_count()));

    for (a, b) in graph.connections() {
        graph_data.push_str(&format!("{} {}\n", a.0 + 1, b.0 + 1));
    }

    write_text_to_file(&graph_data, file_path)
        .chain_err(|| format!("Failed to write navigation graph to text file {}", file_path))?;

    Ok(())
}
