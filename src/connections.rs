use std::collections::BTreeMap;

use bit_set::BitSet;
use rand::Rng;
use rand_xorshift::XorShiftRng;
use tracing::debug;

use crate::adjacency::{door_span, AdjacencyMap, Neighbour};
use crate::config::ConnectionPolicy;
use crate::dungeon::{Door, IdGenerator, Room};
use crate::geometry::{Orientation, Point, Side};
use crate::units::{DoorId, RoomId};

/// Place a door in the wall between `room` and its neighbour.
///
/// The door sits on the wall coordinate of whichever room comes first along the connecting axis and at
/// a uniformly random transverse coordinate inside the door span. Returns `None` if the rooms leave no
/// span for a door.
pub fn place_door(room: &Room,
                  neighbour: &Room,
                  orientation: Orientation,
                  side: Side,
                  rng: &mut XorShiftRng,
                  ids: &mut IdGenerator)
                  -> Option<Door> {

    let (first, second) = match side {
        Side::AtoB => (room, neighbour),
        Side::BtoA => (neighbour, room),
    };
    let (low, high) = door_span(&first.bounds, &second.bounds, orientation)?;
    let along = rng.gen_range(low..=high);

    let position = match orientation {
        Orientation::Horizontal => Point::new(first.bounds.right(), along),
        Orientation::Vertical => Point::new(along, first.bounds.bottom()),
    };

    Some(Door {
        id: ids.next_door(),
        position,
        orientation,
        first: first.id,
        second: second.id,
    })
}

/// Turn room adjacency into doors according to the connection policy.
pub fn connect_rooms(rooms: &BTreeMap<RoomId, Room>,
                     adjacency: &AdjacencyMap,
                     policy: ConnectionPolicy,
                     rng: &mut XorShiftRng,
                     ids: &mut IdGenerator)
                     -> BTreeMap<DoorId, Door> {
    let doors = match policy {
        ConnectionPolicy::Full => connect_all(rooms, adjacency, rng, ids),
        ConnectionPolicy::Minimal => connect_spanning_tree(rooms, adjacency, rng, ids),
    };
    debug!(?policy, rooms = rooms.len(), doors = doors.len(), "rooms connected");
    doors
}

/// One door per unordered pair of adjacent rooms.
fn connect_all(rooms: &BTreeMap<RoomId, Room>,
               adjacency: &AdjacencyMap,
               rng: &mut XorShiftRng,
               ids: &mut IdGenerator)
               -> BTreeMap<DoorId, Door> {

    let mut doors = BTreeMap::new();
    for (room_id, neighbours) in adjacency {
        // Each pair is listed on both rooms, only take it from the lower id's side.
        for n in neighbours.iter().filter(|n| n.room > *room_id) {
            if let Some(door) = door_to(rooms, *room_id, n, rng, ids) {
                doors.insert(door.id, door);
            }
        }
    }
    doors
}

/// Doors along the tree edges of an iterative depth first traversal of the adjacency, starting from
/// the lowest room id. A traversal restarts from the next unvisited room so every connected group of
/// rooms gets its own tree.
fn connect_spanning_tree(rooms: &BTreeMap<RoomId, Room>,
                         adjacency: &AdjacencyMap,
                         rng: &mut XorShiftRng,
                         ids: &mut IdGenerator)
                         -> BTreeMap<DoorId, Door> {

    let mut doors = BTreeMap::new();
    let mut visited = BitSet::with_capacity(rooms.keys().next_back().map_or(0, |id| id.0 + 1));

    for root in rooms.keys() {
        if visited.contains(root.0) {
            continue;
        }

        // (room, the tree edge that reached it)
        let mut stack: Vec<(RoomId, Option<(RoomId, Neighbour)>)> = vec![(*root, None)];
        while let Some((current, reached_by)) = stack.pop() {
            if !visited.insert(current.0) {
                continue;
            }
            if let Some((parent, via)) = reached_by {
                if let Some(door) = door_to(rooms, parent, &via, rng, ids) {
                    doors.insert(door.id, door);
                }
            }
            if let Some(neighbours) = adjacency.get(&current) {
                // Reversed so the first listed neighbour is explored first
                for n in neighbours.iter().rev().filter(|n| !visited.contains(n.room.0)) {
                    stack.push((n.room, Some((current, *n))));
                }
            }
        }
    }
    doors
}

fn door_to(rooms: &BTreeMap<RoomId, Room>,
           from: RoomId,
           neighbour: &Neighbour,
           rng: &mut XorShiftRng,
           ids: &mut IdGenerator)
           -> Option<Door> {
    let room = rooms.get(&from)?;
    let other = rooms.get(&neighbour.room)?;
    place_door(room, other, neighbour.orientation, neighbour.side, rng, ids)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::adjacency::adjacency;
    use crate::generators::rng_from_seed;
    use crate::geometry::Rect;

    /// A 2x2 block of rooms, every room adjacent to two others.
    fn quad() -> BTreeMap<RoomId, Room> {
        let rects = [Rect::from_edges(0, 0, 6, 6),
                     Rect::from_edges(6, 0, 12, 6),
                     Rect::from_edges(0, 6, 6, 12),
                     Rect::from_edges(6, 6, 12, 12)];
        rects.iter()
            .enumerate()
            .map(|(i, r)| (RoomId(i), Room::new(RoomId(i), *r)))
            .collect()
    }

    #[test]
    fn door_sits_on_the_first_rooms_wall_inside_the_span() {
        let mut rng = rng_from_seed(3);
        let mut ids = IdGenerator::default();
        let left = Room::new(RoomId(0), Rect::from_edges(0, 0, 6, 6));
        let right = Room::new(RoomId(1), Rect::from_edges(6, 2, 12, 10));

        for _ in 0..50 {
            let door = place_door(&right, &left, Orientation::Horizontal, Side::BtoA, &mut rng, &mut ids)
                .expect("door");
            assert_eq!(door.first, RoomId(0));
            assert_eq!(door.second, RoomId(1));
            assert_eq!(door.position.x, 6);
            assert!(door.position.y >= 3 && door.position.y <= 5);
        }
    }

    #[test]
    fn no_door_without_a_span() {
        let mut rng = rng_from_seed(3);
        let mut ids = IdGenerator::default();
        let a = Room::new(RoomId(0), Rect::from_edges(0, 0, 6, 6));
        let b = Room::new(RoomId(1), Rect::from_edges(6, 6, 12, 12));
        assert_eq!(place_door(&a, &b, Orientation::Horizontal, Side::AtoB, &mut rng, &mut ids), None);
    }

    #[test]
    fn full_policy_connects_every_adjacent_pair_once() {
        let rooms = quad();
        let adj = adjacency(rooms.values());
        let mut rng = rng_from_seed(11);
        let mut ids = IdGenerator::default();
        let doors = connect_rooms(&rooms, &adj, ConnectionPolicy::Full, &mut rng, &mut ids);
        assert_eq!(doors.len(), 4);

        let mut pairs = doors.values().map(|d| (d.first.0, d.second.0)).collect::<Vec<_>>();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn minimal_policy_builds_a_spanning_tree() {
        let rooms = quad();
        let adj = adjacency(rooms.values());
        let mut rng = rng_from_seed(11);
        let mut ids = IdGenerator::default();
        let doors = connect_rooms(&rooms, &adj, ConnectionPolicy::Minimal, &mut rng, &mut ids);
        assert_eq!(doors.len(), rooms.len() - 1);

        // Depth first from room 0: 0 -> 1 -> 3 -> 2
        let pairs = doors.values().map(|d| (d.first.0, d.second.0)).collect::<Vec<_>>();
        assert_eq!(pairs, vec![(0, 1), (1, 3), (2, 3)]);
    }

    #[test]
    fn minimal_policy_restarts_for_separate_groups() {
        let mut rooms = quad();
        rooms.insert(RoomId(4), Room::new(RoomId(4), Rect::from_edges(20, 0, 26, 6)));
        rooms.insert(RoomId(5), Room::new(RoomId(5), Rect::from_edges(26, 0, 32, 6)));
        let adj = adjacency(rooms.values());
        let mut rng = rng_from_seed(5);
        let mut ids = IdGenerator::default();
        let doors = connect_rooms(&rooms, &adj, ConnectionPolicy::Minimal, &mut rng, &mut ids);
        assert_eq!(doors.len(), 4);
        assert!(doors.values().any(|d| d.first == RoomId(4) && d.second == RoomId(5)));
    }
}
