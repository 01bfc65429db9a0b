//! Refinements applied to a divided dungeon by the higher quality tiers.
//!
//! Rooms straight out of the space divider fill the whole dungeon and share every wall. Cleaning up
//! drops the outliers in size and shrinking pulls the walls apart, after which the doors have to be
//! repaired: moved back inside the shrunk walls, dropped, or stretched into hallways.

use std::collections::BTreeMap;

use rand::Rng;
use rand_xorshift::XorShiftRng;
use tracing::debug;

use crate::adjacency::door_span;
use crate::dungeon::{Door, Hallway, IdGenerator, Room};
use crate::geometry::{Orientation, Point};
use crate::units::{DoorId, HallwayId, RoomId};

/// Remove every room whose area equals the largest or the smallest area.
///
/// Nothing is removed from two rooms or fewer, or when all rooms are the same size.
pub fn clean_rooms(rooms: Vec<Room>) -> Vec<Room> {
    if rooms.len() <= 2 {
        return rooms;
    }
    let areas = rooms.iter().map(|r| r.bounds.area());
    let (smallest, largest) = areas.fold((i32::MAX, i32::MIN), |(lo, hi), a| (lo.min(a), hi.max(a)));
    if smallest == largest {
        return rooms;
    }

    let before = rooms.len();
    let kept = rooms.into_iter()
        .filter(|r| {
            let area = r.bounds.area();
            area != smallest && area != largest
        })
        .collect::<Vec<_>>();
    debug!(removed = before - kept.len(), smallest, largest, "cleaned rooms");
    kept
}

/// Shrink every room by a random amount up to half the minimum room size on each axis, split
/// unevenly between the two opposite walls.
pub fn shrink_rooms(rooms: &mut BTreeMap<RoomId, Room>, minimum_room_size: usize, rng: &mut XorShiftRng) {
    let max_shrink = (minimum_room_size / 2) as i32;
    for room in rooms.values_mut() {
        let shrink_x = rng.gen_range(0..=max_shrink);
        let shrink_y = rng.gen_range(0..=max_shrink);
        let b = &mut room.bounds;
        b.x += shrink_x / 2;
        b.width -= shrink_x;
        b.y += shrink_y / 2;
        b.height -= shrink_y;
    }
}

/// Fit the doors to the shrunk rooms.
///
/// A door whose rooms no longer overlap enough for a door is removed. Otherwise it is moved back into
/// the span and, if the two rooms' facing walls have come apart, replaced by a hallway running between
/// them at the same transverse coordinate.
pub fn repair_doors(rooms: &BTreeMap<RoomId, Room>,
                    doors: BTreeMap<DoorId, Door>,
                    ids: &mut IdGenerator)
                    -> (BTreeMap<DoorId, Door>, BTreeMap<HallwayId, Hallway>) {

    let mut kept = BTreeMap::new();
    let mut hallways = BTreeMap::new();
    let mut removed = 0;

    for (id, mut door) in doors {
        let (first, second) = match (rooms.get(&door.first), rooms.get(&door.second)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                removed += 1;
                continue;
            }
        };
        let (low, high) = match door_span(&first.bounds, &second.bounds, door.orientation) {
            Some(span) => span,
            None => {
                removed += 1;
                continue;
            }
        };

        let (first_wall, second_wall) = match door.orientation {
            Orientation::Horizontal => {
                door.position.y = door.position.y.max(low).min(high);
                (first.bounds.right(), second.bounds.left())
            }
            Orientation::Vertical => {
                door.position.x = door.position.x.max(low).min(high);
                (first.bounds.bottom(), second.bounds.top())
            }
        };

        if first_wall == second_wall {
            kept.insert(id, door);
            continue;
        }

        let (start, end) = match door.orientation {
            Orientation::Horizontal => {
                (Point::new(first_wall, door.position.y), Point::new(second_wall, door.position.y))
            }
            Orientation::Vertical => {
                (Point::new(door.position.x, first_wall), Point::new(door.position.x, second_wall))
            }
        };
        let hallway = Hallway {
            id: ids.next_hallway(),
            start,
            end,
            orientation: door.orientation,
            first: door.first,
            second: door.second,
            replaced_door: id,
        };
        hallways.insert(hallway.id, hallway);
    }

    debug!(doors = kept.len(), hallways = hallways.len(), removed, "repaired doors");
    (kept, hallways)
}
