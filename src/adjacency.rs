use std::collections::BTreeMap;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::dungeon::Room;
use crate::geometry::{Axis, Orientation, Rect, Side};
use crate::units::RoomId;

/// How one room relates to another.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Adjacency {
    /// The rooms share a wall with room for a door in it.
    Adjacent(Orientation, Side),
    NonAdjacent,
}

/// A neighbouring room as seen from one room.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Neighbour {
    pub room: RoomId,
    pub orientation: Orientation,
    /// `AtoB` if the room owning this entry is left of / above `room`.
    pub side: Side,
}

/// Every room's neighbours, with entries on both rooms of each adjacent pair.
/// Rooms with no neighbours still have an (empty) entry.
pub type AdjacencyMap = BTreeMap<RoomId, SmallVec<[Neighbour; 4]>>;

/// Classify the geometric relation of room `a` to room `b`.
///
/// Two rooms are adjacent when their floors are separated by exactly one unit (a single shared wall)
/// along one axis and the door span along the other axis is not empty.
pub fn classify(a: &Rect, b: &Rect) -> Adjacency {
    let (floor_a, floor_b) = (a.interior(), b.interior());
    if floor_a.is_empty() || floor_b.is_empty() {
        return Adjacency::NonAdjacent;
    }

    for &orientation in &[Orientation::Horizontal, Orientation::Vertical] {
        let axis = orientation.connecting_axis();
        let (a_low, a_high) = floor_a.span(axis);
        let (b_low, b_high) = floor_b.span(axis);

        let side = if b_low - a_high == 2 {
            Side::AtoB
        } else if a_low - b_high == 2 {
            Side::BtoA
        } else {
            continue;
        };

        if door_span(a, b, orientation).is_some() {
            return Adjacency::Adjacent(orientation, side);
        }
    }

    Adjacency::NonAdjacent
}

/// The inclusive range of transverse coordinates a door between two rooms may take: the overlap of
/// both rooms' extents with the corners excluded. `None` if the rooms overlap by less than a floor
/// cell.
pub fn door_span(a: &Rect, b: &Rect, orientation: Orientation) -> Option<(i32, i32)> {
    let transverse: Axis = orientation.transverse_axis();
    let (a_low, a_high) = a.span(transverse);
    let (b_low, b_high) = b.span(transverse);
    let low = a_low.max(b_low) + 1;
    let high = a_high.min(b_high) - 1;
    if low <= high {
        Some((low, high))
    } else {
        None
    }
}

/// Build the adjacency map for a set of rooms by comparing every pair once.
pub fn adjacency<'a, I>(rooms: I) -> AdjacencyMap
    where I: IntoIterator<Item = &'a Room>
{
    let rooms = rooms.into_iter().collect::<Vec<&Room>>();
    let mut map: AdjacencyMap = rooms.iter().map(|r| (r.id, SmallVec::new())).collect();

    for (a, b) in rooms.iter().tuple_combinations() {
        if let Adjacency::Adjacent(orientation, side) = classify(&a.bounds, &b.bounds) {
            let mirrored = match side {
                Side::AtoB => Side::BtoA,
                Side::BtoA => Side::AtoB,
            };
            if let Some(n) = map.get_mut(&a.id) {
                n.push(Neighbour { room: b.id, orientation, side });
            }
            if let Some(n) = map.get_mut(&b.id) {
                n.push(Neighbour { room: a.id, orientation, side: mirrored });
            }
        }
    }

    map
}
