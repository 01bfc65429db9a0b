use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::trace;

use crate::config::SplitPolicy;
use crate::dungeon::{IdGenerator, Room};
use crate::geometry::{Axis, Rect};

/// Seeded generator shared by every random step of one generation run.
pub fn rng_from_seed(seed: u64) -> XorShiftRng {
    XorShiftRng::seed_from_u64(seed)
}

/// Recursively partition `rect` into rooms.
///
/// A rectangle is split along one axis at a random coordinate that leaves `minimum_room_size + 1`
/// units on both sides; the two halves share the split coordinate as their common wall. When the
/// first axis tried (per the `policy`) cannot be split the other axis is tried, and when neither can
/// the rectangle becomes a room as it is, however large that happens to be.
///
/// The recursion is driven by an explicit work stack, visiting the first half of every split fully
/// before the second so room ids follow the same order a recursive descent would assign.
pub fn divide(rect: Rect,
              minimum_room_size: usize,
              policy: SplitPolicy,
              rng: &mut XorShiftRng,
              ids: &mut IdGenerator)
              -> Vec<Room> {

    let m = minimum_room_size as i32;
    let mut rooms = vec![];
    let mut work = vec![rect];

    while let Some(current) = work.pop() {

        let first_axis = match policy {
            SplitPolicy::LongestAxis => {
                if current.width >= current.height {
                    Axis::X
                } else {
                    Axis::Y
                }
            }
            SplitPolicy::Random => {
                if rng.gen() {
                    Axis::X
                } else {
                    Axis::Y
                }
            }
        };

        let split = split_range(&current, first_axis, m)
            .map(|range| (first_axis, range))
            .or_else(|| split_range(&current, first_axis.other(), m).map(|range| (first_axis.other(), range)));

        match split {
            Some((axis, (low, high))) => {
                let at = rng.gen_range(low..=high);
                let (first, second) = split_at(&current, axis, at);
                trace!(?current, ?axis, at, "split");
                // LIFO: push the second half first so the first half is divided first
                work.push(second);
                work.push(first);
            }
            None => {
                rooms.push(Room::new(ids.next_room(), current));
            }
        }
    }

    rooms
}

/// The inclusive range of split coordinates along `axis` that leave room for a minimum sized room
/// on either side, or `None` if there is no choice of split.
pub fn split_range(rect: &Rect, axis: Axis, minimum_room_size: i32) -> Option<(i32, i32)> {
    let (low, high) = rect.span(axis);
    let first_valid = low + minimum_room_size + 1;
    let last_valid = high - minimum_room_size - 1;
    if first_valid < last_valid {
        Some((first_valid, last_valid))
    } else {
        None
    }
}

/// Split into two rectangles that both include the coordinate `at` as their shared wall.
fn split_at(rect: &Rect, axis: Axis, at: i32) -> (Rect, Rect) {
    let (left, top, right, bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    match axis {
        Axis::X => (Rect::from_edges(left, top, at, bottom), Rect::from_edges(at, top, right, bottom)),
        Axis::Y => (Rect::from_edges(left, top, right, at), Rect::from_edges(left, at, right, bottom)),
    }
}
