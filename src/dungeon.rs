use std::collections::BTreeMap;
use std::fmt;

use serde_derive::{Deserialize, Serialize};
use tracing::info;

use crate::adjacency::adjacency;
use crate::config::{DungeonConfig, QualityTier};
use crate::connections::connect_rooms;
use crate::errors::*;
use crate::generators::{divide, rng_from_seed};
use crate::geometry::{Orientation, Point, Rect};
use crate::shrinking::{clean_rooms, repair_doors, shrink_rooms};
use crate::units::{DoorId, HallwayId, Height, RoomId, Width};

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Outer bounds, walls included.
    pub bounds: Rect,
}

impl Room {
    pub fn new(id: RoomId, bounds: Rect) -> Room {
        Room { id, bounds }
    }
}

/// A single walkable cell in the wall shared by two rooms.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Door {
    pub id: DoorId,
    pub position: Point,
    pub orientation: Orientation,
    /// The room left of / above the door.
    pub first: RoomId,
    pub second: RoomId,
}

/// A straight corridor between the facing walls of two rooms that used to share a door.
///
/// `start` is on the wall of `first`, `end` on the wall of `second`; both ends are walkable.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Hallway {
    pub id: HallwayId,
    pub start: Point,
    pub end: Point,
    pub orientation: Orientation,
    pub first: RoomId,
    pub second: RoomId,
    pub replaced_door: DoorId,
}

impl Hallway {
    /// Every cell from `start` to `end` inclusive.
    pub fn cells(&self) -> impl Iterator<Item = Point> {
        let (start, end) = (self.start, self.end);
        Rect::from_edges(start.x.min(end.x), start.y.min(end.y), start.x.max(end.x), start.y.max(end.y)).cells()
    }

    pub fn length(&self) -> i32 {
        (self.end.x - self.start.x).abs() + (self.end.y - self.start.y).abs() + 1
    }
}

/// Hands out room, door and hallway ids, each counting up from zero and never reused within one
/// generation run.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    rooms: usize,
    doors: usize,
    hallways: usize,
}

impl IdGenerator {
    pub fn next_room(&mut self) -> RoomId {
        self.rooms += 1;
        RoomId(self.rooms - 1)
    }
    pub fn next_door(&mut self) -> DoorId {
        self.doors += 1;
        DoorId(self.doors - 1)
    }
    pub fn next_hallway(&mut self) -> HallwayId {
        self.hallways += 1;
        HallwayId(self.hallways - 1)
    }
}

/// How many ways lead in and out of a room.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum RoomClass {
    Isolated,
    DeadEnd,
    Passage,
    Hub,
}

impl RoomClass {
    pub fn from_connections(count: usize) -> RoomClass {
        match count {
            0 => RoomClass::Isolated,
            1 => RoomClass::DeadEnd,
            2 => RoomClass::Passage,
            _ => RoomClass::Hub,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    width: Width,
    height: Height,
    seed: u64,
    quality: QualityTier,
    rooms: BTreeMap<RoomId, Room>,
    doors: BTreeMap<DoorId, Door>,
    hallways: BTreeMap<HallwayId, Hallway>,
}

impl Dungeon {
    /// Assemble a dungeon from already laid out parts.
    pub fn from_parts(width: Width,
                      height: Height,
                      rooms: Vec<Room>,
                      doors: Vec<Door>,
                      hallways: Vec<Hallway>)
                      -> Dungeon {
        Dungeon {
            width,
            height,
            seed: 0,
            quality: QualityTier::Basic,
            rooms: rooms.into_iter().map(|r| (r.id, r)).collect(),
            doors: doors.into_iter().map(|d| (d.id, d)).collect(),
            hallways: hallways.into_iter().map(|h| (h.id, h)).collect(),
        }
    }

    pub fn width(&self) -> Width {
        self.width
    }

    pub fn height(&self) -> Height {
        self.height
    }

    /// The seed the dungeon was generated from, reusing it with the same configuration reproduces the
    /// dungeon exactly.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    pub fn hallways(&self) -> impl Iterator<Item = &Hallway> {
        self.hallways.values()
    }

    pub fn rooms_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn doors_count(&self) -> usize {
        self.doors.len()
    }

    pub fn hallways_count(&self) -> usize {
        self.hallways.len()
    }

    pub fn room(&self, id: RoomId) -> Result<&Room> {
        self.rooms.get(&id).ok_or_else(|| ErrorKind::UnknownRoom(id.0).into())
    }

    pub fn door(&self, id: DoorId) -> Result<&Door> {
        self.doors.get(&id).ok_or_else(|| ErrorKind::UnknownDoor(id.0).into())
    }

    pub fn hallway(&self, id: HallwayId) -> Result<&Hallway> {
        self.hallways.get(&id).ok_or_else(|| ErrorKind::UnknownHallway(id.0).into())
    }

    /// Number of doors and hallways touching each room.
    pub fn connection_counts(&self) -> BTreeMap<RoomId, usize> {
        let mut counts: BTreeMap<RoomId, usize> = self.rooms.keys().map(|id| (*id, 0)).collect();
        let links = self.doors.values().map(|d| (d.first, d.second))
            .chain(self.hallways.values().map(|h| (h.first, h.second)));
        for (a, b) in links {
            for id in &[a, b] {
                if let Some(c) = counts.get_mut(id) {
                    *c += 1;
                }
            }
        }
        counts
    }

    pub fn room_class(&self, id: RoomId) -> Result<RoomClass> {
        self.room(id)?;
        let count = self.connection_counts().get(&id).cloned().unwrap_or(0);
        Ok(RoomClass::from_connections(count))
    }
}

impl fmt::Display for Dungeon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "Dungeon {}x{} seed {} ({}): {} rooms, {} doors, {} hallways",
               self.width.0,
               self.height.0,
               self.seed,
               self.quality,
               self.rooms.len(),
               self.doors.len(),
               self.hallways.len())
    }
}

/// Generate a dungeon: divide the space into rooms, optionally clean them up, connect adjacent rooms
/// with doors and optionally shrink the rooms, repairing the doors and laying hallways.
///
/// With a configured seed the result is fully reproducible.
pub fn generate(config: &DungeonConfig) -> Result<Dungeon> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = rng_from_seed(seed);
    let mut ids = IdGenerator::default();
    let bounds = Rect::new(0, 0, config.width.0 as i32, config.height.0 as i32);

    let mut rooms = divide(bounds, config.minimum_room_size, config.split_policy, &mut rng, &mut ids);
    if config.quality >= QualityTier::WithCleanup {
        rooms = clean_rooms(rooms);
    }
    let mut rooms: BTreeMap<RoomId, Room> = rooms.into_iter().map(|r| (r.id, r)).collect();

    let adjacent = adjacency(rooms.values());
    let mut doors = connect_rooms(&rooms, &adjacent, config.connection_policy, &mut rng, &mut ids);
    let mut hallways = BTreeMap::new();

    if config.quality >= QualityTier::WithShrinkAndHallways {
        shrink_rooms(&mut rooms, config.minimum_room_size, &mut rng);
        let (repaired, laid) = repair_doors(&rooms, doors, &mut ids);
        doors = repaired;
        hallways = laid;
    }

    let dungeon = Dungeon {
        width: config.width,
        height: config.height,
        seed,
        quality: config.quality,
        rooms,
        doors,
        hallways,
    };
    info!(seed,
          quality = %config.quality,
          rooms = dungeon.rooms_count(),
          doors = dungeon.doors_count(),
          hallways = dungeon.hallways_count(),
          "generated dungeon");
    Ok(dungeon)
}
