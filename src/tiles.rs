use std::fmt;

use crate::dungeon::Dungeon;
use crate::geometry::Point;
use crate::utils::{self, FnvHashSet};

#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum Tile {
    Wall,
    Ground,
    Door,
    Hallway,
}

impl Tile {
    pub fn is_walkable(self) -> bool {
        self != Tile::Wall
    }

    pub fn symbol(self) -> char {
        match self {
            Tile::Wall => '#',
            Tile::Ground => '.',
            Tile::Door => '+',
            Tile::Hallway => '=',
        }
    }
}

/// Rasterised dungeon, one tile per cell, stored row by row.
///
/// Everything starts out as wall. Room floors are carved first, then hallways and doors, so a hallway
/// end or a door on a room's wall is walkable.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileMap {
    pub fn from_dungeon(dungeon: &Dungeon) -> TileMap {
        let mut map = TileMap {
            width: dungeon.width().0,
            height: dungeon.height().0,
            tiles: vec![Tile::Wall; dungeon.width().0 * dungeon.height().0],
        };

        for room in dungeon.rooms() {
            for p in room.bounds.interior().cells() {
                map.set(p, Tile::Ground);
            }
        }
        for hallway in dungeon.hallways() {
            for p in hallway.cells() {
                map.set(p, Tile::Hallway);
            }
        }
        for door in dungeon.doors() {
            map.set(door.position, Tile::Door);
        }
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height {
            Some(p.y as usize * self.width + p.x as usize)
        } else {
            None
        }
    }

    /// The tile at `p`, cells outside of the map are wall.
    pub fn get(&self, p: Point) -> Tile {
        self.index(p).map_or(Tile::Wall, |i| self.tiles[i])
    }

    fn set(&mut self, p: Point, tile: Tile) {
        if let Some(i) = self.index(p) {
            self.tiles[i] = tile;
        }
    }

    pub fn is_walkable(&self, p: Point) -> bool {
        self.get(p).is_walkable()
    }

    /// Walkable cells row by row.
    pub fn walkable_cells<'a>(&'a self) -> impl Iterator<Item = Point> + 'a {
        let width = self.width;
        self.tiles
            .iter()
            .enumerate()
            .filter(|&(_, t)| t.is_walkable())
            .map(move |(i, _)| Point::new((i % width) as i32, (i / width) as i32))
    }

    /// Render with an overlay taking precedence over the tile symbols where it has something to show.
    pub fn render_with(&self, overlay: &dyn TileOverlay) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let p = Point::new(x as i32, y as i32);
                let tile = self.get(p);
                out.push(overlay.render_cell(p, tile).unwrap_or_else(|| tile.symbol()));
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for TileMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render_with(&NoOverlay))
    }
}

/// Extra information drawn over a tile map.
pub trait TileOverlay {
    fn render_cell(&self, p: Point, tile: Tile) -> Option<char>;
}

#[derive(Debug, Copy, Clone)]
pub struct NoOverlay;
impl TileOverlay for NoOverlay {
    fn render_cell(&self, _: Point, _: Tile) -> Option<char> {
        None
    }
}

/// Marks the cells a path passes through with `*`.
#[derive(Debug)]
pub struct PathOverlay {
    on_path: FnvHashSet<Point>,
}
impl PathOverlay {
    pub fn new(path: &[Point]) -> Self {
        let mut on_path = utils::fnv_hashset(path.len());
        on_path.extend(path.iter().cloned());
        PathOverlay { on_path }
    }
}
impl TileOverlay for PathOverlay {
    fn render_cell(&self, p: Point, _: Tile) -> Option<char> {
        if self.on_path.contains(&p) {
            Some('*')
        } else {
            None
        }
    }
}

/// Marks a start cell `S` and an end cell `E` on top of another overlay.
pub struct StartEndOverlay<'a> {
    pub start: Point,
    pub end: Point,
    pub inner: &'a dyn TileOverlay,
}
impl<'a> TileOverlay for StartEndOverlay<'a> {
    fn render_cell(&self, p: Point, tile: Tile) -> Option<char> {
        if p == self.start {
            Some('S')
        } else if p == self.end {
            Some('E')
        } else {
            self.inner.render_cell(p, tile)
        }
    }
}
