use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde_derive::{Deserialize, Serialize};

/// An integer cell position in the dungeon.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    /// The centre of the unit cell at this point.
    pub fn cell_centre(&self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }
}

impl From<(i32, i32)> for Point {
    fn from(x_y_pair: (i32, i32)) -> Point {
        Point::new(x_y_pair.0, x_y_pair.1)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis aligned integer rectangle.
///
/// `right` and `bottom` are the last unit *inside* the rectangle, so a rectangle at x = 0 of width 5
/// spans the cells 0..=4. A room's outermost ring of cells is its wall.
#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect { x, y, width, height }
    }

    /// Build a rectangle from its inclusive edges.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect::new(left, top, right - left + 1, bottom - top + 1)
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Shrink by `dx` on the left and right and `dy` on the top and bottom.
    /// Negative amounts grow the rectangle.
    pub fn inset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width - 2 * dx, self.height - 2 * dy)
    }

    /// The walkable floor of a room: everything but the outer wall ring.
    pub fn interior(&self) -> Rect {
        self.inset(1, 1)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left <= right && top <= bottom {
            Some(Rect::from_edges(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn centre(&self) -> Vec2 {
        Vec2::new((self.left() + self.right() + 1) as f32 / 2.0,
                  (self.top() + self.bottom() + 1) as f32 / 2.0)
    }

    /// Lowest and highest coordinate along an axis.
    pub fn span(&self, axis: Axis) -> (i32, i32) {
        match axis {
            Axis::X => (self.left(), self.right()),
            Axis::Y => (self.top(), self.bottom()),
        }
    }

    pub fn length(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    /// All unit cells of the rectangle, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Point> {
        let (left, right, top, bottom) = (self.left(), self.right(), self.top(), self.bottom());
        (top..=bottom).flat_map(move |y| (left..=right).map(move |x| Point::new(x, y)))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rect{{{}, {}, {}, {}}}", self.x, self.y, self.width, self.height)
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// How two connected rooms sit relative to each other.
///
/// `Horizontal` rooms are side by side, sharing a vertical wall; a door between them sits at the
/// wall's x and the transverse (y) coordinate varies. `Vertical` rooms are stacked.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// The axis along which the two rooms follow one another.
    pub fn connecting_axis(self) -> Axis {
        match self {
            Orientation::Horizontal => Axis::X,
            Orientation::Vertical => Axis::Y,
        }
    }

    /// The axis along the shared wall.
    pub fn transverse_axis(self) -> Axis {
        self.connecting_axis().other()
    }
}

/// Which of a pair of rooms comes geometrically first along the connecting axis.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum Side {
    /// The room the adjacency is reported for is left of / above the other.
    AtoB,
    /// The other room is left of / above the room the adjacency is reported for.
    BtoA,
}

/// Float position used by the navigation graph and the agent.
#[derive(PartialEq, Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(&self, other: Vec2) -> f32 {
        (other - *self).length_squared()
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        (other - *self).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}
