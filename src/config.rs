use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::errors::*;
use crate::units::{Height, Width};

/// Which optional generation refinements run after the space has been divided.
///
/// Tiers are ordered, every tier includes the refinements of the tiers below it.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub enum QualityTier {
    /// Partition and doors only.
    Basic,
    /// Also drop the largest and the smallest rooms before connecting them.
    WithCleanup,
    /// Also shrink the rooms, repairing doors and turning separated doors into hallways.
    WithShrinkAndHallways,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum GraphStrategy {
    /// One node per walkable cell.
    LowLevelGrid,
    /// One node per room, door and hallway end.
    HighLevelWaypoint,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    /// A door for every pair of adjacent rooms.
    Full,
    /// Doors along a depth first spanning tree of the room adjacency only.
    Minimal,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Try the longer side of a rectangle first.
    LongestAxis,
    /// Flip a coin for the first axis to try.
    Random,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonConfig {
    pub width: Width,
    pub height: Height,
    pub minimum_room_size: usize,
    pub seed: Option<u64>,
    pub quality: QualityTier,
    pub graph_strategy: GraphStrategy,
    pub connection_policy: ConnectionPolicy,
    pub split_policy: SplitPolicy,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        DungeonConfig {
            width: Width(85),
            height: Height(48),
            minimum_room_size: 10,
            seed: None,
            quality: QualityTier::Basic,
            graph_strategy: GraphStrategy::HighLevelWaypoint,
            connection_policy: ConnectionPolicy::Full,
            split_policy: SplitPolicy::Random,
        }
    }
}

impl DungeonConfig {
    /// Check the configuration describes a dungeon that can be generated at all.
    pub fn validate(&self) -> Result<()> {
        let (Width(w), Height(h)) = (self.width, self.height);
        let m = self.minimum_room_size;

        if m == 0 {
            bail!(ErrorKind::InvalidMinimumRoomSize(m));
        }
        // A room is its floor plus a wall on each side.
        if w < m + 2 || h < m + 2 {
            bail!(ErrorKind::InvalidDimensions(w, h, m));
        }
        // Splitting needs `minimum_room_size + 1` units either side of a shared wall, with a choice
        // of at least two split coordinates.
        if w.max(h) < 2 * m + 4 {
            bail!(ErrorKind::MinimumRoomSizeTooLarge(m, w, h));
        }
        Ok(())
    }
}

/// Fluent construction of a `DungeonConfig`, starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct DungeonConfigBuilder {
    config: DungeonConfig,
}

impl DungeonConfigBuilder {
    pub fn new() -> DungeonConfigBuilder {
        DungeonConfigBuilder::default()
    }
    /// Dungeon size in cells, outer walls included.
    pub fn size(mut self, width: Width, height: Height) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }
    pub fn minimum_room_size(mut self, minimum_room_size: usize) -> Self {
        self.config.minimum_room_size = minimum_room_size;
        self
    }
    /// `None` draws a fresh seed at generation time.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }
    pub fn quality(mut self, quality: QualityTier) -> Self {
        self.config.quality = quality;
        self
    }
    pub fn graph_strategy(mut self, graph_strategy: GraphStrategy) -> Self {
        self.config.graph_strategy = graph_strategy;
        self
    }
    pub fn connection_policy(mut self, connection_policy: ConnectionPolicy) -> Self {
        self.config.connection_policy = connection_policy;
        self
    }
    pub fn split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.config.split_policy = split_policy;
        self
    }

    /// Finish the configuration, failing fast on settings that can never produce a dungeon.
    pub fn build(self) -> Result<DungeonConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// String forms used by the driver's command line.

impl FromStr for QualityTier {
    type Err = Error;
    fn from_str(s: &str) -> Result<QualityTier> {
        match s.to_lowercase().as_ref() {
            "basic" => Ok(QualityTier::Basic),
            "cleanup" => Ok(QualityTier::WithCleanup),
            "shrink" => Ok(QualityTier::WithShrinkAndHallways),
            _ => Err(ErrorKind::ParseSetting("quality tier", s.to_string()).into()),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            QualityTier::Basic => "basic",
            QualityTier::WithCleanup => "cleanup",
            QualityTier::WithShrinkAndHallways => "shrink",
        };
        f.write_str(s)
    }
}

impl FromStr for GraphStrategy {
    type Err = Error;
    fn from_str(s: &str) -> Result<GraphStrategy> {
        match s.to_lowercase().as_ref() {
            "low" | "grid" => Ok(GraphStrategy::LowLevelGrid),
            "high" | "waypoint" => Ok(GraphStrategy::HighLevelWaypoint),
            _ => Err(ErrorKind::ParseSetting("graph strategy", s.to_string()).into()),
        }
    }
}

impl fmt::Display for GraphStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            GraphStrategy::LowLevelGrid => "low",
            GraphStrategy::HighLevelWaypoint => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for ConnectionPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<ConnectionPolicy> {
        match s.to_lowercase().as_ref() {
            "full" => Ok(ConnectionPolicy::Full),
            "minimal" => Ok(ConnectionPolicy::Minimal),
            _ => Err(ErrorKind::ParseSetting("connection policy", s.to_string()).into()),
        }
    }
}

impl FromStr for SplitPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<SplitPolicy> {
        match s.to_lowercase().as_ref() {
            "longest" => Ok(SplitPolicy::LongestAxis),
            "random" => Ok(SplitPolicy::Random),
            _ => Err(ErrorKind::ParseSetting("split policy", s.to_string()).into()),
        }
    }
}
