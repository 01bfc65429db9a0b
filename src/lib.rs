//! **dungeons** generates rectangular room and corridor dungeons, builds navigation graphs over them
//! and moves agents along shortest paths.

#[macro_use]
extern crate error_chain;

pub mod adjacency;
pub mod agent;
pub mod config;
pub mod connections;
pub mod dungeon;
pub mod errors;
pub mod generators;
pub mod geometry;
pub mod graph_builders;
pub mod navgraph;
pub mod pathing;
pub mod shrinking;
pub mod simulation;
pub mod tiles;
pub mod units;
mod utils;
