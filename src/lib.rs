//! Starblitz Server Library
//!
//! Authoritative server core for a side-scrolling multiplayer shooter.
//! Sessions simulate waves of enemies, missiles, items, and player state on
//! a fixed tick; clients only ever see the notifications a session emits.

pub mod config;
pub mod directory;
pub mod game;
pub mod net;
pub mod util;
