pub mod player;
pub mod players;
pub mod sessions;
