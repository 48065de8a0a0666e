pub mod collision;
pub mod constants;
pub mod entity;
pub mod session;
pub mod wave;
pub mod waves;
