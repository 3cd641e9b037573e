pub mod ai;
pub mod cell;
pub mod entity;
pub mod maze;
pub mod mover;
