/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and HUD messages.

use crate::domain::entity::TilePos;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PelletEaten { tile: TilePos },
    PowerPelletEaten { tile: TilePos },
    AdversaryEaten { id: usize, points: u32 },
    AdversaryRevived { id: usize },
    PowerExpired,
    PlayerCaught { by: usize, lives_left: u32 },
    RoundWon,
    RoundLost,
}
