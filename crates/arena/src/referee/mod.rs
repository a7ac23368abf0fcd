pub mod engine;
pub mod game;
pub mod protocol;
pub mod time_control;
pub mod types;

pub use engine::{EngineConfig, EngineProcess};
pub use game::{
    EnginePair, GameConfig, GameObserver, MoveEvent, SilentObserver, play_game, run_game,
};
pub use protocol::{EngineLink, ProtocolClient};
pub use time_control::{Clock, ClockSettings};
pub use types::{Color, GameRecord, Player, Seating, Termination, duration_to_millis};
