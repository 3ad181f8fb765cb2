//! Small shared game-session enums and the tick constant.

/// Simulation rate: the atomic unit of game time is 1/35 s.
pub const TICRATE: u32 = 35;

/// Which retail flavour is running; gates shareware weapons and music.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    Shareware,
    Registered,
    Retail,
    Commercial,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMission {
    Doom,
    Doom2,
    PackNerve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Skill {
    Baby,
    Easy,
    Medium,
    Hard,
    Nightmare,
}

impl Skill {
    /// Bit used against a map thing's option word.
    pub fn option_bit(self) -> u16 {
        match self {
            Skill::Baby | Skill::Easy => 1,
            Skill::Medium => 2,
            Skill::Hard | Skill::Nightmare => 4,
        }
    }
}

/// Top-level state used by the music selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    Level,
    Intermission,
    Finale,
    DemoScreen,
}
