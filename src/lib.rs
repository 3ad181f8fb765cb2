//! Iron Doom core: deterministic 35 Hz world simulation plus the classic
//! column/span software renderer, fed from original-format WAD data.
//!
//! The crate is the engine core only.  Platform concerns (window, mixer,
//! menus, saves) stay outside and talk to it through the `Wad` container,
//! per-tick [`sim::TicCmd`]s, the framebuffer slice and the driver traits
//! in [`sound`].

pub mod defs;
pub mod finale;
pub mod fixed;
pub mod game;
pub mod level;
pub mod random;
pub mod render;
pub mod sim;
pub mod sound;
pub mod tables;
pub mod wad;
pub mod wi;
