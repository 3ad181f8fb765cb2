//! Deterministic 35 Hz simulation: actors, physics, players, weapons.

mod intercepts;
mod mobj;
mod movement;
mod player;
mod pspr;
mod respawn;
mod spatial;
mod tic;

pub use intercepts::{
    AimResult, Divline, Intercept, InterceptTarget, aim_line_attack, line_attack, melee_attack,
};
pub use mobj::{
    Effect, MobjActions, damage_mobj, find_doomed_num, pw, radius_attack, remove_mobj,
    spawn_mobj, spawn_player, spawn_player_missile, touch_special,
};
pub use player::{
    BT_ATTACK, BT_CHANGE, BT_SPECIAL, BT_USE, BT_WEAPONMASK, BT_WEAPONSHIFT, DeathUseAction,
    Player, PlayerState, TicCmd,
};
pub use pspr::{AmmoType, NUM_AMMO, NUM_WEAPONS, PsprId, Psprite, WEAPON_INFO, WeaponType};
pub use respawn::{ITEM_QUEUE_SIZE, RespawnQueue};
pub use spatial::{ThingGrid, ThingStub};
pub use tic::{MAXPLAYERS, Mobj, Sim, SimOptions, SoundOrigin, SoundRequest};

use crate::fixed::{FRACUNIT, Fixed};

pub const GRAVITY: Fixed = FRACUNIT;
pub const MAXMOVE: Fixed = 30 * FRACUNIT;
pub const STOPSPEED: Fixed = 0x1000;
pub const FRICTION: Fixed = 0xE800;
pub const FLOATSPEED: Fixed = 4 * FRACUNIT;
/// Highest step an actor can climb without jumping.
pub const MAXSTEP: Fixed = 24 * FRACUNIT;
pub const VIEWHEIGHT: Fixed = 41 * FRACUNIT;
pub const MELEERANGE: Fixed = 64 * FRACUNIT;
pub const MISSILERANGE: Fixed = 32 * 64 * FRACUNIT;

/// Spawn-height sentinels.
pub const ONFLOORZ: Fixed = Fixed::MIN;
pub const ONCEILINGZ: Fixed = Fixed::MAX;
