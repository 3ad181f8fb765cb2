//! The simulation runner: owns the ECS world, the thinker order and all
//! per-level mutable state, and drives one fixed 1/35 s tick.
//!
//! Tick order is frozen: player think, mobj thinkers, leveltime advance,
//! respawn queue.  Audio parameter updates run from the host between ticks.

use crate::defs::flags::MobjFlags;
use crate::defs::mobjinfo::{MobjInfo, MobjType};
use crate::defs::sound::Sfx;
use crate::defs::states::{SpriteId, StateId};
use crate::fixed::Fixed;
use crate::game::{GameMode, Skill};
use crate::level::Level;
use crate::random::Rng;
use crate::sim::player::{Player, TicCmd};
use crate::sim::respawn::RespawnQueue;
use crate::sim::spatial::{ThingGrid, ThingStub};
use crate::sim::{mobj, player, respawn};
use crate::tables::Angle;
use crate::wad::MapThing;
use hecs::{Entity, World};

pub const MAXPLAYERS: usize = 4;

/// One world actor.  A plain `Copy` record: think functions copy it out,
/// mutate the copy and write it back, queueing side effects.
#[derive(Clone, Copy, Debug)]
pub struct Mobj {
    pub kind: MobjType,
    pub info: &'static MobjInfo,

    pub x: Fixed,
    pub y: Fixed,
    pub z: Fixed,
    pub angle: Angle,

    /// Previous-tic values for render interpolation.
    pub oldx: Fixed,
    pub oldy: Fixed,
    pub oldz: Fixed,
    pub oldangle: Angle,

    pub momx: Fixed,
    pub momy: Fixed,
    pub momz: Fixed,

    pub radius: Fixed,
    pub height: Fixed,
    pub floorz: Fixed,
    pub ceilingz: Fixed,

    pub flags: MobjFlags,
    pub health: i32,
    pub reactiontime: i32,
    pub movecount: i32,

    pub state: StateId,
    pub tics: i32,
    pub sprite: SpriteId,
    pub frame: u16,

    pub subsector: u16,
    /// Player slot when this is a player body.
    pub player: Option<u8>,
    pub target: Option<Entity>,
    pub tracer: Option<Entity>,

    /// The map record this actor was spawned from (for respawns).
    pub spawnpoint: MapThing,

    /// -1 = suppress interpolation for one tic, 0 = off, 1 = on.
    pub interp: i8,
    /// Floating-powerup bob phase.
    pub float_amp: u8,
    pub float_z: Fixed,
    pub old_float_z: Fixed,

    /// Corpse-torque state.
    pub gear: i32,
    pub geartics: i32,
    pub falling: bool,

    /// Cosmetic horizontal mirroring chosen by the cosmetic stream.
    pub flip: bool,
}

impl Mobj {
    pub fn stub(&self, ent: Entity) -> ThingStub {
        ThingStub {
            ent,
            kind: self.kind,
            x: self.x,
            y: self.y,
            z: self.z,
            radius: self.radius,
            height: self.height,
            flags: self.flags,
        }
    }
}

/// Session-level switches that never change mid-level.
#[derive(Clone, Copy, Debug)]
pub struct SimOptions {
    pub skill: Skill,
    /// 0 = off, 1 = classic, 2/3 = altdeath variants with item respawn.
    pub deathmatch: u8,
    pub netgame: bool,
    pub respawn_monsters: bool,
    pub no_monsters: bool,
    /// Corpses slide off ledges.
    pub torque: bool,
    /// 0 = static powerups, 1..=3 = bob amplitude select.
    pub floating_powerups: u8,
    pub gamemode: GameMode,
    pub have_ssg: bool,
    pub player_count: usize,
    pub console_player: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            skill: Skill::Medium,
            deathmatch: 0,
            netgame: false,
            respawn_monsters: false,
            no_monsters: false,
            torque: true,
            floating_powerups: 2,
            gamemode: GameMode::Registered,
            have_ssg: false,
            player_count: 1,
            console_player: 0,
        }
    }
}

/// Where a queued sound is positioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundOrigin {
    /// Unpositioned (menus, pickups heard by everyone).
    None,
    Mobj(Entity),
    /// Player `slot`'s weapon sound proxy - always local to that player.
    WeaponProxy(u8),
}

#[derive(Clone, Copy, Debug)]
pub struct SoundRequest {
    pub origin: SoundOrigin,
    pub sfx: Sfx,
}

/// Owns the ECS world and drives all game-logic systems.
pub struct Sim {
    pub world: World,
    /// Insertion-ordered thinker list; iteration snapshots it so thinkers
    /// may spawn or remove others mid-tick.
    pub thinkers: Vec<Entity>,
    pub grid: ThingGrid,
    pub players: Vec<Player>,
    pub leveltime: u32,
    /// Gameplay stream: the only randomness allowed to steer simulation.
    pub game_rng: Rng,
    /// Cosmetic stream: visual jitter only.
    pub vis_rng: Rng,
    pub respawn_queue: RespawnQueue,
    pub opts: SimOptions,
    /// Sounds queued this tick, drained by the sound director.
    pub sounds: Vec<SoundRequest>,

    pub total_kills: u32,
    pub total_items: u32,

    /// Per-linedef visit stamps for the intercept traverser.
    pub(crate) line_stamp: Vec<u32>,
    pub(crate) stamp: u32,
    /// Line that lowered the ceiling in the last position check.
    pub(crate) tm_ceiling_line: Option<u16>,
}

impl Sim {
    pub fn new(level: &Level, opts: SimOptions) -> Sim {
        let mut players = Vec::with_capacity(MAXPLAYERS);
        for slot in 0..MAXPLAYERS {
            let mut p = Player::new(slot as u8);
            p.in_game = slot < opts.player_count;
            players.push(p);
        }

        Sim {
            world: World::new(),
            thinkers: Vec::new(),
            grid: ThingGrid::new(level),
            players,
            leveltime: 0,
            game_rng: Rng::new(),
            vis_rng: Rng::new(),
            respawn_queue: RespawnQueue::new(),
            opts,
            sounds: Vec::new(),
            total_kills: 0,
            total_items: 0,
            line_stamp: vec![0; level.linedefs.len()],
            stamp: 0,
            tm_ceiling_line: None,
        }
    }

    /// Filter and spawn every map thing, then put the players in.
    pub fn spawn_map_things(&mut self, level: &Level) {
        for i in 0..level.things.len() {
            let mt = level.things[i];
            mobj::spawn_map_thing(self, level, mt);
        }
    }

    /// Queue a positional sound for the director.
    pub fn sfx(&mut self, origin: SoundOrigin, sfx: Sfx) {
        if sfx != Sfx::None {
            self.sounds.push(SoundRequest { origin, sfx });
        }
    }

    /// Sounds queued since the last drain, in emission order.
    pub fn take_sounds(&mut self) -> Vec<SoundRequest> {
        std::mem::take(&mut self.sounds)
    }

    /// Borrow an actor copy; `None` when the weak reference died.
    #[inline]
    pub fn mobj(&self, ent: Entity) -> Option<Mobj> {
        self.world.get::<&Mobj>(ent).ok().map(|m| *m)
    }

    /// Write back a mutated actor copy.
    #[inline]
    pub(crate) fn put_mobj(&mut self, ent: Entity, m: Mobj) {
        if let Ok(mut slot) = self.world.get::<&mut Mobj>(ent) {
            *slot = m;
        }
    }

    /// Advance the world one tick.
    pub fn ticker(&mut self, level: &Level, cmds: &[TicCmd]) {
        /* 1. players ---------------------------------------------------- */
        for i in 0..self.players.len() {
            if !self.players[i].in_game {
                continue;
            }
            self.players[i].cmd = cmds.get(i).copied().unwrap_or_default();
            player::player_think(self, level, i);
        }

        /* 2. thinkers, in insertion order ------------------------------- */
        let snapshot = self.thinkers.clone();
        for ent in snapshot {
            if self.world.contains(ent) {
                mobj::mobj_think(self, level, ent);
            }
        }
        // compact entries freed during the walk
        {
            let Sim {
                world, thinkers, ..
            } = self;
            thinkers.retain(|&e| world.contains(e));
        }

        /* 3. time ------------------------------------------------------- */
        self.leveltime += 1;

        /* 4. respawn queue ---------------------------------------------- */
        respawn::run_respawns(self, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::setup::fixture::load_square;

    #[test]
    fn tick_advances_leveltime() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        let cmds = [TicCmd::default()];
        for _ in 0..5 {
            sim.ticker(&level, &cmds);
        }
        assert_eq!(sim.leveltime, 5);
    }

    #[test]
    fn determinism_same_inputs_same_positions() {
        let level = load_square();
        let run = || {
            let mut sim = Sim::new(&level, SimOptions::default());
            sim.spawn_map_things(&level);
            let mut cmd = TicCmd::default();
            cmd.forwardmove = 25;
            let mut trace = Vec::new();
            for _ in 0..70 {
                sim.ticker(&level, &[cmd]);
                let p = &sim.players[0];
                let mo = p.mo.and_then(|e| sim.mobj(e)).unwrap();
                trace.push((mo.x, mo.y, mo.z, mo.angle, p.health));
            }
            trace
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cosmetic_stream_does_not_touch_gameplay() {
        let level = load_square();
        let mut a = Sim::new(&level, SimOptions::default());
        let mut b = Sim::new(&level, SimOptions::default());
        a.spawn_map_things(&level);
        b.spawn_map_things(&level);
        // burn only the cosmetic stream on one of the two worlds
        for _ in 0..17 {
            b.vis_rng.next();
        }
        for _ in 0..35 {
            a.ticker(&level, &[TicCmd::default()]);
            b.ticker(&level, &[TicCmd::default()]);
        }
        assert_eq!(a.game_rng.index(), b.game_rng.index());
    }
}
