//! Actor lifecycle: spawn, state machine, damage, pickups, missiles.
//!
//! Think functions operate on a copied [`Mobj`] and queue side effects in a
//! [`MobjActions`] list; [`run_effects`] drains the list after the copy is
//! written back, so no two world borrows ever overlap.

use crate::defs::flags::{MF_TRANSSHIFT, MobjFlags, ThingOptions};
use crate::defs::mobjinfo::{FLOAT_BOB_TYPES, MOBJINFO, MobjType, NUM_MOBJ_TYPES};
use crate::defs::sound::Sfx;
use crate::defs::states::StateId;
use crate::defs::Action;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::game::{Skill, TICRATE};
use crate::level::Level;
use crate::sim::player::PlayerState;
use crate::sim::spatial::ThingStub;
use crate::sim::tic::{Mobj, Sim, SoundOrigin};
use crate::sim::{MELEERANGE, ONCEILINGZ, ONFLOORZ, VIEWHEIGHT, movement, pspr, respawn};
use crate::tables::{ANG45, ANG90, Angle, fine_cosine, fine_sine, to_fine};
use crate::wad::MapThing;
use hecs::Entity;
use log::warn;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::collections::HashMap;

/// A deferred simulation side effect.
#[derive(Clone, Copy, Debug)]
pub enum Effect {
    /// Run a state-table action code for `ent`.
    Act { ent: Entity, action: Action },
    Damage {
        target: Entity,
        inflictor: Option<Entity>,
        source: Option<Entity>,
        damage: i32,
    },
    Touch { special: Entity, toucher: Entity },
    Explode { ent: Entity, safe: bool },
    Remove(Entity),
}

pub type MobjActions = SmallVec<[Effect; 4]>;

/// Monster corpses get this many tics of ledge torque.
pub const CORPSE_GEARTICS: i32 = 15 * TICRATE as i32;

/* ─────────────────── floating powerup amplitude LUTs ─────────────────── */

#[rustfmt::skip]
static FLOAT_BOB_SMALL: [Fixed; 64] = [
         0,   17129,   34094,   50730,   66878,   82382,   97092,  110868,
    123575,  135093,  145309,  154126,  161459,  167237,  171404,  173921,
    174762,  173921,  171404,  167237,  161459,  154126,  145309,  135093,
    123575,  110868,   97092,   82382,   66878,   50730,   34094,   17129,
        -1,  -17130,  -34094,  -50731,  -66879,  -82382,  -97093, -110868,
   -123576, -135093, -145310, -154127, -161460, -167237, -171405, -173921,
   -174762, -173921, -171404, -167237, -161459, -154127, -145310, -135093,
   -123576, -110868,  -97093,  -82382,  -66879,  -50731,  -34094,  -17129,
];

#[rustfmt::skip]
static FLOAT_BOB_MEDIUM: [Fixed; 64] = [
         0,   25694,   51141,   76096,  100318,  123573,  145639,  166302,
    185363,  202640,  217964,  231190,  242189,  250856,  257106,  260881,
    262143,  260881,  257106,  250856,  242189,  231190,  217964,  202640,
    185363,  166302,  145639,  123573,  100318,   76096,   51141,   25694,
         0,  -25695,  -51142,  -76096, -100318, -123574, -145639, -166302,
   -185364, -202640, -217965, -231190, -242190, -250856, -257107, -260882,
   -262144, -260882, -257107, -250856, -242189, -231190, -217965, -202640,
   -185364, -166302, -145639, -123574, -100318,  -76096,  -51142,  -25694,
];

#[rustfmt::skip]
static FLOAT_BOB_BIG: [Fixed; 64] = [
         0,   51389,  102283,  152192,  200636,  247147,  291278,  332604,
    370727,  405280,  435929,  462380,  484378,  501712,  514213,  521763,
    524287,  521763,  514213,  501712,  484378,  462380,  435929,  405280,
    370727,  332604,  291278,  247147,  200636,  152192,  102283,   51389,
        -1,  -51390, -102284, -152193, -200637, -247148, -291279, -332605,
   -370728, -405281, -435930, -462381, -484380, -501713, -514215, -521764,
   -524288, -521764, -514214, -501713, -484379, -462381, -435930, -405280,
   -370728, -332605, -291279, -247148, -200637, -152193, -102284,  -51389,
];

/* ───────────────────────── editor number lookup ──────────────────────── */

static DOOMEDNUM: Lazy<HashMap<i32, MobjType>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(NUM_MOBJ_TYPES);
    for (i, info) in MOBJINFO.iter().enumerate() {
        if info.doomednum != -1 {
            // same order as the table, later entries never shadow earlier
            map.entry(info.doomednum)
                .or_insert(unsafe { std::mem::transmute::<u16, MobjType>(i as u16) });
        }
    }
    map
});

/// Actor type for a map editor number.
pub fn find_doomed_num(num: i32) -> Option<MobjType> {
    DOOMEDNUM.get(&num).copied()
}

/* ───────────────────────────── state machine ─────────────────────────── */

/// Walk the state chain; zero-tic states cascade, their actions queue in
/// order.  Returns `false` when the chain reached the delete sentinel.
pub(crate) fn set_mobj_state(
    ent: Entity,
    m: &mut Mobj,
    mut state: StateId,
    fx: &mut MobjActions,
) -> bool {
    let mut guard = 0u32;
    loop {
        if state == StateId::NULL {
            m.tics = -1;
            return false;
        }
        let st = state.info();
        m.state = state;
        m.tics = st.tics;
        m.sprite = st.sprite;
        m.frame = st.frame;
        if st.action != Action::None {
            fx.push(Effect::Act {
                ent,
                action: st.action,
            });
        }
        state = st.next;

        guard += 1;
        if guard > 1_000_000 {
            panic!("infinite state cycle detected at {:?}", m.state);
        }
        if m.tics != 0 {
            return true;
        }
    }
}

/* ─────────────────────────────── spawning ────────────────────────────── */

pub fn spawn_mobj(sim: &mut Sim, level: &Level, kind: MobjType, x: Fixed, y: Fixed, z: Fixed) -> Entity {
    let info = kind.info();
    let ss = level.locate_subsector(x, y);
    let sector = level.subsectors[ss as usize].sector;
    let floorz = level.sectors[sector as usize].floorh;
    let ceilingz = level.sectors[sector as usize].ceilh;

    let z = if z == ONFLOORZ {
        floorz
    } else if z == ONCEILINGZ {
        ceilingz - info.height
    } else {
        z
    };

    let state = info.spawnstate;
    let st = state.info();

    let m = Mobj {
        kind,
        info,
        x,
        y,
        z,
        angle: 0,
        oldx: x,
        oldy: y,
        oldz: z,
        oldangle: 0,
        momx: 0,
        momy: 0,
        momz: 0,
        radius: info.radius,
        height: info.height,
        floorz,
        ceilingz,
        flags: info.flags,
        health: info.spawnhealth,
        reactiontime: if sim.opts.skill != Skill::Nightmare {
            info.reactiontime
        } else {
            0
        },
        movecount: 0,
        state,
        tics: st.tics,
        sprite: st.sprite,
        frame: st.frame,
        subsector: ss,
        player: None,
        target: None,
        tracer: None,
        spawnpoint: MapThing::default(),
        interp: 0,
        float_amp: (sim.vis_rng.next() % 63) as u8,
        float_z: z,
        old_float_z: z,
        gear: 0,
        geartics: 0,
        falling: false,
        flip: false,
    };

    let ent = sim.world.spawn((m,));
    sim.thinkers.push(ent);
    sim.grid.set_position(m.stub(ent), sector);
    ent
}

/// Unlink and free.  Map-placed specials re-enter the world through the
/// respawn queue in deathmatch 2/3.
pub fn remove_mobj(sim: &mut Sim, level: &Level, ent: Entity) {
    let Some(m) = sim.mobj(ent) else { return };

    if m.flags.contains(MobjFlags::SPECIAL)
        && !m.flags.contains(MobjFlags::DROPPED)
        && m.kind != MobjType::INVULN
        && m.kind != MobjType::INVIS
    {
        sim.respawn_queue.push(m.spawnpoint, sim.leveltime);
    }

    let sector = level.subsectors[m.subsector as usize].sector;
    sim.grid.unset_position(&m.stub(ent), sector);
    let _ = sim.world.despawn(ent);
}

/// Filter one map record and put the matching actor into the world.
pub(crate) fn spawn_map_thing(sim: &mut Sim, level: &Level, mt: MapThing) {
    // deathmatch start pads are collected by the host shell, not spawned
    if mt.kind == 11 {
        return;
    }

    if (1..=4).contains(&mt.kind) {
        let slot = (mt.kind - 1) as usize;
        if sim.opts.deathmatch == 0 && slot < sim.players.len() && sim.players[slot].in_game {
            spawn_player(sim, level, mt, slot);
        }
        return;
    }

    let options = ThingOptions::from_bits_truncate(mt.options as u16);
    if !sim.opts.netgame && options.contains(ThingOptions::NOT_SINGLE) {
        return;
    }
    if options.bits() & sim.opts.skill.option_bit() == 0 {
        return;
    }

    let Some(kind) = find_doomed_num(mt.kind as i32) else {
        warn!("unknown thing type {} at ({}, {})", mt.kind, mt.x, mt.y);
        return;
    };
    let info = kind.info();

    if sim.opts.deathmatch != 0 && info.flags.contains(MobjFlags::NOTDMATCH) {
        return;
    }
    if sim.opts.no_monsters
        && (kind == MobjType::SKULL || info.flags.contains(MobjFlags::COUNTKILL))
    {
        return;
    }

    let x = (mt.x as Fixed) << FRACBITS;
    let y = (mt.y as Fixed) << FRACBITS;
    let z = if info.flags.contains(MobjFlags::SPAWNCEILING) {
        ONCEILINGZ
    } else {
        ONFLOORZ
    };

    let ent = spawn_mobj(sim, level, kind, x, y, z);
    let mut m = sim.mobj(ent).expect("freshly spawned");
    m.spawnpoint = mt;
    m.angle = (ANG45).wrapping_mul((mt.angle as u32) / 45);
    m.oldangle = m.angle;
    if m.tics > 0 {
        m.tics = 1 + sim.game_rng.next() % m.tics;
    }
    if options.contains(ThingOptions::AMBUSH) {
        m.flags |= MobjFlags::AMBUSH;
    }
    sim.put_mobj(ent, m);

    if info.flags.contains(MobjFlags::COUNTKILL) {
        sim.total_kills += 1;
    }
    if info.flags.contains(MobjFlags::COUNTITEM) {
        sim.total_items += 1;
    }
}

/// Called at level load and on every rebirth.
pub fn spawn_player(sim: &mut Sim, level: &Level, mt: MapThing, slot: usize) {
    if sim.players[slot].playerstate == PlayerState::Reborn {
        sim.players[slot].reborn_defaults();
    }

    let x = (mt.x as Fixed) << FRACBITS;
    let y = (mt.y as Fixed) << FRACBITS;
    let ent = spawn_mobj(sim, level, MobjType::PLAYER, x, y, ONFLOORZ);

    let mut m = sim.mobj(ent).expect("freshly spawned");
    if slot > 0 {
        m.flags |= MobjFlags::from_bits_truncate((slot as u32) << MF_TRANSSHIFT);
    }
    m.angle = (ANG45).wrapping_mul((mt.angle as u32) / 45);
    m.oldangle = m.angle;
    m.player = Some(slot as u8);
    m.health = sim.players[slot].health;
    m.spawnpoint = mt;
    sim.put_mobj(ent, m);

    {
        let p = &mut sim.players[slot];
        p.mo = Some(ent);
        p.playerstate = PlayerState::Alive;
        p.refire = 0;
        p.damagecount = 0;
        p.bonuscount = 0;
        p.extralight = 0;
        p.fixedcolormap = 0;
        p.viewheight = VIEWHEIGHT;
        p.viewz = m.z + VIEWHEIGHT;
        p.oldviewz = p.viewz;
        p.attackdown = true;
        p.usedown = true;
    }

    pspr::setup_psprites(sim, level, slot);
}

/* ─────────────────────────────── thinker ─────────────────────────────── */

pub(crate) fn mobj_think(sim: &mut Sim, level: &Level, ent: Entity) {
    let Some(mut m) = sim.mobj(ent) else { return };
    let mut fx = MobjActions::new();

    /* interpolation bookkeeping */
    if m.interp == -1 {
        m.interp = 0;
    } else if m.player.is_none() {
        // active player bodies snapshot in player_think instead
        m.interp = 1;
        m.oldx = m.x;
        m.oldy = m.y;
        m.oldz = m.z;
        m.oldangle = m.angle;
        m.old_float_z = m.float_z;
    }
    sim.put_mobj(ent, m);

    /* momentum movement */
    if m.momx != 0 || m.momy != 0 || m.flags.contains(MobjFlags::SKULLFLY) {
        movement::xy_movement(sim, level, ent, &mut fx);
        match sim.mobj(ent) {
            Some(nm) => m = nm,
            None => {
                run_effects(sim, level, fx);
                return;
            }
        }
    }

    /* floating powerups ride the amplitude tables */
    if sim.opts.floating_powerups != 0 && FLOAT_BOB_TYPES.contains(&m.kind) {
        let table = match sim.opts.floating_powerups {
            1 => &FLOAT_BOB_SMALL,
            2 => &FLOAT_BOB_MEDIUM,
            _ => &FLOAT_BOB_BIG,
        };
        m.float_z = m.floorz + table[(m.float_amp as usize) & 63];
        m.float_amp = m.float_amp.wrapping_add(1);
    }

    /* corpses hanging off a ledge get pushed over it */
    if !sim.opts.netgame && sim.opts.torque {
        if !m.flags.contains(MobjFlags::NOGRAVITY)
            && m.flags.contains(MobjFlags::CORPSE)
            && m.geartics > 0
        {
            movement::apply_torque(sim, level, ent, &mut m);
        } else {
            m.falling = false;
            m.gear = 0;
        }
    }
    sim.put_mobj(ent, m);

    /* vertical movement */
    if m.z != m.floorz || m.momz != 0 {
        movement::z_movement(sim, level, ent, &mut fx);
        match sim.mobj(ent) {
            Some(nm) => m = nm,
            None => {
                run_effects(sim, level, fx);
                return;
            }
        }
    }

    /* state ticker / nightmare respawn gate */
    let mut removed = false;
    let mut nightmare = false;
    if m.tics != -1 {
        m.tics -= 1;
        if m.tics == 0 {
            let next = m.state.info().next;
            removed = !set_mobj_state(ent, &mut m, next, &mut fx);
        }
    } else if m.flags.contains(MobjFlags::COUNTKILL) && sim.opts.respawn_monsters {
        m.movecount += 1;
        if m.movecount >= 12 * TICRATE as i32
            && (sim.leveltime & 31) == 0
            && sim.game_rng.next() > 4
        {
            nightmare = true;
        }
    }
    sim.put_mobj(ent, m);

    if removed {
        remove_mobj(sim, level, ent);
    } else if nightmare {
        respawn::nightmare_respawn(sim, level, ent);
    }
    run_effects(sim, level, fx);
}

/* ─────────────────────────── effect dispatch ─────────────────────────── */

/// Drain a queue of deferred effects, in order.  Handlers that trigger
/// further effects run them through their own nested queues.
pub(crate) fn run_effects(sim: &mut Sim, level: &Level, fx: MobjActions) {
    for effect in fx {
        match effect {
            Effect::Act { ent, action } => dispatch_action(sim, level, ent, action),
            Effect::Damage {
                target,
                inflictor,
                source,
                damage,
            } => damage_mobj(sim, level, target, inflictor, source, damage),
            Effect::Touch { special, toucher } => touch_special(sim, level, special, toucher),
            Effect::Explode { ent, safe } => explode_missile(sim, level, ent, safe),
            Effect::Remove(ent) => remove_mobj(sim, level, ent),
        }
    }
}

fn dispatch_action(sim: &mut Sim, level: &Level, ent: Entity, action: Action) {
    match action {
        Action::Explode => radius_attack(sim, level, ent, 128),
        Action::Scream => {
            let Some(m) = sim.mobj(ent) else { return };
            let sound = match m.info.deathsound {
                Sfx::None => return,
                Sfx::podth1 | Sfx::podth2 | Sfx::podth3 => match sim.game_rng.next() % 3 {
                    0 => Sfx::podth1,
                    1 => Sfx::podth2,
                    _ => Sfx::podth3,
                },
                Sfx::bgdth1 | Sfx::bgdth2 => {
                    if sim.game_rng.next() % 2 == 0 {
                        Sfx::bgdth1
                    } else {
                        Sfx::bgdth2
                    }
                }
                other => other,
            };
            sim.sfx(SoundOrigin::Mobj(ent), sound);
        }
        Action::XScream => sim.sfx(SoundOrigin::Mobj(ent), Sfx::slop),
        Action::Pain => {
            if let Some(m) = sim.mobj(ent) {
                sim.sfx(SoundOrigin::Mobj(ent), m.info.painsound);
            }
        }
        Action::PlayerScream => {
            let Some(m) = sim.mobj(ent) else { return };
            let sfx = if m.health < -50 { Sfx::pdiehi } else { Sfx::pldeth };
            sim.sfx(SoundOrigin::Mobj(ent), sfx);
        }
        Action::Fall => {
            if let Some(mut m) = sim.mobj(ent) {
                m.flags.remove(MobjFlags::SOLID);
                sim.put_mobj(ent, m);
            }
        }
        Action::BfgSpray => bfg_spray(sim, level, ent),
        // weapon-overlay codes never run in mobj context
        _ => {}
    }
}

/* ─────────────────────────── damage & death ──────────────────────────── */

pub fn damage_mobj(
    sim: &mut Sim,
    level: &Level,
    target: Entity,
    inflictor: Option<Entity>,
    source: Option<Entity>,
    mut damage: i32,
) {
    let Some(mut t) = sim.mobj(target) else { return };
    if !t.flags.contains(MobjFlags::SHOOTABLE) {
        return;
    }
    if t.health <= 0 {
        return;
    }

    if t.flags.contains(MobjFlags::SKULLFLY) {
        t.momx = 0;
        t.momy = 0;
        t.momz = 0;
    }

    if let Some(slot) = t.player {
        if sim.opts.skill == Skill::Baby {
            damage >>= 1; // take half damage in trainer mode
        }
        let p = &mut sim.players[slot as usize];
        p.health = (p.health - damage).max(0);
        p.damagecount = (p.damagecount + damage).min(100);
        if let Some(src) = source {
            p.attacker = Some(src);
        }
    }

    /* momentum push away from the source of the hit */
    if let Some(inf) = inflictor.and_then(|e| sim.mobj(e)) {
        let ang = crate::tables::point_to_angle2(inf.x, inf.y, t.x, t.y);
        let thrust =
            ((damage as i64 * (FRACUNIT as i64 >> 3) * 100) / t.info.mass.max(1) as i64) as Fixed;
        let fine = to_fine(ang);
        t.momx += fixed_mul(thrust, fine_cosine(fine));
        t.momy += fixed_mul(thrust, fine_sine(fine));
    }

    t.health -= damage;
    let mut fx = MobjActions::new();

    if t.health <= 0 {
        kill_mobj(sim, level, &mut t, target, source, &mut fx);
    } else {
        if sim.game_rng.next() < t.info.painchance && !t.flags.contains(MobjFlags::SKULLFLY) {
            t.flags |= MobjFlags::JUSTHIT;
            let painstate = t.info.painstate;
            set_mobj_state(target, &mut t, painstate, &mut fx);
        }
        t.reactiontime = 0;
        if t.player.is_none() {
            t.target = source;
        }
    }

    sim.put_mobj(target, t);
    run_effects(sim, level, fx);
}

fn kill_mobj(
    sim: &mut Sim,
    level: &Level,
    t: &mut Mobj,
    ent: Entity,
    source: Option<Entity>,
    fx: &mut MobjActions,
) {
    t.flags
        .remove(MobjFlags::SHOOTABLE | MobjFlags::FLOAT | MobjFlags::SKULLFLY);
    if t.kind != MobjType::SKULL {
        t.flags.remove(MobjFlags::NOGRAVITY);
    }
    t.flags |= MobjFlags::CORPSE | MobjFlags::DROPOFF;
    t.height >>= 2;
    t.geartics = CORPSE_GEARTICS;
    t.flip = (sim.vis_rng.next() & 1) != 0;

    if t.flags.contains(MobjFlags::COUNTKILL) {
        match source.and_then(|s| sim.mobj(s)).and_then(|s| s.player) {
            Some(slot) => sim.players[slot as usize].killcount += 1,
            // kills with no player source still count for %100 tallies
            None => sim.players[0].killcount += 1,
        }
    }

    if let Some(slot) = t.player {
        t.flags.remove(MobjFlags::SOLID);
        sim.players[slot as usize].playerstate = PlayerState::Dead;
        pspr::drop_weapon(sim, level, slot as usize);
    }

    let state = if t.health < -t.info.spawnhealth && t.info.xdeathstate != StateId::NULL {
        t.info.xdeathstate
    } else {
        t.info.deathstate
    };
    set_mobj_state(ent, t, state, fx);
    t.tics -= sim.game_rng.next() & 3;
    if t.tics < 1 {
        t.tics = 1;
    }
}

/* ───────────────────────────── pickups ───────────────────────────────── */

/// Give the touched special's payload to the toucher and retire it.
pub fn touch_special(sim: &mut Sim, level: &Level, special: Entity, toucher: Entity) {
    let Some(s) = sim.mobj(special) else { return };
    let Some(t) = sim.mobj(toucher) else { return };

    let delta = s.z - t.z;
    if delta > t.height || delta < -8 * FRACUNIT {
        return; // out of reach vertically
    }
    if t.health <= 0 {
        return;
    }
    let Some(slot) = t.player else { return };

    let taken = {
        let p = &mut sim.players[slot as usize];
        match s.kind {
            MobjType::STIMPACK => p.give_health(10),
            MobjType::MEDIKIT => p.give_health(25),
            MobjType::SOULSPHERE => {
                p.health = (p.health + 100).min(200);
                true
            }
            MobjType::MEGA => {
                p.health = 200;
                true
            }
            MobjType::CLIP => p.give_ammo(crate::sim::AmmoType::Clip, 10),
            MobjType::INVULN => {
                p.powers[pw::INVULNERABILITY] = 30 * TICRATE as i32;
                true
            }
            MobjType::INVIS => {
                p.powers[pw::INVISIBILITY] = 60 * TICRATE as i32;
                true
            }
            _ => false,
        }
    };
    if !taken {
        return;
    }

    if s.kind == MobjType::INVIS {
        if let Some(mut tm) = sim.mobj(toucher) {
            tm.flags |= MobjFlags::SHADOW;
            sim.put_mobj(toucher, tm);
        }
    }
    if let Some(mut tm) = sim.mobj(toucher) {
        tm.health = sim.players[slot as usize].health;
        sim.put_mobj(toucher, tm);
    }

    if s.flags.contains(MobjFlags::COUNTITEM) {
        sim.players[slot as usize].itemcount += 1;
    }
    sim.players[slot as usize].bonuscount += 6;
    sim.sfx(SoundOrigin::Mobj(toucher), Sfx::itemup);

    remove_mobj(sim, level, special);
}

/// Power-up timer slots.
pub mod pw {
    pub const INVULNERABILITY: usize = 0;
    pub const STRENGTH: usize = 1;
    pub const INVISIBILITY: usize = 2;
    pub const IRONFEET: usize = 3;
    pub const ALLMAP: usize = 4;
    pub const INFRARED: usize = 5;
    pub const NUM_POWERS: usize = 6;
}

/* ─────────────────────────── missiles & fx ───────────────────────────── */

/// Switch a missile into its explosion, with the classic tic jitter.
/// "Safe" explosions (sky-adjacent) jitter on the cosmetic stream so they
/// cannot perturb gameplay randomness.
pub fn explode_missile(sim: &mut Sim, level: &Level, ent: Entity, safe: bool) {
    let Some(mut m) = sim.mobj(ent) else { return };
    m.momx = 0;
    m.momy = 0;
    m.momz = 0;

    let mut fx = MobjActions::new();
    let deathstate = m.info.deathstate;
    let removed = !set_mobj_state(ent, &mut m, deathstate, &mut fx);

    let jitter = if safe {
        sim.vis_rng.next()
    } else {
        sim.game_rng.next()
    };
    m.tics -= jitter & 3;
    if m.tics < 1 {
        m.tics = 1;
    }
    m.flags.remove(MobjFlags::MISSILE);
    if m.info.deathsound != Sfx::None {
        sim.sfx(SoundOrigin::Mobj(ent), m.info.deathsound);
    }

    sim.put_mobj(ent, m);
    if removed {
        remove_mobj(sim, level, ent);
    }
    run_effects(sim, level, fx);
}

/// Fire a projectile from a player body along `angle` with vertical `slope`.
pub fn spawn_player_missile(
    sim: &mut Sim,
    level: &Level,
    source: Entity,
    kind: MobjType,
    angle: Angle,
    slope: Fixed,
) -> Entity {
    let src = sim.mobj(source).expect("missile source");
    let z = src.z + 4 * 8 * FRACUNIT;
    let ent = spawn_mobj(sim, level, kind, src.x, src.y, z);

    let mut m = sim.mobj(ent).expect("freshly spawned");
    if m.info.seesound != Sfx::None {
        sim.sfx(SoundOrigin::Mobj(ent), m.info.seesound);
    }
    m.target = Some(source);
    m.angle = angle;
    let fine = to_fine(angle);
    m.momx = fixed_mul(m.info.speed, fine_cosine(fine));
    m.momy = fixed_mul(m.info.speed, fine_sine(fine));
    m.momz = fixed_mul(m.info.speed, slope);
    m.interp = -1; // suppress interpolation on the spawn tic

    /* classic spawn check: jitter the first frame and nudge forward */
    m.tics -= sim.game_rng.next() & 3;
    if m.tics < 1 {
        m.tics = 1;
    }
    m.x += m.momx >> 1;
    m.y += m.momy >> 1;
    m.z += m.momz >> 1;
    sim.put_mobj(ent, m);

    let mut fx = MobjActions::new();
    if !movement::try_move(sim, level, ent, m.x, m.y, &mut fx) {
        fx.push(Effect::Explode { ent, safe: false });
    }
    run_effects(sim, level, fx);
    ent
}

/// Bullet impact spark.  Position jitter rides the cosmetic stream.
pub fn spawn_puff(sim: &mut Sim, level: &Level, x: Fixed, y: Fixed, z: Fixed, attackrange: Fixed) {
    let z = z + ((sim.vis_rng.sub_random()) << 10);
    let ent = spawn_mobj(sim, level, MobjType::PUFF, x, y, z);
    let mut m = sim.mobj(ent).expect("freshly spawned");
    m.momz = FRACUNIT;
    m.tics -= sim.vis_rng.next() & 3;
    if m.tics < 1 {
        m.tics = 1;
    }
    // melee impacts skip the flash frames
    if attackrange == MELEERANGE {
        let st = StateId::PUFF3.info();
        m.state = StateId::PUFF3;
        m.tics = st.tics;
        m.sprite = st.sprite;
        m.frame = st.frame;
    }
    sim.put_mobj(ent, m);
}

pub fn spawn_blood(sim: &mut Sim, level: &Level, x: Fixed, y: Fixed, z: Fixed, damage: i32) {
    let z = z + ((sim.vis_rng.sub_random()) << 10);
    let ent = spawn_mobj(sim, level, MobjType::BLOOD, x, y, z);
    let mut m = sim.mobj(ent).expect("freshly spawned");
    m.momz = 2 * FRACUNIT;
    m.tics -= sim.vis_rng.next() & 3;
    if m.tics < 1 {
        m.tics = 1;
    }
    m.flip = (sim.vis_rng.next() & 1) != 0;

    let state = if (9..=12).contains(&damage) {
        Some(StateId::BLOOD2)
    } else if damage < 9 {
        Some(StateId::BLOOD3)
    } else {
        None
    };
    if let Some(state) = state {
        let st = state.info();
        m.state = state;
        m.tics = st.tics;
        m.sprite = st.sprite;
        m.frame = st.frame;
    }
    sim.put_mobj(ent, m);
}

/* ─────────────────────────── area damage ─────────────────────────────── */

/// Splash damage around an exploding thing.
pub fn radius_attack(sim: &mut Sim, level: &Level, spot: Entity, damage: i32) {
    let Some(sp) = sim.mobj(spot) else { return };
    let source = sp.target;
    let range = ((damage as Fixed) << FRACBITS) + crate::level::setup::MAXRADIUS;

    let mut victims: SmallVec<[ThingStub; 16]> = SmallVec::new();
    sim.grid.for_each_in_bbox(
        sp.x - range,
        sp.y - range,
        sp.x + range,
        sp.y + range,
        |stub| {
            if stub.flags.contains(MobjFlags::SHOOTABLE) {
                victims.push(*stub);
            }
            true
        },
    );

    for stub in victims {
        if stub.ent == spot {
            continue;
        }
        let dx = (stub.x - sp.x).abs();
        let dy = (stub.y - sp.y).abs();
        let mut d = dx.max(dy) - stub.radius;
        if d < 0 {
            d = 0;
        }
        let d = d >> FRACBITS;
        if d >= damage {
            continue; // out of range
        }
        if crate::sim::intercepts::sight_clear(sim, level, &sp, &stub) {
            damage_mobj(sim, level, stub.ent, Some(spot), source, damage - d);
        }
    }
}

/// The BFG impact spray: forty tracer rays from the shooter's view.
fn bfg_spray(sim: &mut Sim, level: &Level, ball: Entity) {
    let Some(b) = sim.mobj(ball) else { return };
    let Some(shooter) = b.target else { return };
    if sim.mobj(shooter).is_none() {
        return;
    }

    for i in 0..40u32 {
        let an = b
            .angle
            .wrapping_sub(ANG90 / 2)
            .wrapping_add((ANG90 / 40).wrapping_mul(i));

        let aim = crate::sim::intercepts::aim_line_attack(
            sim,
            level,
            shooter,
            an,
            16 * 32 * FRACUNIT,
        );
        let Some(target) = aim.target else { continue };
        let Some(t) = sim.mobj(target) else { continue };

        spawn_mobj(
            sim,
            level,
            MobjType::EXTRABFG,
            t.x,
            t.y,
            t.z + (t.height >> 2),
        );

        let mut damage = 0;
        for _ in 0..15 {
            damage += (sim.game_rng.next() & 7) + 1;
        }
        damage_mobj(sim, level, target, Some(shooter), Some(shooter), damage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::setup::fixture::load_square;
    use crate::sim::tic::{Sim, SimOptions};
    use crate::sim::TicCmd;

    use crate::level::Level;

    fn world() -> (Level, Sim) {
        let level = load_square();
        let sim = Sim::new(&level, SimOptions::default());
        (level, sim)
    }

    #[test]
    fn spawn_sets_floor_and_sector_links() {
        let (level, mut sim) = world();
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::TROOP,
            100 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        let m = sim.mobj(ent).unwrap();
        assert_eq!(m.z, 0);
        assert_eq!(m.floorz, 0);
        assert_eq!(m.ceilingz, 128 * FRACUNIT);
        assert_eq!(sim.grid.things_in_sector(0), &[ent]);
    }

    #[test]
    fn state_chain_advances_through_zero_tic_states() {
        let (_, mut sim) = world();
        let level = load_square();
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::TROOP,
            50 * FRACUNIT,
            50 * FRACUNIT,
            ONFLOORZ,
        );
        let mut m = sim.mobj(ent).unwrap();
        let mut fx = MobjActions::new();
        assert!(set_mobj_state(ent, &mut m, StateId::TROO_DIE1, &mut fx));
        assert_eq!(m.state, StateId::TROO_DIE1);
        assert!(m.tics > 0);
        assert!(!set_mobj_state(ent, &mut m, StateId::NULL, &mut fx));
    }

    #[test]
    fn damage_kills_and_leaves_corpse() {
        let (level, mut sim) = world();
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::POSSESSED,
            100 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        damage_mobj(&mut sim, &level, ent, None, None, 1000);
        let m = sim.mobj(ent).unwrap();
        assert!(m.health <= 0);
        assert!(m.flags.contains(MobjFlags::CORPSE));
        assert!(!m.flags.contains(MobjFlags::SHOOTABLE));
        assert_eq!(m.geartics, CORPSE_GEARTICS);
    }

    #[test]
    fn thinker_count_stable_after_spawn_and_remove() {
        let (level, mut sim) = world();
        sim.spawn_map_things(&level);
        sim.ticker(&level, &[TicCmd::default()]);

        let before = sim.thinkers.len();
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::ROCKET,
            90 * FRACUNIT,
            90 * FRACUNIT,
            64 * FRACUNIT,
        );
        remove_mobj(&mut sim, &level, ent);
        sim.ticker(&level, &[TicCmd::default()]);
        assert_eq!(sim.thinkers.len(), before);
    }

    #[test]
    fn doomednum_lookup() {
        assert_eq!(find_doomed_num(3001), Some(MobjType::TROOP));
        assert_eq!(find_doomed_num(2012), Some(MobjType::MEDIKIT));
        assert_eq!(find_doomed_num(99999), None);
    }
}
