//! The weapon overlay: two player sprites (gun and muzzle flash) driven by
//! the shared state table, plus every trigger-pull action.

use crate::defs::action::Action;
use crate::defs::sound::Sfx;
use crate::defs::states::StateId;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::game::GameMode;
use crate::level::Level;
use crate::sim::intercepts::{aim_line_attack, line_attack, melee_attack};
use crate::sim::mobj::{MobjActions, pw, run_effects, set_mobj_state, spawn_player_missile};
use crate::sim::player::{BT_ATTACK, PlayerState};
use crate::sim::tic::{Sim, SoundOrigin};
use crate::sim::{MELEERANGE, MISSILERANGE};
use crate::sound::uses_weapon_proxy;
use crate::defs::mobjinfo::MobjType;
use crate::tables::{FINEANGLES, FINEMASK, fine_cosine, fine_sine, point_to_angle2};

pub const NUM_WEAPONS: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WeaponType {
    Fist,
    Pistol,
    Shotgun,
    Chaingun,
    Missile,
    Plasma,
    Bfg,
    Chainsaw,
    SuperShotgun,
}

impl WeaponType {
    pub fn from_index(i: usize) -> WeaponType {
        const ALL: [WeaponType; NUM_WEAPONS] = [
            WeaponType::Fist,
            WeaponType::Pistol,
            WeaponType::Shotgun,
            WeaponType::Chaingun,
            WeaponType::Missile,
            WeaponType::Plasma,
            WeaponType::Bfg,
            WeaponType::Chainsaw,
            WeaponType::SuperShotgun,
        ];
        ALL[i.min(NUM_WEAPONS - 1)]
    }
}

pub const NUM_AMMO: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AmmoType {
    Clip,
    Shell,
    Cell,
    Missile,
    /// Fist and chainsaw.
    NoAmmo,
}

/// Static per-weapon state bindings.
#[derive(Clone, Copy, Debug)]
pub struct WeaponInfo {
    pub ammo: AmmoType,
    pub upstate: StateId,
    pub downstate: StateId,
    pub readystate: StateId,
    pub atkstate: StateId,
    pub flashstate: StateId,
}

pub static WEAPON_INFO: [WeaponInfo; NUM_WEAPONS] = [
    // fist
    WeaponInfo {
        ammo: AmmoType::NoAmmo,
        upstate: StateId::PUNCHUP,
        downstate: StateId::PUNCHDOWN,
        readystate: StateId::PUNCH,
        atkstate: StateId::PUNCH1,
        flashstate: StateId::NULL,
    },
    // pistol
    WeaponInfo {
        ammo: AmmoType::Clip,
        upstate: StateId::PISTOLUP,
        downstate: StateId::PISTOLDOWN,
        readystate: StateId::PISTOL,
        atkstate: StateId::PISTOL1,
        flashstate: StateId::PISTOLFLASH,
    },
    // shotgun
    WeaponInfo {
        ammo: AmmoType::Shell,
        upstate: StateId::SGUNUP,
        downstate: StateId::SGUNDOWN,
        readystate: StateId::SGUN,
        atkstate: StateId::SGUN1,
        flashstate: StateId::SGUNFLASH1,
    },
    // chaingun
    WeaponInfo {
        ammo: AmmoType::Clip,
        upstate: StateId::CHAINUP,
        downstate: StateId::CHAINDOWN,
        readystate: StateId::CHAIN,
        atkstate: StateId::CHAIN1,
        flashstate: StateId::CHAINFLASH1,
    },
    // rocket launcher
    WeaponInfo {
        ammo: AmmoType::Missile,
        upstate: StateId::MISSILEUP,
        downstate: StateId::MISSILEDOWN,
        readystate: StateId::MISSILE,
        atkstate: StateId::MISSILE1,
        flashstate: StateId::MISSILEFLASH1,
    },
    // plasma rifle
    WeaponInfo {
        ammo: AmmoType::Cell,
        upstate: StateId::PLASMAUP,
        downstate: StateId::PLASMADOWN,
        readystate: StateId::PLASMA,
        atkstate: StateId::PLASMA1,
        flashstate: StateId::PLASMAFLASH1,
    },
    // BFG 9000
    WeaponInfo {
        ammo: AmmoType::Cell,
        upstate: StateId::BFGUP,
        downstate: StateId::BFGDOWN,
        readystate: StateId::BFG,
        atkstate: StateId::BFG1,
        flashstate: StateId::BFGFLASH1,
    },
    // chainsaw
    WeaponInfo {
        ammo: AmmoType::NoAmmo,
        upstate: StateId::SAWUP,
        downstate: StateId::SAWDOWN,
        readystate: StateId::SAW,
        atkstate: StateId::SAW1,
        flashstate: StateId::NULL,
    },
    // super shotgun
    WeaponInfo {
        ammo: AmmoType::Shell,
        upstate: StateId::DSGUNUP,
        downstate: StateId::DSGUNDOWN,
        readystate: StateId::DSGUN,
        atkstate: StateId::DSGUN1,
        flashstate: StateId::DSGUNFLASH1,
    },
];

/// Cells one BFG shot burns.
pub const BFG_CELLS_PER_SHOT: i32 = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum PsprId {
    Weapon = 0,
    Flash = 1,
}

pub const WEAPONTOP: Fixed = 32 * FRACUNIT;
pub const WEAPONBOTTOM: Fixed = 128 * FRACUNIT;
const LOWERSPEED: Fixed = 6 * FRACUNIT;
const RAISESPEED: Fixed = 6 * FRACUNIT;

/// One overlay sprite.  `sx2/sy2` and their backups feed uncapped-rate
/// interpolation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Psprite {
    pub state: Option<StateId>,
    pub tics: i32,
    pub sx: Fixed,
    pub sy: Fixed,
    pub sx2: Fixed,
    pub sy2: Fixed,
    pub oldsx2: Fixed,
    pub oldsy2: Fixed,
}

/* ────────────────────────── state plumbing ───────────────────────────── */

/// Weapon-sound helper: route through the proxy for the fixed set that the
/// original positions on it, at the body otherwise.
fn weapon_sfx(sim: &mut Sim, slot: usize, sfx: Sfx) {
    let origin = if uses_weapon_proxy(sfx) {
        SoundOrigin::WeaponProxy(slot as u8)
    } else {
        match sim.players[slot].mo {
            Some(ent) => SoundOrigin::Mobj(ent),
            None => SoundOrigin::None,
        }
    };
    sim.sfx(origin, sfx);
}

/// The psprite mirror of the mobj state walk, including the coordinate
/// side effect carried by states with non-zero misc fields.
pub(crate) fn set_psprite(sim: &mut Sim, level: &Level, slot: usize, pos: PsprId, state: StateId) {
    let mut stnum = state;
    let mut guard = 0u32;
    loop {
        if stnum == StateId::NULL {
            sim.players[slot].psprites[pos as usize].state = None;
            return;
        }
        let st = stnum.info();
        {
            let psp = &mut sim.players[slot].psprites[pos as usize];
            psp.state = Some(stnum);
            psp.tics = st.tics;
            if st.misc1 != 0 {
                psp.sx = (st.misc1 as Fixed) << FRACBITS;
                psp.sy = (st.misc2 as Fixed) << FRACBITS;
            }
        }

        if st.action != Action::None {
            weapon_action(sim, level, slot, pos, st.action);
            if sim.players[slot].psprites[pos as usize].state.is_none() {
                return;
            }
        }

        let cur = sim.players[slot].psprites[pos as usize];
        if cur.tics != 0 {
            return;
        }
        stnum = cur.state.expect("psprite state").info().next;

        guard += 1;
        if guard > 1_000_000 {
            panic!("infinite psprite state cycle at {:?}", stnum);
        }
    }
}

/// Starts bringing the pending weapon up from the bottom of the screen.
pub(crate) fn bring_up_weapon(sim: &mut Sim, level: &Level, slot: usize) {
    let pending = {
        let p = &mut sim.players[slot];
        let pending = p.pendingweapon.unwrap_or(p.readyweapon);
        p.pendingweapon = None;
        let psp = &mut p.psprites[PsprId::Weapon as usize];
        psp.sy = WEAPONBOTTOM;
        psp.sy2 = WEAPONBOTTOM;
        psp.oldsy2 = WEAPONBOTTOM;
        pending
    };
    if pending == WeaponType::Chainsaw {
        weapon_sfx(sim, slot, Sfx::sawup);
    }
    set_psprite(
        sim,
        level,
        slot,
        PsprId::Weapon,
        WEAPON_INFO[pending as usize].upstate,
    );
}

/// Enough ammo for one shot?  If not, pick the best fallback in the fixed
/// preference order and start lowering.
pub(crate) fn check_ammo(sim: &mut Sim, level: &Level, slot: usize) -> bool {
    let (ammo, ready) = {
        let p = &sim.players[slot];
        (WEAPON_INFO[p.readyweapon as usize].ammo, p.readyweapon)
    };
    let count = match ready {
        WeaponType::Bfg => BFG_CELLS_PER_SHOT,
        WeaponType::SuperShotgun => 2,
        _ => 1,
    };
    if ammo == AmmoType::NoAmmo || sim.players[slot].ammo(ammo) >= count {
        return true;
    }

    /* out of ammo: preferences are fixed */
    {
        let shareware = sim.opts.gamemode == GameMode::Shareware;
        let have_ssg = sim.opts.have_ssg;
        let p = &mut sim.players[slot];
        let owned = |w: WeaponType| p.weaponowned[w as usize];

        let pending = if owned(WeaponType::Plasma) && p.ammo(AmmoType::Cell) > 0 && !shareware {
            WeaponType::Plasma
        } else if owned(WeaponType::SuperShotgun) && p.ammo(AmmoType::Shell) > 2 && have_ssg {
            WeaponType::SuperShotgun
        } else if owned(WeaponType::Chaingun) && p.ammo(AmmoType::Clip) > 0 {
            WeaponType::Chaingun
        } else if owned(WeaponType::Shotgun) && p.ammo(AmmoType::Shell) > 0 {
            WeaponType::Shotgun
        } else if p.ammo(AmmoType::Clip) > 0 {
            WeaponType::Pistol
        } else if owned(WeaponType::Chainsaw) {
            WeaponType::Chainsaw
        } else if owned(WeaponType::Missile) && p.ammo(AmmoType::Missile) > 0 {
            WeaponType::Missile
        } else if owned(WeaponType::Bfg) && p.ammo(AmmoType::Cell) > BFG_CELLS_PER_SHOT && !shareware
        {
            WeaponType::Bfg
        } else {
            WeaponType::Fist
        };
        p.pendingweapon = Some(pending);
    }

    let down = WEAPON_INFO[sim.players[slot].readyweapon as usize].downstate;
    set_psprite(sim, level, slot, PsprId::Weapon, down);
    false
}

fn fire_weapon(sim: &mut Sim, level: &Level, slot: usize) {
    if !check_ammo(sim, level, slot) {
        return;
    }
    set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK1);
    let atk = WEAPON_INFO[sim.players[slot].readyweapon as usize].atkstate;
    set_psprite(sim, level, slot, PsprId::Weapon, atk);
}

/// Player died: put the weapon away.
pub(crate) fn drop_weapon(sim: &mut Sim, level: &Level, slot: usize) {
    let down = WEAPON_INFO[sim.players[slot].readyweapon as usize].downstate;
    set_psprite(sim, level, slot, PsprId::Weapon, down);
}

/// Called at spawn: clear both overlays and raise the current weapon.
pub(crate) fn setup_psprites(sim: &mut Sim, level: &Level, slot: usize) {
    for psp in sim.players[slot].psprites.iter_mut() {
        *psp = Psprite::default();
    }
    sim.players[slot].pendingweapon = Some(sim.players[slot].readyweapon);
    bring_up_weapon(sim, level, slot);
}

/// Advance both overlays one tic and refresh the interpolation anchors.
pub(crate) fn move_psprites(sim: &mut Sim, level: &Level, slot: usize) {
    for pos in [PsprId::Weapon, PsprId::Flash] {
        let (advance, next) = {
            let psp = &mut sim.players[slot].psprites[pos as usize];
            psp.oldsx2 = psp.sx2;
            psp.oldsy2 = psp.sy2;
            match psp.state {
                Some(state) if psp.tics != -1 => {
                    psp.tics -= 1;
                    (psp.tics == 0, state.info().next)
                }
                _ => (false, StateId::NULL),
            }
        };
        if advance {
            set_psprite(sim, level, slot, pos, next);
        }
    }

    let p = &mut sim.players[slot];
    let (wsx, wsy) = (
        p.psprites[PsprId::Weapon as usize].sx,
        p.psprites[PsprId::Weapon as usize].sy,
    );
    p.psprites[PsprId::Flash as usize].sx = wsx;
    p.psprites[PsprId::Flash as usize].sy = wsy;
    for pos in [PsprId::Weapon, PsprId::Flash] {
        let dy = p.psp_dy;
        let psp = &mut p.psprites[pos as usize];
        psp.sx2 = psp.sx;
        psp.sy2 = psp.sy + dy;
    }
}

/* ───────────────────────── helper attacks ────────────────────────────── */

fn set_player_mobj_state(sim: &mut Sim, level: &Level, slot: usize, state: StateId) {
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(mut m) = sim.mobj(ent) else { return };
    let mut fx = MobjActions::new();
    set_mobj_state(ent, &mut m, state, &mut fx);
    sim.put_mobj(ent, m);
    run_effects(sim, level, fx);
}

/// Autoaim straight ahead, nudging left then right like the original.
fn bullet_slope(sim: &mut Sim, level: &Level, slot: usize) -> Fixed {
    let Some(ent) = sim.players[slot].mo else { return 0 };
    let Some(m) = sim.mobj(ent) else { return 0 };

    let mut an = m.angle;
    let mut aim = aim_line_attack(sim, level, ent, an, 16 * 64 * FRACUNIT);
    if aim.target.is_none() {
        an = an.wrapping_add(1 << 26);
        aim = aim_line_attack(sim, level, ent, an, 16 * 64 * FRACUNIT);
        if aim.target.is_none() {
            an = an.wrapping_sub(2 << 26);
            aim = aim_line_attack(sim, level, ent, an, 16 * 64 * FRACUNIT);
        }
        if aim.target.is_none() {
            aim.slope = 0;
        }
    }
    aim.slope
}

/// One hitscan pellet; inaccurate shots spread horizontally.
fn gun_shot(sim: &mut Sim, level: &Level, slot: usize, accurate: bool, slope: Fixed) {
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };

    let damage = 5 * (sim.game_rng.next() % 3 + 1);
    let mut angle = m.angle;
    if !accurate {
        angle = angle.wrapping_add((sim.game_rng.sub_random() as u32) << 18);
    }
    line_attack(sim, level, ent, angle, MISSILERANGE, slope, damage);
}

/* ───────────────────────── action dispatch ───────────────────────────── */

pub(crate) fn weapon_action(sim: &mut Sim, level: &Level, slot: usize, pos: PsprId, action: Action) {
    match action {
        Action::WeaponReady => weapon_ready(sim, level, slot, pos),
        Action::Lower => lower(sim, level, slot, pos),
        Action::Raise => raise(sim, level, slot, pos),
        Action::ReFire => re_fire(sim, level, slot),
        Action::CheckReload => {
            check_ammo(sim, level, slot);
        }
        Action::GunFlash => {
            set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK2);
            let flash = WEAPON_INFO[sim.players[slot].readyweapon as usize].flashstate;
            set_psprite(sim, level, slot, PsprId::Flash, flash);
        }

        Action::Punch => punch(sim, level, slot),
        Action::Saw => saw(sim, level, slot),
        Action::FirePistol => fire_pistol(sim, level, slot),
        Action::FireShotgun => fire_shotgun(sim, level, slot),
        Action::FireShotgun2 => fire_super_shotgun(sim, level, slot),
        Action::OpenShotgun2 => weapon_sfx(sim, slot, Sfx::dbopn),
        Action::LoadShotgun2 => weapon_sfx(sim, slot, Sfx::dbload),
        Action::CloseShotgun2 => {
            weapon_sfx(sim, slot, Sfx::dbcls);
            re_fire(sim, level, slot);
        }
        Action::FireCGun => fire_chaingun(sim, level, slot),
        Action::FireMissile => fire_missile(sim, level, slot),
        Action::FirePlasma => fire_plasma(sim, level, slot),
        Action::BfgSound => weapon_sfx(sim, slot, Sfx::bfg),
        Action::FireBfg => fire_bfg(sim, level, slot),

        Action::Light0 => sim.players[slot].extralight = 0,
        Action::Light1 => sim.players[slot].extralight = 4,
        Action::Light2 => sim.players[slot].extralight = 8,

        // mobj codes never run in psprite context
        _ => {}
    }
}

fn weapon_ready(sim: &mut Sim, level: &Level, slot: usize, pos: PsprId) {
    /* leave the attack pose */
    if let Some(ent) = sim.players[slot].mo {
        if let Some(m) = sim.mobj(ent) {
            if m.state == StateId::PLAY_ATK1 || m.state == StateId::PLAY_ATK2 {
                set_player_mobj_state(sim, level, slot, StateId::PLAY);
            }
        }
    }

    if sim.players[slot].readyweapon == WeaponType::Chainsaw
        && sim.players[slot].psprites[PsprId::Weapon as usize].state == Some(StateId::SAW)
    {
        weapon_sfx(sim, slot, Sfx::sawidl);
    }

    /* change or death lowers the weapon */
    if sim.players[slot].pendingweapon.is_some() || sim.players[slot].health <= 0 {
        let down = WEAPON_INFO[sim.players[slot].readyweapon as usize].downstate;
        set_psprite(sim, level, slot, PsprId::Weapon, down);
        return;
    }

    /* fire: rocket launcher and BFG do not autorepeat */
    let cmd = sim.players[slot].cmd;
    if cmd.buttons & BT_ATTACK != 0 {
        let ready = sim.players[slot].readyweapon;
        if !sim.players[slot].attackdown
            || (ready != WeaponType::Missile && ready != WeaponType::Bfg)
        {
            sim.players[slot].attackdown = true;
            fire_weapon(sim, level, slot);
            return;
        }
    } else {
        sim.players[slot].attackdown = false;
    }

    /* bob the weapon based on movement speed */
    let angle = (128 * sim.leveltime as usize) & FINEMASK;
    let p = &mut sim.players[slot];
    let psp = &mut p.psprites[pos as usize];
    psp.sx = FRACUNIT + fixed_mul(p.r_bob, fine_cosine(angle));
    psp.sy = WEAPONTOP + fixed_mul(p.r_bob, fine_sine(angle & (FINEANGLES / 2 - 1)));
}

fn lower(sim: &mut Sim, level: &Level, slot: usize, pos: PsprId) {
    {
        let psp = &mut sim.players[slot].psprites[pos as usize];
        psp.sy += LOWERSPEED;
        if psp.sy < WEAPONBOTTOM {
            return; // still on the way down
        }
    }

    if sim.players[slot].playerstate == PlayerState::Dead {
        sim.players[slot].psprites[pos as usize].sy = WEAPONBOTTOM;
        return; // don't bring the weapon back up
    }
    if sim.players[slot].health <= 0 {
        set_psprite(sim, level, slot, PsprId::Weapon, StateId::NULL);
        return;
    }

    let pending = sim.players[slot]
        .pendingweapon
        .unwrap_or(sim.players[slot].readyweapon);
    sim.players[slot].readyweapon = pending;
    bring_up_weapon(sim, level, slot);
}

fn raise(sim: &mut Sim, level: &Level, slot: usize, pos: PsprId) {
    {
        let psp = &mut sim.players[slot].psprites[pos as usize];
        psp.sy -= RAISESPEED;
        if psp.sy > WEAPONTOP {
            return;
        }
        psp.sy = WEAPONTOP;
    }
    let ready = WEAPON_INFO[sim.players[slot].readyweapon as usize].readystate;
    set_psprite(sim, level, slot, PsprId::Weapon, ready);
}

fn re_fire(sim: &mut Sim, level: &Level, slot: usize) {
    let cmd = sim.players[slot].cmd;
    if cmd.buttons & BT_ATTACK != 0
        && sim.players[slot].pendingweapon.is_none()
        && sim.players[slot].health > 0
    {
        sim.players[slot].refire += 1;
        fire_weapon(sim, level, slot);
    } else {
        sim.players[slot].refire = 0;
        check_ammo(sim, level, slot);
    }
}

/* ─────────────────────────── the attacks ─────────────────────────────── */

fn punch(sim: &mut Sim, level: &Level, slot: usize) {
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };

    let mut damage = (sim.game_rng.next() % 10 + 1) << 1;
    if sim.players[slot].powers[pw::STRENGTH] != 0 {
        damage *= 10;
    }
    let angle = m
        .angle
        .wrapping_add((sim.game_rng.sub_random() as u32) << 18);

    let hit = melee_attack(sim, level, ent, angle, MELEERANGE, damage);

    if let Some(target) = hit.and_then(|t| sim.mobj(t)) {
        weapon_sfx(sim, slot, Sfx::punch);
        // turn to face the victim
        if let Some(mut m) = sim.mobj(ent) {
            m.angle = point_to_angle2(m.x, m.y, target.x, target.y);
            sim.put_mobj(ent, m);
        }
    }
}

fn saw(sim: &mut Sim, level: &Level, slot: usize) {
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };

    let damage = 2 * (sim.game_rng.next() % 10 + 1);
    let angle = m
        .angle
        .wrapping_add((sim.game_rng.sub_random() as u32) << 18);

    // range + 1 so the puff never lands inside the blade flash
    let hit = melee_attack(sim, level, ent, angle, MELEERANGE + 1, damage);

    let Some(target) = hit.and_then(|t| sim.mobj(t)) else {
        weapon_sfx(sim, slot, Sfx::sawful);
        return;
    };
    weapon_sfx(sim, slot, Sfx::sawhit);

    /* grind toward the victim */
    let Some(mut m) = sim.mobj(ent) else { return };
    let target_angle = point_to_angle2(m.x, m.y, target.x, target.y);
    let delta = target_angle.wrapping_sub(m.angle);
    if delta > crate::tables::ANG180 {
        if (delta as i32) < -((crate::tables::ANG90 / 20) as i32) {
            m.angle = target_angle.wrapping_add(crate::tables::ANG90 / 21);
        } else {
            m.angle = m.angle.wrapping_sub(crate::tables::ANG90 / 20);
        }
    } else if delta > crate::tables::ANG90 / 20 {
        m.angle = target_angle.wrapping_sub(crate::tables::ANG90 / 21);
    } else {
        m.angle = m.angle.wrapping_add(crate::tables::ANG90 / 20);
    }
    m.flags |= crate::defs::MobjFlags::JUSTATTACKED;
    sim.put_mobj(ent, m);
}

fn decrease_ready_ammo(sim: &mut Sim, slot: usize, amount: i32) {
    let ammo = WEAPON_INFO[sim.players[slot].readyweapon as usize].ammo;
    sim.players[slot].decrease_ammo(ammo as usize, amount);
}

fn fire_pistol(sim: &mut Sim, level: &Level, slot: usize) {
    weapon_sfx(sim, slot, Sfx::pistol);
    set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK2);
    decrease_ready_ammo(sim, slot, 1);
    set_psprite(sim, level, slot, PsprId::Flash, StateId::PISTOLFLASH);

    let slope = bullet_slope(sim, level, slot);
    let accurate = sim.players[slot].refire == 0;
    gun_shot(sim, level, slot, accurate, slope);
}

fn fire_shotgun(sim: &mut Sim, level: &Level, slot: usize) {
    weapon_sfx(sim, slot, Sfx::shotgn);
    set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK2);
    decrease_ready_ammo(sim, slot, 1);
    set_psprite(sim, level, slot, PsprId::Flash, StateId::SGUNFLASH1);

    let slope = bullet_slope(sim, level, slot);
    for _ in 0..7 {
        gun_shot(sim, level, slot, false, slope);
    }
}

fn fire_super_shotgun(sim: &mut Sim, level: &Level, slot: usize) {
    weapon_sfx(sim, slot, Sfx::dshtgn);
    set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK2);
    decrease_ready_ammo(sim, slot, 2);
    set_psprite(sim, level, slot, PsprId::Flash, StateId::DSGUNFLASH1);

    let slope = bullet_slope(sim, level, slot);
    let Some(ent) = sim.players[slot].mo else { return };
    for _ in 0..20 {
        let damage = 5 * (sim.game_rng.next() % 3 + 1);
        let Some(m) = sim.mobj(ent) else { return };
        let angle = m
            .angle
            .wrapping_add((sim.game_rng.sub_random() as u32) << 19);
        let pellet_slope = slope + (sim.game_rng.sub_random() << 5);
        line_attack(sim, level, ent, angle, MISSILERANGE, pellet_slope, damage);
    }
}

fn fire_chaingun(sim: &mut Sim, level: &Level, slot: usize) {
    weapon_sfx(sim, slot, Sfx::chgun);
    let ammo = WEAPON_INFO[sim.players[slot].readyweapon as usize].ammo;
    if ammo != AmmoType::NoAmmo && sim.players[slot].ammo(ammo) == 0 {
        return;
    }
    set_player_mobj_state(sim, level, slot, StateId::PLAY_ATK2);
    decrease_ready_ammo(sim, slot, 1);

    // pick the flash frame matching the barrel frame
    let flash = if sim.players[slot].psprites[PsprId::Weapon as usize].state
        == Some(StateId::CHAIN1)
    {
        StateId::CHAINFLASH1
    } else {
        StateId::CHAINFLASH2
    };
    set_psprite(sim, level, slot, PsprId::Flash, flash);

    let slope = bullet_slope(sim, level, slot);
    let accurate = sim.players[slot].refire == 0;
    gun_shot(sim, level, slot, accurate, slope);
}

fn fire_missile(sim: &mut Sim, level: &Level, slot: usize) {
    decrease_ready_ammo(sim, slot, 1);
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };
    let slope = bullet_slope(sim, level, slot);
    spawn_player_missile(sim, level, ent, MobjType::ROCKET, m.angle, slope);
}

fn fire_plasma(sim: &mut Sim, level: &Level, slot: usize) {
    decrease_ready_ammo(sim, slot, 1);
    let flash = if sim.game_rng.next() & 1 == 0 {
        StateId::PLASMAFLASH1
    } else {
        StateId::PLASMAFLASH2
    };
    set_psprite(sim, level, slot, PsprId::Flash, flash);

    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };
    let slope = bullet_slope(sim, level, slot);
    spawn_player_missile(sim, level, ent, MobjType::PLASMA, m.angle, slope);
}

fn fire_bfg(sim: &mut Sim, level: &Level, slot: usize) {
    decrease_ready_ammo(sim, slot, BFG_CELLS_PER_SHOT);
    let Some(ent) = sim.players[slot].mo else { return };
    let Some(m) = sim.mobj(ent) else { return };
    let slope = bullet_slope(sim, level, slot);
    spawn_player_missile(sim, level, ent, MobjType::BFGSHOT, m.angle, slope);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::setup::fixture::load_square;
    use crate::sim::player::TicCmd;
    use crate::sim::tic::{Sim, SimOptions};

    fn sim_with_player() -> (crate::level::Level, Sim) {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        (level, sim)
    }

    #[test]
    fn weapon_raises_to_ready() {
        let (level, mut sim) = sim_with_player();
        // sy starts at the bottom and rises 6 units per tic
        for _ in 0..20 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        let psp = sim.players[0].psprites[PsprId::Weapon as usize];
        assert_eq!(psp.sy, WEAPONTOP);
        assert_eq!(psp.state, Some(StateId::PISTOL));
    }

    #[test]
    fn firing_pistol_spends_a_bullet() {
        let (level, mut sim) = sim_with_player();
        for _ in 0..20 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        let before = sim.players[0].ammo(AmmoType::Clip);
        let mut cmd = TicCmd::default();
        cmd.buttons = BT_ATTACK;
        for _ in 0..10 {
            sim.ticker(&level, &[cmd]);
        }
        assert!(sim.players[0].ammo(AmmoType::Clip) < before);
    }

    #[test]
    fn empty_clip_falls_back_to_fist() {
        let (level, mut sim) = sim_with_player();
        for _ in 0..20 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        *sim.players[0].ammo_mut(AmmoType::Clip) = 0;
        let mut cmd = TicCmd::default();
        cmd.buttons = BT_ATTACK;
        sim.ticker(&level, &[cmd]);
        assert_eq!(sim.players[0].pendingweapon, Some(WeaponType::Fist));
    }

    #[test]
    fn ssg_needs_two_shells() {
        let (level, mut sim) = sim_with_player();
        sim.opts.have_ssg = true;
        {
            let p = &mut sim.players[0];
            p.weaponowned[WeaponType::SuperShotgun as usize] = true;
            p.readyweapon = WeaponType::SuperShotgun;
            *p.ammo_mut(AmmoType::Shell) = 1;
        }
        assert!(!check_ammo(&mut sim, &level, 0));
        *sim.players[0].ammo_mut(AmmoType::Shell) = 2;
        assert!(check_ammo(&mut sim, &level, 0));
    }
}
