//! Player state: view bobbing, movement thrust, powers, death camera.

use crate::defs::flags::MobjFlags;
use crate::defs::states::StateId;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::game::GameMode;
use crate::level::Level;
use crate::sim::mobj::{MobjActions, pw, set_mobj_state};
use crate::sim::pspr::{self, AmmoType, NUM_AMMO, Psprite, WeaponType};
use crate::sim::tic::{Sim, SoundOrigin};
use crate::sim::VIEWHEIGHT;
use crate::tables::{ANG5, ANG90, ANG180, Angle, FINEANGLES, FINEMASK, fine_cosine, fine_sine,
    point_to_angle2, to_fine};
use hecs::Entity;

/* ─────────────────────────── input commands ──────────────────────────── */

pub const BT_ATTACK: u8 = 1;
pub const BT_USE: u8 = 2;
pub const BT_CHANGE: u8 = 4;
pub const BT_WEAPONMASK: u8 = 8 + 16 + 32;
pub const BT_WEAPONSHIFT: u8 = 3;
pub const BT_SPECIAL: u8 = 128;

/// One tick of player input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TicCmd {
    pub forwardmove: i8,
    pub sidemove: i8,
    pub angleturn: i16,
    pub buttons: u8,
    pub lookfly: u8,
    pub lookdir: i16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Alive,
    Dead,
    Reborn,
}

/// What pressing use after death does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeathUseAction {
    /// Reload the level from scratch.
    #[default]
    Reload,
    /// Ask the host to load the last save.
    LoadSave,
    Nothing,
}

/// 16 pixels of bob.
const MAXBOB: Fixed = 0x100000;

/* ─────────────────────────── the player ──────────────────────────────── */

#[derive(Clone, Debug)]
pub struct Player {
    pub slot: u8,
    pub in_game: bool,
    pub mo: Option<Entity>,
    pub playerstate: PlayerState,
    pub cmd: TicCmd,

    pub viewz: Fixed,
    pub oldviewz: Fixed,
    pub viewheight: Fixed,
    pub deltaviewheight: Fixed,
    pub bob: Fixed,
    /// Bob after the accessibility scale; what the renderer reads.
    pub r_bob: Fixed,
    /// Weapon-sprite squat after a hard landing.
    pub psp_dy: Fixed,
    pub psp_dy_max: Fixed,

    pub health: i32,
    pub armor: i32,

    /// Backing store for ammo and maxammo.  One contiguous array keeps the
    /// classic out-of-range write-through (ammo index >= 4 lands in
    /// maxammo), which mods depend on.  Use the accessors.
    ammo_bank: [i32; NUM_AMMO * 2],

    pub weaponowned: [bool; pspr::NUM_WEAPONS],
    pub readyweapon: WeaponType,
    pub pendingweapon: Option<WeaponType>,
    pub refire: i32,
    pub attackdown: bool,
    pub usedown: bool,

    pub powers: [i32; pw::NUM_POWERS],
    pub cards: [bool; 6],
    pub backpack: bool,

    pub psprites: [Psprite; 2],

    pub damagecount: i32,
    pub bonuscount: i32,
    pub attacker: Option<Entity>,
    pub extralight: i32,
    pub fixedcolormap: i32,

    pub killcount: u32,
    pub itemcount: u32,
    pub secretcount: u32,

    /// Turn accumulated from raw input between tics, consumed by the
    /// renderer for smooth uncapped turning.
    pub localview_ticangle: Angle,
    pub localview_oldticangle: Angle,

    pub lookdir: i32,
    pub oldlookdir: i32,
    pub centering: bool,

    pub on_death_action: DeathUseAction,
    /// Host-visible request raised by the death action.
    pub pending_death_action: Option<DeathUseAction>,

    /// Weapon-bob accessibility scale, 0..=20 (0 = off, 20 = raw).
    pub a11y_weapon_bob: i32,
    pub a11y_move_bob: i32,
}

impl Player {
    pub fn new(slot: u8) -> Player {
        let mut p = Player {
            slot,
            in_game: false,
            mo: None,
            playerstate: PlayerState::Reborn,
            cmd: TicCmd::default(),
            viewz: 0,
            oldviewz: 0,
            viewheight: VIEWHEIGHT,
            deltaviewheight: 0,
            bob: 0,
            r_bob: 0,
            psp_dy: 0,
            psp_dy_max: 0,
            health: 100,
            armor: 0,
            ammo_bank: [0; NUM_AMMO * 2],
            weaponowned: [false; pspr::NUM_WEAPONS],
            readyweapon: WeaponType::Pistol,
            pendingweapon: Some(WeaponType::Pistol),
            refire: 0,
            attackdown: false,
            usedown: false,
            powers: [0; pw::NUM_POWERS],
            cards: [false; 6],
            backpack: false,
            psprites: [Psprite::default(), Psprite::default()],
            damagecount: 0,
            bonuscount: 0,
            attacker: None,
            extralight: 0,
            fixedcolormap: 0,
            killcount: 0,
            itemcount: 0,
            secretcount: 0,
            localview_ticangle: 0,
            localview_oldticangle: 0,
            lookdir: 0,
            oldlookdir: 0,
            centering: false,
            on_death_action: DeathUseAction::default(),
            pending_death_action: None,
            a11y_weapon_bob: 20,
            a11y_move_bob: 20,
        };
        p.reborn_defaults();
        p
    }

    /// Baseline loadout after (re)birth.
    pub fn reborn_defaults(&mut self) {
        self.health = 100;
        self.readyweapon = WeaponType::Pistol;
        self.pendingweapon = Some(WeaponType::Pistol);
        self.weaponowned = [false; pspr::NUM_WEAPONS];
        self.weaponowned[WeaponType::Fist as usize] = true;
        self.weaponowned[WeaponType::Pistol as usize] = true;
        self.ammo_bank = [0; NUM_AMMO * 2];
        *self.max_ammo_mut(AmmoType::Clip) = 200;
        *self.max_ammo_mut(AmmoType::Shell) = 50;
        *self.max_ammo_mut(AmmoType::Cell) = 300;
        *self.max_ammo_mut(AmmoType::Missile) = 50;
        *self.ammo_mut(AmmoType::Clip) = 50;
        self.powers = [0; pw::NUM_POWERS];
        self.refire = 0;
    }

    /* ------------------------- ammo accessors -------------------------- */

    #[inline]
    pub fn ammo(&self, kind: AmmoType) -> i32 {
        self.ammo_bank[kind as usize]
    }

    #[inline]
    pub fn max_ammo(&self, kind: AmmoType) -> i32 {
        self.ammo_bank[NUM_AMMO + kind as usize]
    }

    #[inline]
    pub fn ammo_mut(&mut self, kind: AmmoType) -> &mut i32 {
        &mut self.ammo_bank[kind as usize]
    }

    #[inline]
    pub fn max_ammo_mut(&mut self, kind: AmmoType) -> &mut i32 {
        &mut self.ammo_bank[NUM_AMMO + kind as usize]
    }

    /// The engine never bounds-checked this subtraction; an index past the
    /// ammo slots deliberately lands in the maxammo half of the bank.
    pub fn decrease_ammo(&mut self, ammonum: usize, amount: i32) {
        if ammonum < NUM_AMMO {
            self.ammo_bank[ammonum] = (self.ammo_bank[ammonum] - amount).max(0);
        } else {
            self.ammo_bank[ammonum.min(self.ammo_bank.len() - 1)] -= amount;
        }
    }

    /// Heal up to the classic 100 cap; false when already full.
    pub fn give_health(&mut self, amount: i32) -> bool {
        if self.health >= 100 {
            return false;
        }
        self.health = (self.health + amount).min(100);
        true
    }

    /// Add ammo; false when the pocket was full.
    pub fn give_ammo(&mut self, kind: AmmoType, amount: i32) -> bool {
        let max = self.max_ammo(kind);
        let slot = self.ammo_mut(kind);
        if *slot >= max {
            return false;
        }
        *slot = (*slot + amount).min(max);
        true
    }
}

/* ─────────────────────────── think pipeline ──────────────────────────── */

/// Per-tick player pipeline.
pub(crate) fn player_think(sim: &mut Sim, level: &Level, slot: usize) {
    let Some(ent) = sim.players[slot].mo else {
        return;
    };
    let Some(mut m) = sim.mobj(ent) else { return };

    /* interpolation snapshot */
    m.interp = 1;
    m.oldx = m.x;
    m.oldy = m.y;
    m.oldz = m.z;
    m.oldangle = m.angle;
    {
        let p = &mut sim.players[slot];
        p.oldviewz = p.viewz;
        p.oldlookdir = p.lookdir;
        if slot == sim.opts.console_player {
            p.localview_oldticangle = p.localview_ticangle;
        }
    }

    /* chainsaw lunge overrides steering for one tic */
    if m.flags.contains(MobjFlags::JUSTATTACKED) {
        let p = &mut sim.players[slot];
        p.cmd.angleturn = 0;
        p.cmd.forwardmove = (0xC800 / 512) as i8;
        p.cmd.sidemove = 0;
        m.flags.remove(MobjFlags::JUSTATTACKED);
    }
    sim.put_mobj(ent, m);

    /* view centering (after teleports, death, on demand) */
    {
        let p = &mut sim.players[slot];
        if p.centering {
            if p.lookdir > 0 {
                p.lookdir -= 8;
            } else if p.lookdir < 0 {
                p.lookdir += 8;
            }
            if p.lookdir.abs() < 8 {
                p.lookdir = 0;
                p.centering = false;
            }
        }
    }

    if sim.players[slot].playerstate == PlayerState::Dead {
        death_think(sim, level, slot);
        return;
    }

    /* movement, gated by post-teleport reaction time */
    let mut m = sim.mobj(ent).expect("player body");
    if m.reactiontime > 0 {
        m.reactiontime -= 1;
        sim.put_mobj(ent, m);
    } else {
        sim.put_mobj(ent, m);
        move_player(sim, slot);
        m = sim.mobj(ent).expect("player body");
    }

    calc_height(sim, slot);

    /* sector specials (damage floors etc.) live outside this core, but the
    special id is still observed for the exit/secret bookkeeping hook */
    let sector = level.subsectors[m.subsector as usize].sector;
    let _special = level.sectors[sector as usize].special;

    /* weapon change request */
    let cmd = sim.players[slot].cmd;
    if cmd.buttons & BT_SPECIAL != 0 {
        sim.players[slot].cmd.buttons = 0;
    } else {
        if cmd.buttons & BT_CHANGE != 0 {
            let mut new_weapon =
                WeaponType::from_index(((cmd.buttons & BT_WEAPONMASK) >> BT_WEAPONSHIFT) as usize);

            if new_weapon == WeaponType::Fist
                && sim.players[slot].weaponowned[WeaponType::Chainsaw as usize]
                && !(sim.players[slot].readyweapon == WeaponType::Chainsaw
                    && sim.players[slot].powers[pw::STRENGTH] != 0)
            {
                new_weapon = WeaponType::Chainsaw;
            }
            if sim.opts.have_ssg
                && new_weapon == WeaponType::Shotgun
                && sim.players[slot].weaponowned[WeaponType::SuperShotgun as usize]
                && sim.players[slot].readyweapon != WeaponType::SuperShotgun
            {
                new_weapon = WeaponType::SuperShotgun;
            }

            let p = &mut sim.players[slot];
            if p.weaponowned[new_weapon as usize] && new_weapon != p.readyweapon {
                // shareware never raises the cell weapons
                if (new_weapon != WeaponType::Plasma && new_weapon != WeaponType::Bfg)
                    || sim.opts.gamemode != GameMode::Shareware
                {
                    p.pendingweapon = Some(new_weapon);
                }
            }
        }

        /* use edge-detect; door/switch activation is outside the core */
        if cmd.buttons & BT_USE != 0 {
            if !sim.players[slot].usedown {
                sim.players[slot].usedown = true;
                sim.sfx(SoundOrigin::Mobj(ent), crate::defs::Sfx::noway);
            }
        } else {
            sim.players[slot].usedown = false;
        }
    }

    pspr::move_psprites(sim, level, slot);

    /* power timers */
    {
        let p = &mut sim.players[slot];
        if p.powers[pw::STRENGTH] != 0 {
            p.powers[pw::STRENGTH] += 1; // counts up to fade the berserk tint
        }
        for timer in [pw::INVULNERABILITY, pw::INFRARED, pw::IRONFEET] {
            if p.powers[timer] > 0 {
                p.powers[timer] -= 1;
            }
        }
        let shadow_off = p.powers[pw::INVISIBILITY] == 1;
        if p.powers[pw::INVISIBILITY] > 0 {
            p.powers[pw::INVISIBILITY] -= 1;
        }
        if p.damagecount > 0 {
            p.damagecount -= 1;
        }
        if p.bonuscount > 0 {
            p.bonuscount -= 1;
        }

        /* colormap for invulnerability / light amp */
        p.fixedcolormap = if p.powers[pw::INVULNERABILITY] != 0 {
            if p.powers[pw::INVULNERABILITY] > 4 * 32 || p.powers[pw::INVULNERABILITY] & 8 != 0 {
                crate::render::textures::INVERSE_COLORMAP as i32
            } else if p.powers[pw::INFRARED] != 0 {
                1
            } else {
                0
            }
        } else if p.powers[pw::INFRARED] != 0 {
            if p.powers[pw::INFRARED] > 4 * 32 || p.powers[pw::INFRARED] & 8 != 0 {
                1
            } else {
                0
            }
        } else {
            0
        };

        if shadow_off {
            if let Some(mut m) = sim.world.get::<&mut crate::sim::Mobj>(ent).ok() {
                m.flags.remove(MobjFlags::SHADOW);
            }
        }
    }
}

/// Thrust the body along an angle.
fn thrust(sim: &mut Sim, ent: Entity, angle: Angle, mv: Fixed) {
    if let Some(mut m) = sim.mobj(ent) {
        let fine = to_fine(angle);
        m.momx += fixed_mul(mv, fine_cosine(fine));
        m.momy += fixed_mul(mv, fine_sine(fine));
        sim.put_mobj(ent, m);
    }
}

fn move_player(sim: &mut Sim, slot: usize) {
    let ent = sim.players[slot].mo.expect("player body");
    let cmd = sim.players[slot].cmd;

    let mut m = sim.mobj(ent).expect("player body");
    m.angle = m
        .angle
        .wrapping_add((cmd.angleturn as i32 as u32) << FRACBITS);
    let angle = m.angle;
    let onground = m.z <= m.floorz;
    sim.put_mobj(ent, m);

    if slot == sim.opts.console_player {
        let p = &mut sim.players[slot];
        p.localview_ticangle = p
            .localview_ticangle
            .wrapping_add((cmd.angleturn as i32 as u32) << FRACBITS);
    }

    if cmd.forwardmove != 0 && onground {
        thrust(sim, ent, angle, cmd.forwardmove as Fixed * 2048);
    }
    if cmd.sidemove != 0 && onground {
        thrust(sim, ent, angle.wrapping_sub(ANG90), cmd.sidemove as Fixed * 2048);
    }

    let mut m = sim.mobj(ent).expect("player body");
    if (cmd.forwardmove != 0 || cmd.sidemove != 0) && m.state == StateId::PLAY {
        let mut fx = MobjActions::new();
        set_mobj_state(ent, &mut m, StateId::PLAY_RUN1, &mut fx);
        sim.put_mobj(ent, m);
    } else {
        sim.put_mobj(ent, m);
    }

    /* free look */
    let mut look = (cmd.lookfly & 15) as i32;
    if look > 7 {
        look -= 16;
    }
    let p = &mut sim.players[slot];
    if look != 0 {
        if look == -8 {
            p.centering = true;
        } else {
            p.lookdir = (p.lookdir + 5 * look).clamp(-110, 90);
        }
    }
    p.lookdir = (p.lookdir + cmd.lookdir as i32).clamp(-110, 90);
}

/// Walking/running view-height adjustment.
fn calc_height(sim: &mut Sim, slot: usize) {
    let ent = sim.players[slot].mo.expect("player body");
    let m = sim.mobj(ent).expect("player body");
    let onground = m.z <= m.floorz;
    let realtime = sim.leveltime;

    let p = &mut sim.players[slot];

    /* bob strength follows momentum, for gun swing even when airborne */
    p.bob = fixed_mul(m.momx, m.momx) + fixed_mul(m.momy, m.momy);
    p.bob >>= 2;
    if p.bob > MAXBOB {
        p.bob = MAXBOB;
    }

    p.r_bob = match p.a11y_weapon_bob {
        0 => 0,
        bob @ 1..=19 => ((p.bob as i64 * bob as i64) / 20) as Fixed,
        _ => p.bob,
    };

    if !onground {
        p.viewz = m.z + p.viewheight;
        if p.viewz > m.ceilingz - 4 * FRACUNIT {
            p.viewz = m.ceilingz - 4 * FRACUNIT;
        }
        return;
    }

    let angle = (FINEANGLES / 20 * realtime as usize) & FINEMASK;
    let mut bob = fixed_mul(p.bob / 2, fine_sine(angle));
    bob = match p.a11y_move_bob {
        0 => 0,
        s @ 1..=19 => ((bob as i64 * s as i64) / 20) as Fixed,
        _ => bob,
    };

    if p.playerstate == PlayerState::Alive {
        p.viewheight += p.deltaviewheight;

        if p.viewheight > VIEWHEIGHT {
            p.viewheight = VIEWHEIGHT;
            p.deltaviewheight = 0;
        }
        if p.viewheight < VIEWHEIGHT / 2 {
            p.viewheight = VIEWHEIGHT / 2;
            if p.deltaviewheight <= 0 {
                p.deltaviewheight = 1;
            }
        }
        if p.deltaviewheight != 0 {
            p.deltaviewheight += FRACUNIT / 4;
            if p.deltaviewheight == 0 {
                p.deltaviewheight = 1;
            }
        }

        /* let the weapon sprite recover from a hard landing */
        if p.psp_dy_max != 0 {
            p.psp_dy -= FRACUNIT;
            if p.psp_dy < p.psp_dy_max {
                p.psp_dy = -p.psp_dy;
            }
            if p.psp_dy == 0 {
                p.psp_dy_max = 0;
            }
        }
    }

    p.viewz = m.z + p.viewheight + bob;
    if p.viewz > m.ceilingz - 4 * FRACUNIT {
        p.viewz = m.ceilingz - 4 * FRACUNIT;
    }
}

/// Fall to the floor, stare at the killer, wait for use.
fn death_think(sim: &mut Sim, level: &Level, slot: usize) {
    pspr::move_psprites(sim, level, slot);

    let ent = sim.players[slot].mo.expect("player body");
    let m = sim.mobj(ent).expect("player body");

    {
        let p = &mut sim.players[slot];
        if p.viewheight > 6 * FRACUNIT {
            p.viewheight -= FRACUNIT;
        }
        if p.viewheight < 6 * FRACUNIT {
            p.viewheight = 6 * FRACUNIT;
        }
        p.deltaviewheight = 0;
    }
    calc_height(sim, slot);

    let attacker = sim.players[slot].attacker;
    if let Some(att) = attacker.filter(|&a| a != ent).and_then(|a| sim.mobj(a)) {
        let angle = point_to_angle2(m.x, m.y, att.x, att.y);
        let delta = angle.wrapping_sub(m.angle);

        let mut m = m;
        if delta < ANG5 || delta > ANG5.wrapping_neg() {
            // facing the killer: fade the damage flash
            m.angle = angle;
            let p = &mut sim.players[slot];
            if p.damagecount > 0 {
                p.damagecount -= 1;
            }
        } else if delta < ANG180 {
            m.angle = m.angle.wrapping_add(ANG5);
        } else {
            m.angle = m.angle.wrapping_sub(ANG5);
        }
        sim.put_mobj(ent, m);
    } else if sim.players[slot].damagecount > 0 {
        sim.players[slot].damagecount -= 1;
    }

    if sim.players[slot].cmd.buttons & BT_USE != 0 {
        let p = &mut sim.players[slot];
        if sim.opts.netgame {
            p.playerstate = PlayerState::Reborn;
        } else {
            match p.on_death_action {
                DeathUseAction::Nothing => {}
                action => p.pending_death_action = Some(action),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::setup::fixture::load_square;
    use crate::sim::tic::{Sim, SimOptions};

    fn sim_with_player() -> (crate::level::Level, Sim) {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        (level, sim)
    }

    #[test]
    fn forward_input_builds_momentum() {
        let (level, mut sim) = sim_with_player();
        let mut cmd = TicCmd::default();
        cmd.forwardmove = 25;
        sim.ticker(&level, &[cmd]);
        let m = sim.players[0].mo.and_then(|e| sim.mobj(e)).unwrap();
        assert!(m.momx > 0, "east-facing player should accelerate east");
        assert_eq!(m.momy, 0);
    }

    #[test]
    fn idle_player_decays_to_rest() {
        let (level, mut sim) = sim_with_player();
        let mut cmd = TicCmd::default();
        cmd.forwardmove = 25;
        for _ in 0..10 {
            sim.ticker(&level, &[cmd]);
        }
        for _ in 0..120 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        let m = sim.players[0].mo.and_then(|e| sim.mobj(e)).unwrap();
        assert_eq!(m.momx, 0);
        assert_eq!(m.momy, 0);
        assert_eq!(m.state, StateId::PLAY);
    }

    #[test]
    fn bob_caps_at_maxbob() {
        let (level, mut sim) = sim_with_player();
        let mut cmd = TicCmd::default();
        cmd.forwardmove = 50;
        for _ in 0..35 {
            sim.ticker(&level, &[cmd]);
        }
        assert!(sim.players[0].bob <= MAXBOB);
        assert!(sim.players[0].bob > 0);
    }

    #[test]
    fn ammo_overflow_lands_in_maxammo() {
        let mut p = Player::new(0);
        let max_before = p.max_ammo(AmmoType::Clip);
        // index 4 = first maxammo slot, the classic write-through
        p.decrease_ammo(NUM_AMMO, 10);
        assert_eq!(p.max_ammo(AmmoType::Clip), max_before - 10);
        // in-range decreases clamp at zero
        p.decrease_ammo(AmmoType::Clip as usize, 9999);
        assert_eq!(p.ammo(AmmoType::Clip), 0);
    }

    #[test]
    fn turning_accumulates_localview() {
        let (level, mut sim) = sim_with_player();
        let mut cmd = TicCmd::default();
        cmd.angleturn = 512;
        let before = sim.players[0].localview_ticangle;
        sim.ticker(&level, &[cmd]);
        assert_ne!(sim.players[0].localview_ticangle, before);
    }
}
