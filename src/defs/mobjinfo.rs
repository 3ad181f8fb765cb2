//! Static per-type actor descriptors.
//!
//! The table is the data half of the actor system: spawn states, sounds,
//! physical extents and behaviour flags for every thing the engine can put
//! on a map.  Editor ("doomed") numbers are looked up through the hash in
//! `sim::mobj`.

use crate::defs::flags::MobjFlags;
use crate::defs::sound::Sfx;
use crate::defs::states::StateId;
use crate::fixed::{FRACUNIT, Fixed};

/// Actor type ids, indexing [`MOBJINFO`].
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum MobjType {
    PLAYER,
    POSSESSED,
    TROOP,
    SKULL,
    BARREL,
    TFOG,
    IFOG,
    PUFF,
    BLOOD,
    ROCKET,
    PLASMA,
    BFGSHOT,
    EXTRABFG,
    STIMPACK,
    MEDIKIT,
    CLIP,
    SOULSPHERE,
    INVULN,
    INVIS,
    MEGA,
}

pub const NUM_MOBJ_TYPES: usize = 20;

/// Frozen descriptor for one actor type.
#[derive(Clone, Copy, Debug)]
pub struct MobjInfo {
    /// Editor number, or -1 when not placeable from a map.
    pub doomednum: i32,
    pub spawnstate: StateId,
    pub spawnhealth: i32,
    pub seestate: StateId,
    pub seesound: Sfx,
    pub reactiontime: i32,
    pub attacksound: Sfx,
    pub painstate: StateId,
    pub painchance: i32,
    pub painsound: Sfx,
    pub meleestate: StateId,
    pub missilestate: StateId,
    pub deathstate: StateId,
    pub xdeathstate: StateId,
    pub deathsound: Sfx,
    /// Map units per move for walkers, 16.16 for missiles.
    pub speed: i32,
    pub radius: Fixed,
    pub height: Fixed,
    pub mass: i32,
    pub damage: i32,
    pub activesound: Sfx,
    pub flags: MobjFlags,
}

impl MobjType {
    #[inline]
    pub fn info(self) -> &'static MobjInfo {
        &MOBJINFO[self as usize]
    }
}

const fn mf(bits: u32) -> MobjFlags {
    MobjFlags::from_bits_truncate(bits)
}

const BASE: MobjInfo = MobjInfo {
    doomednum: -1,
    spawnstate: StateId::NULL,
    spawnhealth: 1000,
    seestate: StateId::NULL,
    seesound: Sfx::None,
    reactiontime: 8,
    attacksound: Sfx::None,
    painstate: StateId::NULL,
    painchance: 0,
    painsound: Sfx::None,
    meleestate: StateId::NULL,
    missilestate: StateId::NULL,
    deathstate: StateId::NULL,
    xdeathstate: StateId::NULL,
    deathsound: Sfx::None,
    speed: 0,
    radius: 20 * FRACUNIT,
    height: 16 * FRACUNIT,
    mass: 100,
    damage: 0,
    activesound: Sfx::None,
    flags: MobjFlags::empty(),
};

/// The descriptor table, indexed by `MobjType as usize` (same order).
pub static MOBJINFO: [MobjInfo; NUM_MOBJ_TYPES] = [
    // PLAYER
    MobjInfo {
        spawnstate: StateId::PLAY,
        spawnhealth: 100,
        seestate: StateId::PLAY_RUN1,
        painstate: StateId::PLAY_PAIN,
        painchance: 255,
        painsound: Sfx::plpain,
        missilestate: StateId::PLAY_ATK1,
        deathstate: StateId::PLAY_DIE1,
        xdeathstate: StateId::PLAY_XDIE1,
        deathsound: Sfx::pldeth,
        radius: 16 * FRACUNIT,
        height: 56 * FRACUNIT,
        flags: mf(MobjFlags::SOLID.bits()
            | MobjFlags::SHOOTABLE.bits()
            | MobjFlags::DROPOFF.bits()
            | MobjFlags::PICKUP.bits()
            | MobjFlags::NOTDMATCH.bits()),
        ..BASE
    },
    // POSSESSED
    MobjInfo {
        doomednum: 3004,
        spawnstate: StateId::POSS_STND,
        spawnhealth: 20,
        seestate: StateId::POSS_RUN1,
        seesound: Sfx::posit1,
        attacksound: Sfx::pistol,
        painstate: StateId::POSS_PAIN,
        painchance: 200,
        painsound: Sfx::popain,
        deathstate: StateId::POSS_DIE1,
        xdeathstate: StateId::POSS_XDIE1,
        deathsound: Sfx::podth1,
        speed: 8,
        height: 56 * FRACUNIT,
        activesound: Sfx::posact,
        flags: mf(MobjFlags::SOLID.bits()
            | MobjFlags::SHOOTABLE.bits()
            | MobjFlags::COUNTKILL.bits()),
        ..BASE
    },
    // TROOP
    MobjInfo {
        doomednum: 3001,
        spawnstate: StateId::TROO_STND,
        spawnhealth: 60,
        seestate: StateId::TROO_RUN1,
        seesound: Sfx::bgsit1,
        painstate: StateId::TROO_PAIN,
        painchance: 200,
        painsound: Sfx::popain,
        deathstate: StateId::TROO_DIE1,
        xdeathstate: StateId::TROO_XDIE1,
        deathsound: Sfx::bgdth1,
        speed: 8,
        height: 56 * FRACUNIT,
        activesound: Sfx::bgact,
        flags: mf(MobjFlags::SOLID.bits()
            | MobjFlags::SHOOTABLE.bits()
            | MobjFlags::COUNTKILL.bits()),
        ..BASE
    },
    // SKULL
    MobjInfo {
        doomednum: 3006,
        spawnstate: StateId::SKULL_STND,
        spawnhealth: 100,
        seestate: StateId::SKULL_RUN1,
        attacksound: Sfx::sklatk,
        painstate: StateId::SKULL_PAIN,
        painchance: 256,
        painsound: Sfx::dmpain,
        missilestate: StateId::SKULL_ATK1,
        deathstate: StateId::SKULL_DIE1,
        deathsound: Sfx::firxpl,
        speed: 8,
        radius: 16 * FRACUNIT,
        height: 56 * FRACUNIT,
        mass: 50,
        damage: 3,
        activesound: Sfx::dmact,
        flags: mf(MobjFlags::SOLID.bits()
            | MobjFlags::SHOOTABLE.bits()
            | MobjFlags::FLOAT.bits()
            | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // BARREL
    MobjInfo {
        doomednum: 2035,
        spawnstate: StateId::BAR1,
        spawnhealth: 20,
        deathstate: StateId::BEXP,
        deathsound: Sfx::barexp,
        radius: 10 * FRACUNIT,
        height: 42 * FRACUNIT,
        flags: mf(MobjFlags::SOLID.bits()
            | MobjFlags::SHOOTABLE.bits()
            | MobjFlags::NOBLOOD.bits()),
        ..BASE
    },
    // TFOG
    MobjInfo {
        spawnstate: StateId::TFOG,
        flags: mf(MobjFlags::NOBLOCKMAP.bits() | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // IFOG
    MobjInfo {
        spawnstate: StateId::IFOG,
        flags: mf(MobjFlags::NOBLOCKMAP.bits() | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // PUFF
    MobjInfo {
        spawnstate: StateId::PUFF1,
        flags: mf(MobjFlags::NOBLOCKMAP.bits() | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // BLOOD
    MobjInfo {
        spawnstate: StateId::BLOOD1,
        flags: mf(MobjFlags::NOBLOCKMAP.bits() | MobjFlags::FLIPPABLE.bits()),
        ..BASE
    },
    // ROCKET
    MobjInfo {
        spawnstate: StateId::ROCKET,
        seesound: Sfx::rlaunc,
        deathstate: StateId::EXPLODE1,
        deathsound: Sfx::barexp,
        speed: 20 * FRACUNIT,
        radius: 11 * FRACUNIT,
        height: 8 * FRACUNIT,
        damage: 20,
        flags: mf(MobjFlags::NOBLOCKMAP.bits()
            | MobjFlags::MISSILE.bits()
            | MobjFlags::DROPOFF.bits()
            | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // PLASMA
    MobjInfo {
        spawnstate: StateId::PLASBALL,
        seesound: Sfx::plasma,
        deathstate: StateId::PLASEXP,
        deathsound: Sfx::firxpl,
        speed: 25 * FRACUNIT,
        radius: 13 * FRACUNIT,
        height: 8 * FRACUNIT,
        damage: 5,
        flags: mf(MobjFlags::NOBLOCKMAP.bits()
            | MobjFlags::MISSILE.bits()
            | MobjFlags::DROPOFF.bits()
            | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // BFGSHOT
    MobjInfo {
        spawnstate: StateId::BFGSHOT,
        deathstate: StateId::BFGLAND,
        deathsound: Sfx::rxplod,
        speed: 25 * FRACUNIT,
        radius: 13 * FRACUNIT,
        height: 8 * FRACUNIT,
        damage: 100,
        flags: mf(MobjFlags::NOBLOCKMAP.bits()
            | MobjFlags::MISSILE.bits()
            | MobjFlags::DROPOFF.bits()
            | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // EXTRABFG
    MobjInfo {
        spawnstate: StateId::BFGEXP,
        flags: mf(MobjFlags::NOBLOCKMAP.bits() | MobjFlags::NOGRAVITY.bits()),
        ..BASE
    },
    // STIMPACK
    MobjInfo {
        doomednum: 2011,
        spawnstate: StateId::STIM,
        flags: mf(MobjFlags::SPECIAL.bits()),
        ..BASE
    },
    // MEDIKIT
    MobjInfo {
        doomednum: 2012,
        spawnstate: StateId::MEDI,
        flags: mf(MobjFlags::SPECIAL.bits()),
        ..BASE
    },
    // CLIP
    MobjInfo {
        doomednum: 2007,
        spawnstate: StateId::CLIP,
        flags: mf(MobjFlags::SPECIAL.bits()),
        ..BASE
    },
    // SOULSPHERE
    MobjInfo {
        doomednum: 2013,
        spawnstate: StateId::SOUL,
        flags: mf(MobjFlags::SPECIAL.bits() | MobjFlags::COUNTITEM.bits()),
        ..BASE
    },
    // INVULN
    MobjInfo {
        doomednum: 2022,
        spawnstate: StateId::PINV,
        flags: mf(MobjFlags::SPECIAL.bits() | MobjFlags::COUNTITEM.bits()),
        ..BASE
    },
    // INVIS
    MobjInfo {
        doomednum: 2024,
        spawnstate: StateId::PINS,
        flags: mf(MobjFlags::SPECIAL.bits() | MobjFlags::COUNTITEM.bits()),
        ..BASE
    },
    // MEGA
    MobjInfo {
        doomednum: 83,
        spawnstate: StateId::MEGA,
        flags: mf(MobjFlags::SPECIAL.bits() | MobjFlags::COUNTITEM.bits()),
        ..BASE
    },
];

/// Types whose vertical position rides the floating-powerup bob.
pub const FLOAT_BOB_TYPES: [MobjType; 4] = [
    MobjType::MEGA,
    MobjType::SOULSPHERE,
    MobjType::INVULN,
    MobjType::INVIS,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_indexes_table() {
        assert_eq!(MobjType::PLAYER.info().spawnhealth, 100);
        assert_eq!(MobjType::BARREL.info().doomednum, 2035);
        assert_eq!(MobjType::MEGA.info().doomednum, 83);
    }

    #[test]
    fn missiles_carry_the_missile_flag() {
        for t in [MobjType::ROCKET, MobjType::PLASMA, MobjType::BFGSHOT] {
            assert!(t.info().flags.contains(MobjFlags::MISSILE));
            assert!(t.info().speed >= 20 * FRACUNIT);
        }
    }

    #[test]
    fn doomednums_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for info in MOBJINFO.iter() {
            if info.doomednum != -1 {
                assert!(seen.insert(info.doomednum), "dup {}", info.doomednum);
            }
        }
    }
}
