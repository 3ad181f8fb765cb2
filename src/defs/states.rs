//! Sprite identifiers and the frozen animation state table.
//!
//! Every animated object in the game - actors, projectiles, pickups and the
//! player's weapon overlay - walks this one table.  `tics == -1` parks a
//! state forever, `next == NULL` deletes the owner on the next advance.

use crate::defs::action::Action;

/// Full-bright bit in the frame word: the frame ignores sector light.
pub const FF_FULLBRIGHT: u16 = 0x8000;
pub const FF_FRAMEMASK: u16 = 0x7FFF;

macro_rules! sprites {
    ($($id:ident),+ $(,)?) => {
        /// Four-letter sprite families, in lump-name order.
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum SpriteId {
            $($id),+
        }

        pub const SPRITE_NAMES: &[&str] = &[$(stringify!($id)),+];

        impl SpriteId {
            /// The four-character lump-name prefix.
            #[inline]
            pub fn name(self) -> &'static str {
                SPRITE_NAMES[self as usize]
            }
        }

        pub const NUM_SPRITES: usize = SPRITE_NAMES.len();
    };
}

sprites! {
    TROO, SHTG, PUNG, PISG, PISF, SHTF, SHT2, CHGG, CHGF, MISG,
    MISF, SAWG, PLSG, PLSF, BFGG, BFGF, BLUD, PUFF, TFOG, IFOG,
    MISL, PLSS, PLSE, BFS1, BFE1, BFE2, PLAY, POSS, SKUL, BAR1,
    BEXP, MEDI, STIM, CLIP, SOUL, PINV, PINS, MEGA,
}

/// One row of the state table.
#[derive(Clone, Copy, Debug)]
pub struct StateInfo {
    pub sprite: SpriteId,
    /// Frame letter (A = 0) plus optionally [`FF_FULLBRIGHT`].
    pub frame: u16,
    /// Duration in tics; -1 = stay forever.
    pub tics: i32,
    pub action: Action,
    pub next: StateId,
    /// Psprite coordinate override (both zero = no override).
    pub misc1: i32,
    pub misc2: i32,
}

macro_rules! states {
    ($( $name:ident : $spr:ident, $frame:expr, $tics:expr, $action:ident, $next:ident ; )+) => {
        /// State identifiers.  `NULL` is the delete-me sentinel.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum StateId {
            $($name),+
        }

        /// The frozen state table, indexed by `StateId as usize`.
        pub const STATES: &[StateInfo] = &[
            $(StateInfo {
                sprite: SpriteId::$spr,
                frame: $frame,
                tics: $tics,
                action: Action::$action,
                next: StateId::$next,
                misc1: 0,
                misc2: 0,
            }),+
        ];

        pub const NUM_STATES: usize = STATES.len();
    };
}

impl StateId {
    #[inline]
    pub fn info(self) -> &'static StateInfo {
        &STATES[self as usize]
    }
}

const FB: u16 = FF_FULLBRIGHT;

states! {
    NULL:           TROO, 0, -1, None, NULL;
    LIGHTDONE:      SHTG, 4, 0, Light0, NULL;

    // fist
    PUNCH:          PUNG, 0, 1, WeaponReady, PUNCH;
    PUNCHDOWN:      PUNG, 0, 1, Lower, PUNCHDOWN;
    PUNCHUP:        PUNG, 0, 1, Raise, PUNCHUP;
    PUNCH1:         PUNG, 1, 4, None, PUNCH2;
    PUNCH2:         PUNG, 2, 4, Punch, PUNCH3;
    PUNCH3:         PUNG, 3, 5, None, PUNCH4;
    PUNCH4:         PUNG, 2, 4, None, PUNCH5;
    PUNCH5:         PUNG, 1, 5, ReFire, PUNCH;

    // pistol
    PISTOL:         PISG, 0, 1, WeaponReady, PISTOL;
    PISTOLDOWN:     PISG, 0, 1, Lower, PISTOLDOWN;
    PISTOLUP:       PISG, 0, 1, Raise, PISTOLUP;
    PISTOL1:        PISG, 0, 4, None, PISTOL2;
    PISTOL2:        PISG, 1, 6, FirePistol, PISTOL3;
    PISTOL3:        PISG, 2, 4, None, PISTOL4;
    PISTOL4:        PISG, 1, 5, ReFire, PISTOL;
    PISTOLFLASH:    PISF, FB | 0, 7, Light1, LIGHTDONE;

    // shotgun
    SGUN:           SHTG, 0, 1, WeaponReady, SGUN;
    SGUNDOWN:       SHTG, 0, 1, Lower, SGUNDOWN;
    SGUNUP:         SHTG, 0, 1, Raise, SGUNUP;
    SGUN1:          SHTG, 0, 3, None, SGUN2;
    SGUN2:          SHTG, 0, 7, FireShotgun, SGUN3;
    SGUN3:          SHTG, 1, 5, None, SGUN4;
    SGUN4:          SHTG, 2, 5, None, SGUN5;
    SGUN5:          SHTG, 3, 4, None, SGUN6;
    SGUN6:          SHTG, 4, 5, None, SGUN7;
    SGUN7:          SHTG, 5, 5, None, SGUN8;
    SGUN8:          SHTG, 6, 3, None, SGUN9;
    SGUN9:          SHTG, 0, 7, ReFire, SGUN;
    SGUNFLASH1:     SHTF, FB | 0, 4, Light1, SGUNFLASH2;
    SGUNFLASH2:     SHTF, FB | 1, 3, Light2, LIGHTDONE;

    // super shotgun
    DSGUN:          SHT2, 0, 1, WeaponReady, DSGUN;
    DSGUNDOWN:      SHT2, 0, 1, Lower, DSGUNDOWN;
    DSGUNUP:        SHT2, 0, 1, Raise, DSGUNUP;
    DSGUN1:         SHT2, 0, 3, None, DSGUN2;
    DSGUN2:         SHT2, 0, 7, FireShotgun2, DSGUN3;
    DSGUN3:         SHT2, 1, 7, None, DSGUN4;
    DSGUN4:         SHT2, 2, 7, CheckReload, DSGUN5;
    DSGUN5:         SHT2, 3, 7, OpenShotgun2, DSGUN6;
    DSGUN6:         SHT2, 4, 7, None, DSGUN7;
    DSGUN7:         SHT2, 5, 7, LoadShotgun2, DSGUN8;
    DSGUN8:         SHT2, 6, 6, None, DSGUN9;
    DSGUN9:         SHT2, 7, 6, CloseShotgun2, DSGUN10;
    DSGUN10:        SHT2, 0, 5, ReFire, DSGUN;
    DSGUNFLASH1:    SHT2, FB | 8, 5, Light1, DSGUNFLASH2;
    DSGUNFLASH2:    SHT2, FB | 9, 4, Light2, LIGHTDONE;

    // chaingun
    CHAIN:          CHGG, 0, 1, WeaponReady, CHAIN;
    CHAINDOWN:      CHGG, 0, 1, Lower, CHAINDOWN;
    CHAINUP:        CHGG, 0, 1, Raise, CHAINUP;
    CHAIN1:         CHGG, 0, 4, FireCGun, CHAIN2;
    CHAIN2:         CHGG, 1, 4, FireCGun, CHAIN3;
    CHAIN3:         CHGG, 1, 0, ReFire, CHAIN;
    CHAINFLASH1:    CHGF, FB | 0, 5, Light1, LIGHTDONE;
    CHAINFLASH2:    CHGF, FB | 1, 5, Light2, LIGHTDONE;

    // rocket launcher
    MISSILE:        MISG, 0, 1, WeaponReady, MISSILE;
    MISSILEDOWN:    MISG, 0, 1, Lower, MISSILEDOWN;
    MISSILEUP:      MISG, 0, 1, Raise, MISSILEUP;
    MISSILE1:       MISG, 1, 8, GunFlash, MISSILE2;
    MISSILE2:       MISG, 1, 12, FireMissile, MISSILE3;
    MISSILE3:       MISG, 1, 0, ReFire, MISSILE;
    MISSILEFLASH1:  MISF, FB | 0, 3, Light1, MISSILEFLASH2;
    MISSILEFLASH2:  MISF, FB | 1, 4, None, MISSILEFLASH3;
    MISSILEFLASH3:  MISF, FB | 2, 4, Light2, MISSILEFLASH4;
    MISSILEFLASH4:  MISF, FB | 3, 4, Light2, LIGHTDONE;

    // chainsaw
    SAW:            SAWG, 2, 4, WeaponReady, SAWB;
    SAWB:           SAWG, 3, 4, WeaponReady, SAW;
    SAWDOWN:        SAWG, 2, 1, Lower, SAWDOWN;
    SAWUP:          SAWG, 2, 1, Raise, SAWUP;
    SAW1:           SAWG, 0, 4, Saw, SAW2;
    SAW2:           SAWG, 1, 4, Saw, SAW3;
    SAW3:           SAWG, 1, 0, ReFire, SAW;

    // plasma rifle
    PLASMA:         PLSG, 0, 1, WeaponReady, PLASMA;
    PLASMADOWN:     PLSG, 0, 1, Lower, PLASMADOWN;
    PLASMAUP:       PLSG, 0, 1, Raise, PLASMAUP;
    PLASMA1:        PLSG, 0, 3, FirePlasma, PLASMA2;
    PLASMA2:        PLSG, 1, 20, ReFire, PLASMA;
    PLASMAFLASH1:   PLSF, FB | 0, 4, Light1, LIGHTDONE;
    PLASMAFLASH2:   PLSF, FB | 1, 4, Light1, LIGHTDONE;

    // bfg
    BFG:            BFGG, 0, 1, WeaponReady, BFG;
    BFGDOWN:        BFGG, 0, 1, Lower, BFGDOWN;
    BFGUP:          BFGG, 0, 1, Raise, BFGUP;
    BFG1:           BFGG, 0, 20, BfgSound, BFG2;
    BFG2:           BFGG, 1, 10, GunFlash, BFG3;
    BFG3:           BFGG, 1, 10, FireBfg, BFG4;
    BFG4:           BFGG, 1, 20, ReFire, BFG;
    BFGFLASH1:      BFGF, FB | 0, 11, Light1, BFGFLASH2;
    BFGFLASH2:      BFGF, FB | 1, 6, Light2, LIGHTDONE;

    // blood and bullet puffs
    BLOOD1:         BLUD, 2, 8, None, BLOOD2;
    BLOOD2:         BLUD, 1, 8, None, BLOOD3;
    BLOOD3:         BLUD, 0, 8, None, NULL;
    PUFF1:          PUFF, FB | 0, 4, None, PUFF2;
    PUFF2:          PUFF, 1, 4, None, PUFF3;
    PUFF3:          PUFF, 2, 4, None, PUFF4;
    PUFF4:          PUFF, 3, 4, None, NULL;

    // teleport fog
    TFOG:           TFOG, FB | 0, 6, None, TFOG01;
    TFOG01:         TFOG, FB | 1, 6, None, TFOG02;
    TFOG02:         TFOG, FB | 0, 6, None, TFOG2;
    TFOG2:          TFOG, FB | 1, 6, None, TFOG3;
    TFOG3:          TFOG, FB | 2, 6, None, TFOG4;
    TFOG4:          TFOG, FB | 3, 6, None, TFOG5;
    TFOG5:          TFOG, FB | 4, 6, None, TFOG6;
    TFOG6:          TFOG, FB | 5, 6, None, TFOG7;
    TFOG7:          TFOG, FB | 6, 6, None, TFOG8;
    TFOG8:          TFOG, FB | 7, 6, None, TFOG9;
    TFOG9:          TFOG, FB | 8, 6, None, TFOG10;
    TFOG10:         TFOG, FB | 9, 6, None, NULL;

    // item respawn fog
    IFOG:           IFOG, FB | 0, 6, None, IFOG01;
    IFOG01:         IFOG, FB | 1, 6, None, IFOG02;
    IFOG02:         IFOG, FB | 0, 6, None, IFOG2;
    IFOG2:          IFOG, FB | 1, 6, None, IFOG3;
    IFOG3:          IFOG, FB | 2, 6, None, IFOG4;
    IFOG4:          IFOG, FB | 3, 6, None, IFOG5;
    IFOG5:          IFOG, FB | 4, 6, None, NULL;

    // rocket projectile
    ROCKET:         MISL, FB | 0, 1, None, ROCKET;
    EXPLODE1:       MISL, FB | 1, 8, Explode, EXPLODE2;
    EXPLODE2:       MISL, FB | 2, 6, None, EXPLODE3;
    EXPLODE3:       MISL, FB | 3, 4, None, NULL;

    // plasma projectile
    PLASBALL:       PLSS, FB | 0, 6, None, PLASBALL2;
    PLASBALL2:      PLSS, FB | 1, 6, None, PLASBALL;
    PLASEXP:        PLSE, FB | 0, 4, None, PLASEXP2;
    PLASEXP2:       PLSE, FB | 1, 4, None, PLASEXP3;
    PLASEXP3:       PLSE, FB | 2, 4, None, PLASEXP4;
    PLASEXP4:       PLSE, FB | 3, 4, None, PLASEXP5;
    PLASEXP5:       PLSE, FB | 4, 4, None, NULL;

    // bfg projectile
    BFGSHOT:        BFS1, FB | 0, 4, None, BFGSHOT2;
    BFGSHOT2:       BFS1, FB | 1, 4, None, BFGSHOT;
    BFGLAND:        BFE1, FB | 0, 8, None, BFGLAND2;
    BFGLAND2:       BFE1, FB | 1, 8, None, BFGLAND3;
    BFGLAND3:       BFE1, FB | 2, 8, BfgSpray, BFGLAND4;
    BFGLAND4:       BFE1, FB | 3, 8, None, BFGLAND5;
    BFGLAND5:       BFE1, FB | 4, 8, None, BFGLAND6;
    BFGLAND6:       BFE1, FB | 5, 8, None, NULL;
    BFGEXP:         BFE2, FB | 0, 8, None, BFGEXP2;
    BFGEXP2:        BFE2, FB | 1, 8, None, BFGEXP3;
    BFGEXP3:        BFE2, FB | 2, 8, None, BFGEXP4;
    BFGEXP4:        BFE2, FB | 3, 8, None, NULL;

    // player body
    PLAY:           PLAY, 0, -1, None, NULL;
    PLAY_RUN1:      PLAY, 0, 4, None, PLAY_RUN2;
    PLAY_RUN2:      PLAY, 1, 4, None, PLAY_RUN3;
    PLAY_RUN3:      PLAY, 2, 4, None, PLAY_RUN4;
    PLAY_RUN4:      PLAY, 3, 4, None, PLAY_RUN1;
    PLAY_ATK1:      PLAY, 4, 12, None, PLAY;
    PLAY_ATK2:      PLAY, FB | 5, 6, None, PLAY_ATK1;
    PLAY_PAIN:      PLAY, 6, 4, None, PLAY_PAIN2;
    PLAY_PAIN2:     PLAY, 6, 4, Pain, PLAY;
    PLAY_DIE1:      PLAY, 7, 10, None, PLAY_DIE2;
    PLAY_DIE2:      PLAY, 8, 10, PlayerScream, PLAY_DIE3;
    PLAY_DIE3:      PLAY, 9, 10, Fall, PLAY_DIE4;
    PLAY_DIE4:      PLAY, 10, 10, None, PLAY_DIE5;
    PLAY_DIE5:      PLAY, 11, 10, None, PLAY_DIE6;
    PLAY_DIE6:      PLAY, 12, 10, None, PLAY_DIE7;
    PLAY_DIE7:      PLAY, 13, -1, None, NULL;
    PLAY_XDIE1:     PLAY, 14, 5, None, PLAY_XDIE2;
    PLAY_XDIE2:     PLAY, 15, 5, XScream, PLAY_XDIE3;
    PLAY_XDIE3:     PLAY, 16, 5, Fall, PLAY_XDIE4;
    PLAY_XDIE4:     PLAY, 17, 5, None, PLAY_XDIE5;
    PLAY_XDIE5:     PLAY, 18, 5, None, PLAY_XDIE6;
    PLAY_XDIE6:     PLAY, 19, 5, None, PLAY_XDIE7;
    PLAY_XDIE7:     PLAY, 20, 5, None, PLAY_XDIE8;
    PLAY_XDIE8:     PLAY, 21, 5, None, PLAY_XDIE9;
    PLAY_XDIE9:     PLAY, 22, -1, None, NULL;

    // zombieman
    POSS_STND:      POSS, 0, 10, None, POSS_STND2;
    POSS_STND2:     POSS, 1, 10, None, POSS_STND;
    POSS_RUN1:      POSS, 0, 4, None, POSS_RUN2;
    POSS_RUN2:      POSS, 0, 4, None, POSS_RUN3;
    POSS_RUN3:      POSS, 1, 4, None, POSS_RUN4;
    POSS_RUN4:      POSS, 1, 4, None, POSS_RUN5;
    POSS_RUN5:      POSS, 2, 4, None, POSS_RUN6;
    POSS_RUN6:      POSS, 2, 4, None, POSS_RUN7;
    POSS_RUN7:      POSS, 3, 4, None, POSS_RUN8;
    POSS_RUN8:      POSS, 3, 4, None, POSS_RUN1;
    POSS_PAIN:      POSS, 6, 3, None, POSS_PAIN2;
    POSS_PAIN2:     POSS, 6, 3, Pain, POSS_RUN1;
    POSS_DIE1:      POSS, 7, 5, None, POSS_DIE2;
    POSS_DIE2:      POSS, 8, 5, Scream, POSS_DIE3;
    POSS_DIE3:      POSS, 9, 5, Fall, POSS_DIE4;
    POSS_DIE4:      POSS, 10, 5, None, POSS_DIE5;
    POSS_DIE5:      POSS, 11, -1, None, NULL;
    POSS_XDIE1:     POSS, 12, 5, None, POSS_XDIE2;
    POSS_XDIE2:     POSS, 13, 5, XScream, POSS_XDIE3;
    POSS_XDIE3:     POSS, 14, 5, Fall, POSS_XDIE4;
    POSS_XDIE4:     POSS, 15, 5, None, POSS_XDIE5;
    POSS_XDIE5:     POSS, 16, 5, None, POSS_XDIE6;
    POSS_XDIE6:     POSS, 17, 5, None, POSS_XDIE7;
    POSS_XDIE7:     POSS, 18, 5, None, POSS_XDIE8;
    POSS_XDIE8:     POSS, 19, 5, None, POSS_XDIE9;
    POSS_XDIE9:     POSS, 20, -1, None, NULL;

    // imp
    TROO_STND:      TROO, 0, 10, None, TROO_STND2;
    TROO_STND2:     TROO, 1, 10, None, TROO_STND;
    TROO_RUN1:      TROO, 0, 3, None, TROO_RUN2;
    TROO_RUN2:      TROO, 0, 3, None, TROO_RUN3;
    TROO_RUN3:      TROO, 1, 3, None, TROO_RUN4;
    TROO_RUN4:      TROO, 1, 3, None, TROO_RUN5;
    TROO_RUN5:      TROO, 2, 3, None, TROO_RUN6;
    TROO_RUN6:      TROO, 2, 3, None, TROO_RUN7;
    TROO_RUN7:      TROO, 3, 3, None, TROO_RUN8;
    TROO_RUN8:      TROO, 3, 3, None, TROO_RUN1;
    TROO_PAIN:      TROO, 7, 2, None, TROO_PAIN2;
    TROO_PAIN2:     TROO, 7, 2, Pain, TROO_RUN1;
    TROO_DIE1:      TROO, 8, 8, None, TROO_DIE2;
    TROO_DIE2:      TROO, 9, 8, Scream, TROO_DIE3;
    TROO_DIE3:      TROO, 10, 6, None, TROO_DIE4;
    TROO_DIE4:      TROO, 11, 6, Fall, TROO_DIE5;
    TROO_DIE5:      TROO, 12, -1, None, NULL;
    TROO_XDIE1:     TROO, 13, 5, None, TROO_XDIE2;
    TROO_XDIE2:     TROO, 14, 5, XScream, TROO_XDIE3;
    TROO_XDIE3:     TROO, 15, 5, None, TROO_XDIE4;
    TROO_XDIE4:     TROO, 16, 5, Fall, TROO_XDIE5;
    TROO_XDIE5:     TROO, 17, 5, None, TROO_XDIE6;
    TROO_XDIE6:     TROO, 18, 5, None, TROO_XDIE7;
    TROO_XDIE7:     TROO, 19, 5, None, TROO_XDIE8;
    TROO_XDIE8:     TROO, 20, -1, None, NULL;

    // lost soul
    SKULL_STND:     SKUL, FB | 0, 10, None, SKULL_STND2;
    SKULL_STND2:    SKUL, FB | 1, 10, None, SKULL_STND;
    SKULL_RUN1:     SKUL, FB | 0, 6, None, SKULL_RUN2;
    SKULL_RUN2:     SKUL, FB | 1, 6, None, SKULL_RUN1;
    SKULL_ATK1:     SKUL, FB | 2, 10, None, SKULL_ATK2;
    SKULL_ATK2:     SKUL, FB | 3, 4, None, SKULL_ATK3;
    SKULL_ATK3:     SKUL, FB | 2, 4, None, SKULL_ATK4;
    SKULL_ATK4:     SKUL, FB | 3, 4, None, SKULL_ATK3;
    SKULL_PAIN:     SKUL, FB | 4, 3, None, SKULL_PAIN2;
    SKULL_PAIN2:    SKUL, FB | 4, 3, Pain, SKULL_RUN1;
    SKULL_DIE1:     SKUL, FB | 5, 6, None, SKULL_DIE2;
    SKULL_DIE2:     SKUL, FB | 6, 6, Scream, SKULL_DIE3;
    SKULL_DIE3:     SKUL, FB | 7, 6, None, SKULL_DIE4;
    SKULL_DIE4:     SKUL, FB | 8, 6, Fall, SKULL_DIE5;
    SKULL_DIE5:     SKUL, 9, 6, None, SKULL_DIE6;
    SKULL_DIE6:     SKUL, 10, 6, None, NULL;

    // exploding barrel
    BAR1:           BAR1, 0, 6, None, BAR2;
    BAR2:           BAR1, 1, 6, None, BAR1;
    BEXP:           BEXP, FB | 0, 5, None, BEXP2;
    BEXP2:          BEXP, FB | 1, 5, Scream, BEXP3;
    BEXP3:          BEXP, FB | 2, 5, None, BEXP4;
    BEXP4:          BEXP, FB | 3, 10, Explode, BEXP5;
    BEXP5:          BEXP, FB | 4, 10, None, NULL;

    // pickups
    MEDI:           MEDI, 0, -1, None, NULL;
    STIM:           STIM, 0, -1, None, NULL;
    CLIP:           CLIP, 0, -1, None, NULL;
    SOUL:           SOUL, FB | 0, 6, None, SOUL2;
    SOUL2:          SOUL, FB | 1, 6, None, SOUL3;
    SOUL3:          SOUL, FB | 2, 6, None, SOUL4;
    SOUL4:          SOUL, FB | 3, 6, None, SOUL5;
    SOUL5:          SOUL, FB | 2, 6, None, SOUL6;
    SOUL6:          SOUL, FB | 1, 6, None, SOUL;
    PINV:           PINV, FB | 0, 6, None, PINV2;
    PINV2:          PINV, FB | 1, 6, None, PINV3;
    PINV3:          PINV, FB | 2, 6, None, PINV4;
    PINV4:          PINV, FB | 3, 6, None, PINV;
    PINS:           PINS, FB | 0, 6, None, PINS2;
    PINS2:          PINS, FB | 1, 6, None, PINS3;
    PINS3:          PINS, FB | 2, 6, None, PINS4;
    PINS4:          PINS, FB | 3, 6, None, PINS;
    MEGA:           MEGA, FB | 0, 6, None, MEGA2;
    MEGA2:          MEGA, FB | 1, 6, None, MEGA3;
    MEGA3:          MEGA, FB | 2, 6, None, MEGA4;
    MEGA4:          MEGA, FB | 3, 6, None, MEGA;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_and_enum_agree() {
        assert_eq!(NUM_STATES, STATES.len());
        assert_eq!(StateId::NULL as usize, 0);
        assert_eq!(StateId::NULL.info().tics, -1);
    }

    #[test]
    fn run_cycle_loops() {
        // the four run frames chain back to the first
        let mut s = StateId::PLAY_RUN1;
        for _ in 0..4 {
            s = s.info().next;
        }
        assert_eq!(s, StateId::PLAY_RUN1);
    }

    #[test]
    fn terminal_states_park_forever() {
        for s in [StateId::PLAY_DIE7, StateId::POSS_DIE5, StateId::TROO_DIE5] {
            assert_eq!(s.info().tics, -1);
        }
    }

    #[test]
    fn sprite_names_are_four_chars() {
        for name in SPRITE_NAMES {
            assert_eq!(name.len(), 4, "{name}");
        }
    }
}
