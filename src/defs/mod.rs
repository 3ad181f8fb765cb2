pub mod action;
pub mod flags;
pub mod mobjinfo;
pub mod sound;
pub mod states;

pub use crate::defs::{
    action::Action,
    flags::{MF_TRANSSHIFT, MobjFlags, ThingOptions},
    mobjinfo::{FLOAT_BOB_TYPES, MOBJINFO, MobjInfo, MobjType, NUM_MOBJ_TYPES},
    sound::{Music, NUM_MUSIC, NUM_SFX, SFX, Sfx, SfxInfo},
    states::{
        FF_FRAMEMASK, FF_FULLBRIGHT, NUM_SPRITES, NUM_STATES, SPRITE_NAMES, STATES, SpriteId,
        StateId, StateInfo,
    },
};
