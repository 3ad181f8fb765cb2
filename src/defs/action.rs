//! Action codes referenced by [`super::states::STATES`].
//!
//! A state transition can trigger one of these; the simulation dispatches
//! on the code with the acting mobj plus optional player/psprite context.
//! Monster AI codes are intentionally absent - the walkers in this core
//! animate but do not hunt.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    None,

    // weapon overlay
    WeaponReady,
    Lower,
    Raise,
    ReFire,
    CheckReload,
    GunFlash,
    Punch,
    Saw,
    FirePistol,
    FireShotgun,
    FireShotgun2,
    OpenShotgun2,
    LoadShotgun2,
    CloseShotgun2,
    FireCGun,
    FireMissile,
    FirePlasma,
    BfgSound,
    FireBfg,
    BfgSpray,
    Light0,
    Light1,
    Light2,

    // mobj side
    Explode,
    Scream,
    XScream,
    Pain,
    PlayerScream,
    Fall,
}
