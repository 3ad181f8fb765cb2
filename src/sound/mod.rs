//! The sound director: channel arbitration, positional attenuation and the
//! music selection state machine.
//!
//! The platform mixer sits behind [`SfxDriver`]/[`MusicDriver`]; everything
//! here is pure bookkeeping and therefore testable headless.

use crate::defs::sound::{Music, Sfx};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, approx_distance, approx_distance_z, fixed_mul};
use crate::game::{GameMode, GameState};
use crate::level::Level;
use crate::sim::{Sim, SoundOrigin, SoundRequest};
use crate::tables::{ANGLETOFINESHIFT, fine_sine, point_to_angle2};

pub const MAX_CHANNELS: usize = 16;

const S_CLIPPING_DIST: Fixed = 1200 * FRACUNIT;
const S_CLOSE_DIST: Fixed = 200 * FRACUNIT;
const S_ATTENUATOR: i32 = (S_CLIPPING_DIST - S_CLOSE_DIST) >> FRACBITS;
const S_STEREO_SWING: Fixed = 96 * FRACUNIT;

const NORM_SEP: i32 = 128;
const NORM_PITCH: i32 = 127;

/// Sfx that play from the hidden proxy next to the weapon instead of the
/// player body; the set is fixed.
const WEAPON_PROXY_SFX: &[Sfx] = &[
    Sfx::pistol,
    Sfx::shotgn,
    Sfx::dshtgn,
    Sfx::dbopn,
    Sfx::dbload,
    Sfx::dbcls,
    Sfx::chgun,
    Sfx::sawup,
    Sfx::sawidl,
    Sfx::sawful,
    Sfx::sawhit,
    Sfx::punch,
];

pub fn uses_weapon_proxy(sfx: Sfx) -> bool {
    WEAPON_PROXY_SFX.contains(&sfx)
}

/* ─────────────────────────── driver traits ───────────────────────────── */

/// Platform PCM mixer.
pub trait SfxDriver {
    fn start(&mut self, sfx: Sfx, channel: usize, vol: i32, sep: i32, pitch: i32) -> i32;
    fn stop(&mut self, handle: i32);
    fn is_playing(&self, handle: i32) -> bool;
    fn update_params(&mut self, handle: i32, vol: i32, sep: i32);
}

/// Platform sequencer.
pub trait MusicDriver {
    fn register_song(&mut self, lump: &str) -> i32;
    fn play(&mut self, handle: i32, looping: bool);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn set_volume(&mut self, vol: i32);
}

/// Driver that swallows everything; headless runs and tests.
#[derive(Default)]
pub struct NullDriver {
    next_handle: i32,
}

impl SfxDriver for NullDriver {
    fn start(&mut self, _sfx: Sfx, _ch: usize, _vol: i32, _sep: i32, _pitch: i32) -> i32 {
        self.next_handle += 1;
        self.next_handle
    }
    fn stop(&mut self, _handle: i32) {}
    fn is_playing(&self, _handle: i32) -> bool {
        true
    }
    fn update_params(&mut self, _handle: i32, _vol: i32, _sep: i32) {}
}

impl MusicDriver for NullDriver {
    fn register_song(&mut self, _lump: &str) -> i32 {
        0
    }
    fn play(&mut self, _handle: i32, _looping: bool) {}
    fn stop(&mut self) {}
    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn set_volume(&mut self, _vol: i32) {}
}

/* ──────────────────────────── channel table ──────────────────────────── */

#[derive(Clone, Copy, Debug)]
struct Channel {
    sfx: Option<Sfx>,
    origin: SoundOrigin,
    handle: i32,
    priority: i32,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            sfx: None,
            origin: SoundOrigin::None,
            handle: -1,
            priority: 0,
        }
    }
}

pub struct Sounds {
    channels: Vec<Channel>,
    sfx_volume: i32,
    music_volume: i32,
    /// Mono folds separation to centre; mirrored levels swing the other way.
    pub mono: bool,
    pub mirrored: bool,
    /// Use the three-axis distance curve instead of the classic planar one.
    pub z_axis_sfx: bool,
    pub remaster_ost: bool,

    music: Option<Music>,
    music_handle: i32,
    music_looping: bool,
    paused: bool,

    driver: Box<dyn SfxDriver>,
    music_driver: Box<dyn MusicDriver>,
}

impl Sounds {
    /// `channels` is clamped to the fixed upper bound.
    pub fn new(
        driver: Box<dyn SfxDriver>,
        music_driver: Box<dyn MusicDriver>,
        channels: usize,
    ) -> Sounds {
        Sounds {
            channels: vec![Channel::default(); channels.clamp(1, MAX_CHANNELS)],
            sfx_volume: 100,
            music_volume: 100,
            mono: false,
            mirrored: false,
            z_axis_sfx: false,
            remaster_ost: false,
            music: None,
            music_handle: -1,
            music_looping: false,
            paused: false,
            driver,
            music_driver,
        }
    }

    pub fn set_sfx_volume(&mut self, vol: i32) {
        assert!((0..=127).contains(&vol), "sfx volume {vol} out of range");
        self.sfx_volume = vol;
    }

    pub fn set_music_volume(&mut self, vol: i32) {
        assert!((0..=127).contains(&vol), "music volume {vol} out of range");
        self.music_volume = vol;
        self.music_driver.set_volume(vol);
    }

    /// Level start: silence every channel and put on the level song.
    pub fn start_level(
        &mut self,
        mode: GameMode,
        nerve: bool,
        episode: u32,
        map: u32,
    ) {
        for c in 0..self.channels.len() {
            self.stop_channel(c);
        }
        if self.music_volume > 0 {
            self.paused = false;
        }
        let mus = music_for(mode, nerve, episode, map, GameState::Level);
        self.change_music(mus, true);
    }

    pub fn change_music(&mut self, mus: Music, looping: bool) {
        if self.music == Some(mus) {
            return;
        }
        self.music_driver.stop();
        let lump = music_lump(mus, self.remaster_ost);
        self.music_handle = self.music_driver.register_song(&lump);
        self.music_driver.play(self.music_handle, looping);
        self.music = Some(mus);
        self.music_looping = looping;
    }

    pub fn pause_sound(&mut self) {
        if self.music.is_some() && !self.paused {
            self.music_driver.pause();
            self.paused = true;
        }
    }

    pub fn resume_sound(&mut self) {
        if self.music.is_some() && self.paused {
            self.music_driver.resume();
            self.paused = false;
        }
    }

    fn stop_channel(&mut self, cnum: usize) {
        let c = &mut self.channels[cnum];
        if c.sfx.is_some() {
            if self.driver.is_playing(c.handle) {
                self.driver.stop(c.handle);
            }
            *c = Channel::default();
        }
    }

    /// Kill any channel already owned by this origin.
    fn stop_origin(&mut self, origin: SoundOrigin) {
        if origin == SoundOrigin::None {
            return;
        }
        for c in 0..self.channels.len() {
            if self.channels[c].sfx.is_some() && self.channels[c].origin == origin {
                self.stop_channel(c);
                break;
            }
        }
    }

    /// Free channel, or evict the first lower-priority one; `None` = drop.
    fn get_channel(&mut self, origin: SoundOrigin, sfx: Sfx) -> Option<usize> {
        let mut cnum = None;
        for c in 0..self.channels.len() {
            if self.channels[c].sfx.is_none() {
                cnum = Some(c);
                break;
            }
            if origin != SoundOrigin::None && self.channels[c].origin == origin {
                self.stop_channel(c);
                cnum = Some(c);
                break;
            }
        }

        let cnum = match cnum {
            Some(c) => c,
            None => {
                // look for a channel we out-rank
                let prio = sfx.info().priority;
                let evict = (0..self.channels.len())
                    .find(|&c| self.channels[c].priority >= prio)?;
                self.stop_channel(evict);
                evict
            }
        };

        self.channels[cnum].sfx = Some(sfx);
        self.channels[cnum].origin = origin;
        self.channels[cnum].priority = sfx.info().priority;
        Some(cnum)
    }

    /* ────────────────────────── starting sfx ─────────────────────────── */

    /// Drain everything the simulation queued this tick.
    pub fn run_queue(&mut self, sim: &mut Sim, level: &Level) {
        for req in sim.take_sounds() {
            self.start_request(sim, level, req);
        }
    }

    /// Start a positional sound for the console player's ears.
    pub fn start_request(&mut self, sim: &mut Sim, level: &Level, req: SoundRequest) -> Option<()> {
        if self.sfx_volume == 0 || req.sfx == Sfx::None {
            return None;
        }

        /* resolve the link chain */
        let mut sfx = req.sfx;
        let mut volume = self.sfx_volume;
        let mut pitch = NORM_PITCH;
        if let Some(link) = sfx.info().link {
            volume += sfx.info().volume;
            pitch = sfx.info().pitch;
            if volume < 1 {
                return None;
            }
            volume = volume.min(self.sfx_volume);
            sfx = link;
        }

        /* positional parameters */
        let listener_slot = sim.opts.console_player;
        let listener_ent = sim.players[listener_slot].mo;
        let listener = listener_ent.and_then(|e| sim.mobj(e));

        let source = match req.origin {
            SoundOrigin::None => None,
            SoundOrigin::Mobj(e) => sim.mobj(e).map(|m| (m.x, m.y, m.z)),
            SoundOrigin::WeaponProxy(slot) => sim.players[slot as usize]
                .mo
                .and_then(|e| sim.mobj(e))
                .map(|m| (m.x, m.y, m.z)),
        };

        let force_local = match req.origin {
            SoundOrigin::Mobj(e) => Some(e) == listener_ent,
            SoundOrigin::WeaponProxy(slot) => slot as usize == listener_slot,
            SoundOrigin::None => true,
        };

        let mut sep = NORM_SEP;
        if !force_local {
            match (listener.as_ref(), source) {
                (Some(l), Some(src)) => {
                    let params = self.adjust_params(level, l, src, volume);
                    match params {
                        Some((v, s)) => {
                            volume = v;
                            sep = if src.0 == l.x && src.1 == l.y { NORM_SEP } else { s };
                        }
                        None => return None, // inaudible
                    }
                }
                _ => {}
            }
        }

        /* pitch variance; never feeds back into gameplay randomness */
        if (Sfx::sawup..=Sfx::sawhit).contains(&req.sfx) {
            pitch += 8 - (sim.vis_rng.next() & 15);
        } else if req.sfx != Sfx::itemup && req.sfx != Sfx::tink {
            pitch += 16 - (sim.vis_rng.next() & 31);
        }
        let pitch = pitch.clamp(0, 255);

        self.stop_origin(req.origin);
        let cnum = self.get_channel(req.origin, sfx)?;
        self.channels[cnum].handle = self.driver.start(sfx, cnum, volume, sep, pitch);
        Some(())
    }

    /// Distance attenuation and stereo separation; `None` = inaudible.
    fn adjust_params(
        &self,
        level: &Level,
        listener: &crate::sim::Mobj,
        (sx, sy, sz): (Fixed, Fixed, Fixed),
        base_volume: i32,
    ) -> Option<(i32, i32)> {
        // proper clipping on the legendary map 8 arenas
        let doom1map8 = level.name == "E1M8" || level.name == "E2M8" || level.name == "E3M8";

        let adx = (listener.x - sx).abs();
        let ady = (listener.y - sy).abs();
        let adz = (listener.z - sz).abs();

        let approx_dist = if self.z_axis_sfx {
            approx_distance_z(adx, ady, adz)
        } else {
            approx_distance(adx, ady)
        };

        if !doom1map8 && approx_dist > S_CLIPPING_DIST {
            return None;
        }

        /* stereo separation from the angle to the source */
        let angle = point_to_angle2(listener.x, listener.y, sx, sy);
        let angle = if angle > listener.angle {
            angle.wrapping_sub(listener.angle)
        } else {
            angle.wrapping_add(u32::MAX.wrapping_sub(listener.angle))
        };
        let fine = (angle >> ANGLETOFINESHIFT) as usize;

        let swing = if self.mono {
            0
        } else if self.mirrored {
            -S_STEREO_SWING
        } else {
            S_STEREO_SWING
        };
        let sep = NORM_SEP - (fixed_mul(swing, fine_sine(fine)) >> FRACBITS);

        /* volume attenuation */
        let volume = if approx_dist < S_CLOSE_DIST {
            base_volume
        } else if doom1map8 {
            let dist = approx_dist.min(S_CLIPPING_DIST);
            15 + ((base_volume - 15) * ((S_CLIPPING_DIST - dist) >> FRACBITS)) / S_ATTENUATOR
        } else {
            (base_volume * ((S_CLIPPING_DIST - approx_dist) >> FRACBITS)) / S_ATTENUATOR
        };

        if volume > 0 { Some((volume, sep)) } else { None }
    }

    /// Per-tick parameter refresh for every live channel.
    pub fn update_sounds(&mut self, sim: &Sim, level: &Level) {
        let listener_slot = sim.opts.console_player;
        let listener_ent = sim.players[listener_slot].mo;
        let listener = listener_ent.and_then(|e| sim.mobj(e));

        for c in 0..self.channels.len() {
            let ch = self.channels[c];
            let Some(_sfx) = ch.sfx else { continue };

            if !self.driver.is_playing(ch.handle) {
                self.stop_channel(c);
                continue;
            }

            let force_local = match ch.origin {
                SoundOrigin::Mobj(e) => Some(e) == listener_ent,
                SoundOrigin::WeaponProxy(slot) => slot as usize == listener_slot,
                SoundOrigin::None => true,
            };
            if force_local {
                continue;
            }

            let source = match ch.origin {
                SoundOrigin::Mobj(e) => sim.mobj(e).map(|m| (m.x, m.y, m.z)),
                _ => None,
            };
            match (listener.as_ref(), source) {
                (Some(l), Some(src)) => {
                    match self.adjust_params(level, l, src, self.sfx_volume) {
                        Some((vol, sep)) => self.driver.update_params(ch.handle, vol, sep),
                        None => self.stop_channel(c),
                    }
                }
                _ => {}
            }
        }
    }

    /// How many channels are currently playing (test/diagnostic hook).
    pub fn active_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.sfx.is_some()).count()
    }

    /// The sfx on a given channel, for diagnostics.
    pub fn channel_sfx(&self, cnum: usize) -> Option<Sfx> {
        self.channels.get(cnum).and_then(|c| c.sfx)
    }
}

/* ─────────────────────────── music selection ─────────────────────────── */

/// The music id for a game moment; a pure function.
pub fn music_for(
    mode: GameMode,
    nerve: bool,
    episode: u32,
    map: u32,
    state: GameState,
) -> Music {
    let commercial = mode == GameMode::Commercial;
    match state {
        GameState::Intermission => {
            if commercial {
                Music::dm2int
            } else {
                Music::inter
            }
        }
        GameState::Finale => {
            if commercial {
                Music::read_m
            } else {
                Music::victor
            }
        }
        GameState::DemoScreen => {
            if commercial {
                Music::dm2ttl
            } else {
                Music::intro
            }
        }
        GameState::Level => {
            if commercial {
                if nerve && (1..=9).contains(&map) {
                    const NMUS: [Music; 9] = [
                        Music::messag,
                        Music::ddtblu,
                        Music::doom,
                        Music::shawn,
                        Music::in_cit,
                        Music::the_da,
                        Music::in_cit,
                        Music::shawn2,
                        Music::ddtbl2,
                    ];
                    NMUS[(map - 1) as usize]
                } else {
                    Music::from_index(
                        Music::runnin as usize + (map.clamp(1, 32) - 1) as usize,
                    )
                    .unwrap_or(Music::runnin)
                }
            } else if episode == 4 {
                // episode 4 borrows its soundtrack
                const SPMUS: [Music; 9] = [
                    Music::e3m4,
                    Music::e3m2,
                    Music::e3m3,
                    Music::e1m5,
                    Music::e2m7,
                    Music::e2m4,
                    Music::e2m6,
                    Music::e2m5,
                    Music::e1m9,
                ];
                SPMUS[((map.clamp(1, 9) - 1) as usize)]
            } else {
                let e = episode.clamp(1, 3) as usize;
                let m = map.clamp(1, 9) as usize;
                Music::from_index(Music::e1m1 as usize + (e - 1) * 9 + (m - 1))
                    .unwrap_or(Music::e1m1)
            }
        }
    }
}

/// Lump name for a music id; the remastered soundtrack lives under its own
/// prefix in the expansion WAD.
pub fn music_lump(mus: Music, remaster: bool) -> String {
    if remaster {
        format!("O_{}", mus.name().to_ascii_uppercase())
    } else {
        format!("D_{}", mus.name().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::setup::fixture::load_square;
    use crate::sim::{SimOptions, TicCmd};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Driver that records starts/stops so tests can observe arbitration.
    #[derive(Default)]
    struct Recorder {
        started: Rc<RefCell<Vec<(Sfx, i32)>>>,
        stopped: Rc<RefCell<Vec<i32>>>,
        next: i32,
    }

    impl SfxDriver for Recorder {
        fn start(&mut self, sfx: Sfx, _ch: usize, vol: i32, _sep: i32, _pitch: i32) -> i32 {
            self.next += 1;
            self.started.borrow_mut().push((sfx, vol));
            self.next
        }
        fn stop(&mut self, handle: i32) {
            self.stopped.borrow_mut().push(handle);
        }
        fn is_playing(&self, _handle: i32) -> bool {
            true
        }
        fn update_params(&mut self, _handle: i32, _vol: i32, _sep: i32) {}
    }

    fn world() -> (crate::level::Level, Sim) {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        sim.ticker(&level, &[TicCmd::default()]);
        (level, sim)
    }

    #[test]
    fn eviction_prefers_lower_priority() {
        let (level, mut sim) = world();
        let rec = Recorder::default();
        let started = rec.started.clone();
        let mut snd = Sounds::new(Box::new(rec), Box::new(NullDriver::default()), 2);

        let ent = sim.players[0].mo.unwrap();
        let other = crate::sim::spawn_mobj(
            &mut sim,
            &level,
            crate::defs::MobjType::BARREL,
            200 * crate::fixed::FRACUNIT,
            200 * crate::fixed::FRACUNIT,
            crate::sim::ONFLOORZ,
        );
        // two low-priority active sounds from distinct origins fill both
        // channels (posact/bgact priority 120)
        for (origin, sfx) in [
            (SoundOrigin::Mobj(ent), Sfx::posact),
            (SoundOrigin::Mobj(other), Sfx::bgact),
        ] {
            snd.start_request(&mut sim, &level, SoundRequest { origin, sfx });
        }
        assert_eq!(snd.active_channels(), 2);

        // a higher-importance sound (lower number) evicts one of them
        let ok = snd.start_request(
            &mut sim,
            &level,
            SoundRequest {
                origin: SoundOrigin::WeaponProxy(0),
                sfx: Sfx::pistol, // priority 64
            },
        );
        assert!(ok.is_some());
        assert_eq!(snd.active_channels(), 2);
        assert!(started.borrow().iter().any(|(s, _)| *s == Sfx::pistol));
    }

    #[test]
    fn channel_exhaustion_is_a_silent_drop() {
        let (level, mut sim) = world();
        let mut snd = Sounds::new(
            Box::new(NullDriver::default()),
            Box::new(NullDriver::default()),
            1,
        );
        let ent = sim.players[0].mo.unwrap();

        // pistol (64) occupies the only channel, owned by another origin
        snd.start_request(
            &mut sim,
            &level,
            SoundRequest {
                origin: SoundOrigin::Mobj(ent),
                sfx: Sfx::pistol,
            },
        );
        let other = crate::sim::spawn_mobj(
            &mut sim,
            &level,
            crate::defs::MobjType::BARREL,
            200 * crate::fixed::FRACUNIT,
            200 * crate::fixed::FRACUNIT,
            crate::sim::ONFLOORZ,
        );
        snd.channels[0].origin = SoundOrigin::Mobj(other);

        // a less important sound (higher number) cannot evict: dropped
        let res = snd.start_request(
            &mut sim,
            &level,
            SoundRequest {
                origin: SoundOrigin::None,
                sfx: Sfx::posact, // priority 120 > 64
            },
        );
        assert!(res.is_none());
        assert_eq!(snd.channel_sfx(0), Some(Sfx::pistol));
    }

    #[test]
    fn far_sounds_are_inaudible() {
        let (level, sim) = world();
        let snd = Sounds::new(
            Box::new(NullDriver::default()),
            Box::new(NullDriver::default()),
            8,
        );
        let listener = sim.players[0].mo.and_then(|e| sim.mobj(e)).unwrap();
        // beyond S_CLIPPING_DIST
        let far = (
            listener.x + 1400 * FRACUNIT,
            listener.y,
            listener.z,
        );
        assert!(snd.adjust_params(&level, &listener, far, 100).is_none());
        // close by: full volume
        let near = (listener.x + 50 * FRACUNIT, listener.y, listener.z);
        let (vol, _sep) = snd.adjust_params(&level, &listener, near, 100).unwrap();
        assert_eq!(vol, 100);
    }

    #[test]
    fn music_selection_tables() {
        use GameState::*;
        assert_eq!(
            music_for(GameMode::Registered, false, 1, 1, Level),
            Music::e1m1
        );
        assert_eq!(
            music_for(GameMode::Registered, false, 2, 5, Level),
            Music::e2m5
        );
        // episode 4 borrows
        assert_eq!(music_for(GameMode::Retail, false, 4, 1, Level), Music::e3m4);
        assert_eq!(
            music_for(GameMode::Commercial, false, 0, 1, Level),
            Music::runnin
        );
        assert_eq!(
            music_for(GameMode::Commercial, true, 0, 3, Level),
            Music::doom
        );
        assert_eq!(
            music_for(GameMode::Commercial, false, 0, 1, Intermission),
            Music::dm2int
        );
        assert_eq!(
            music_for(GameMode::Registered, false, 1, 1, Finale),
            Music::victor
        );
    }

    #[test]
    fn volume_range_is_enforced() {
        let mut snd = Sounds::new(
            Box::new(NullDriver::default()),
            Box::new(NullDriver::default()),
            8,
        );
        snd.set_sfx_volume(127);
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            snd.set_sfx_volume(128)
        }));
        assert!(r.is_err());
    }

    use crate::fixed::FRACUNIT;
}
