//! The end-of-episode finale: slow-typed story text, the art screen or
//! bunny scroll, and the commercial cast call.
//!
//! Pure state machine like the intermission; drawing goes through
//! [`UiCanvas`], sounds and music queue for the host.

use crate::defs::mobjinfo::MobjType;
use crate::defs::sound::{Music, Sfx};
use crate::defs::states::StateId;
use crate::game::{GameMode, TICRATE};
use crate::render::UiCanvas;
use crate::sim::{BT_ATTACK, BT_USE, TicCmd};

/// Tics per typed character.
const TEXTSPEED: i32 = 3;
/// Extra beat after the paragraph lands.
const TEXTWAIT: i32 = 250;
/// The END sequence starts this far into the bunny scroll.
const ENDCOUNT: i32 = 1130;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Text,
    ArtScreen,
    Cast,
}

/// One cast-call entry.
#[derive(Clone, Copy, Debug)]
pub struct CastEntry {
    pub name: &'static str,
    pub kind: MobjType,
}

pub static CAST_ORDER: &[CastEntry] = &[
    CastEntry {
        name: "ZOMBIEMAN",
        kind: MobjType::POSSESSED,
    },
    CastEntry {
        name: "IMP",
        kind: MobjType::TROOP,
    },
    CastEntry {
        name: "LOST SOUL",
        kind: MobjType::SKULL,
    },
    CastEntry {
        name: "OUR HERO",
        kind: MobjType::PLAYER,
    },
];

/// Sfx dubbed over specific firing frames during the cast call.
static CAST_STATE_SFX: &[(StateId, Sfx)] = &[
    (StateId::SKULL_ATK2, Sfx::sklatk),
    (StateId::PLAY_ATK2, Sfx::pistol),
];

pub struct Finale {
    pub stage: Stage,
    mode: GameMode,
    episode: u32,
    count: i32,
    text: String,
    flat: &'static str,

    /* cast call */
    castnum: usize,
    caststate: StateId,
    casttics: i32,
    castframes: i32,
    castdeath: bool,
    castonmelee: bool,
    castattacking: bool,

    sounds: Vec<Sfx>,
    music: Option<Music>,
}

/// Episode-end story blurbs; DeHackEd replacements arrive via `override`.
fn episode_text(mode: GameMode, episode: u32) -> (&'static str, &'static str) {
    match (mode, episode) {
        (GameMode::Commercial, _) => (
            "THE HORDE IS BROKEN. THE GATES ARE SEALED.\n\
             YOU WALK OUT OF THE STARPORT INTO A QUIET DAWN.",
            "SLIME16",
        ),
        (_, 1) => (
            "YOU CLEARED THE INSTALLATION AND SHOULD HAVE WON...\n\
             BUT THE HANGAR TO DEIMOS OPENS ONTO SOMETHING WORSE.",
            "FLOOR4_8",
        ),
        (_, 2) => (
            "THE TWISTED BASE FALLS SILENT AT LAST.\n\
             BELOW YOU, THE SURFACE OF HELL ITSELF WAITS.",
            "SFLR6_1",
        ),
        (_, 3) => (
            "THE SPIDER'S DEMISE ECHOES THROUGH THE CAVERNS.\n\
             A HIDDEN DOORWAY LEADS BACK HOME - AND BEYOND.",
            "MFLR8_4",
        ),
        _ => (
            "THE FINAL GUARDIANS LIE BROKEN.\n\
             EARTH IS SAVED, THOUGH THE SCARS WILL STAY.",
            "MFLR8_3",
        ),
    }
}

impl Finale {
    /// `F_StartFinale`; `text_override` is the DeHackEd substitution hook.
    pub fn start(
        mode: GameMode,
        episode: u32,
        text_override: Option<&str>,
    ) -> Finale {
        let (text, flat) = episode_text(mode, episode);
        let music = if mode == GameMode::Commercial {
            Music::read_m
        } else {
            Music::victor
        };
        Finale {
            stage: Stage::Text,
            mode,
            episode,
            count: 0,
            text: text_override.unwrap_or(text).to_owned(),
            flat,
            castnum: 0,
            caststate: CAST_ORDER[0].kind.info().seestate,
            casttics: 0,
            castframes: 0,
            castdeath: false,
            castonmelee: false,
            castattacking: false,
            sounds: Vec::new(),
            music: Some(music),
        }
    }

    pub fn take_sounds(&mut self) -> Vec<Sfx> {
        std::mem::take(&mut self.sounds)
    }

    pub fn take_music(&mut self) -> Option<Music> {
        self.music.take()
    }

    /// `F_Responder`: in the cast, any keypress guns the actor down.
    pub fn responder(&mut self) -> bool {
        if self.stage == Stage::Cast && !self.castdeath {
            self.cast_shoot();
            return true;
        }
        false
    }

    /// `F_Ticker`.
    pub fn tick(&mut self, cmds: &[TicCmd]) {
        self.count += 1;

        match self.stage {
            Stage::Text => {
                /* pressing anything after the text landed moves on */
                let pressed = cmds
                    .iter()
                    .any(|c| c.buttons & (BT_ATTACK | BT_USE) != 0);
                let landed = self.count > self.text.len() as i32 * TEXTSPEED + TEXTWAIT;
                if landed || (pressed && self.count > 50) {
                    if self.mode == GameMode::Commercial {
                        self.start_cast();
                    } else {
                        self.stage = Stage::ArtScreen;
                        self.count = 0;
                        if self.episode == 3 {
                            self.music = Some(Music::bunny);
                        }
                    }
                }
            }
            Stage::ArtScreen => {
                // the panorama runs on its own clock; nothing to advance
            }
            Stage::Cast => self.cast_ticker(),
        }
    }

    /* ─────────────────────────── cast call ───────────────────────────── */

    fn start_cast(&mut self) {
        self.stage = Stage::Cast;
        self.count = 0;
        self.castnum = 0;
        self.caststate = CAST_ORDER[0].kind.info().seestate;
        self.casttics = self.caststate.info().tics;
        self.castdeath = false;
        self.castframes = 0;
        self.castonmelee = false;
        self.castattacking = false;
        self.music = Some(Music::evil);
    }

    fn cast_shoot(&mut self) {
        self.castdeath = true;
        let info = CAST_ORDER[self.castnum].kind.info();
        self.caststate = info.deathstate;
        self.casttics = self.caststate.info().tics;
        self.castframes = 0;
        self.castattacking = false;
        if info.deathsound != Sfx::None {
            self.sounds.push(info.deathsound);
        }
    }

    fn advance_cast_member(&mut self) {
        self.castnum = (self.castnum + 1) % CAST_ORDER.len();
        self.castdeath = false;
        let info = CAST_ORDER[self.castnum].kind.info();
        if info.seesound != Sfx::None {
            self.sounds.push(info.seesound);
        }
        self.caststate = info.seestate;
        self.castframes = 0;
    }

    fn cast_ticker(&mut self) {
        self.casttics -= 1;
        if self.casttics > 0 {
            return;
        }

        let st = self.caststate.info();
        if st.tics == -1 || st.next == StateId::NULL {
            // dead: bring in the next member
            self.advance_cast_member();
        } else {
            /* sound dubs for the walking/attacking frames */
            self.caststate = st.next;
            for &(state, sfx) in CAST_STATE_SFX {
                if self.caststate == state {
                    self.sounds.push(sfx);
                }
            }
            self.castframes += 1;

            let info = CAST_ORDER[self.castnum].kind.info();

            /* after 12 frames of walking, go into the attack */
            if self.castframes == 12 && !self.castdeath {
                self.castattacking = true;
                self.caststate = if self.castonmelee && info.meleestate != StateId::NULL {
                    info.meleestate
                } else if info.missilestate != StateId::NULL {
                    info.missilestate
                } else {
                    info.seestate
                };
                self.castonmelee = !self.castonmelee;
                if info.attacksound != Sfx::None {
                    self.sounds.push(info.attacksound);
                }
            }

            if self.castattacking
                && (self.castframes == 24 || self.caststate == info.seestate)
            {
                self.castattacking = false;
                self.castframes = 0;
                self.caststate = info.seestate;
            }
        }

        self.casttics = self.caststate.info().tics;
        if self.casttics == -1 {
            self.casttics = 15;
        }
    }

    /* ─────────────────────────── drawing ─────────────────────────────── */

    /// `F_Drawer`.
    pub fn draw(&self, canvas: &mut dyn UiCanvas) {
        match self.stage {
            Stage::Text => self.draw_text(canvas),
            Stage::ArtScreen => {
                if self.mode != GameMode::Commercial && self.episode == 3 {
                    self.draw_bunny(canvas);
                } else {
                    let credit = match self.mode {
                        GameMode::Shareware => "HELP2",
                        GameMode::Commercial => "CREDIT",
                        _ => "VICTORY2",
                    };
                    canvas.draw_patch(credit, 0, 0);
                }
            }
            Stage::Cast => {
                canvas.draw_patch("BOSSBACK", 0, 0);
                self.draw_string(canvas, 160, 180, CAST_ORDER[self.castnum].name);
                let st = self.caststate.info();
                // the cast member is drawn through its first rotation lump
                canvas.draw_patch(
                    &format!("{}{}0", st.sprite.name(), frame_letter(st.frame)),
                    160,
                    170,
                );
            }
        }
    }

    fn draw_text(&self, canvas: &mut dyn UiCanvas) {
        canvas.fill_flat(self.flat);
        let visible = ((self.count / TEXTSPEED).max(0) as usize).min(self.text.len());
        let shown: String = self.text.chars().take(visible).collect();

        let (mut cx, mut cy) = (10, 10);
        for ch in shown.chars() {
            if ch == '\n' {
                cx = 10;
                cy += 11;
                continue;
            }
            let up = ch.to_ascii_uppercase();
            if !(33..=95).contains(&(up as u8)) {
                cx += 4;
                continue;
            }
            canvas.draw_patch(&format!("STCFN{:03}", up as u8), cx, cy);
            cx += 8;
        }
    }

    fn draw_string(&self, canvas: &mut dyn UiCanvas, x: i32, y: i32, s: &str) {
        let mut cx = x - (s.len() as i32 * 8) / 2;
        for ch in s.chars() {
            let up = ch.to_ascii_uppercase();
            if (33..=95).contains(&(up as u8)) {
                canvas.draw_patch(&format!("STCFN{:03}", up as u8), cx, y);
            }
            cx += 8;
        }
    }

    /// The two-screen panorama with the END cutscene on top.
    fn draw_bunny(&self, canvas: &mut dyn UiCanvas) {
        let scrolled = (320 - (self.count - 230) / 2).clamp(0, 320);
        canvas.draw_patch("PFUB2", -scrolled, 0);
        canvas.draw_patch("PFUB1", 320 - scrolled, 0);

        if self.count < ENDCOUNT {
            return;
        }
        let stage = ((self.count - ENDCOUNT) / 5).min(6);
        canvas.draw_patch(&format!("END{stage}"), 108, 68);
    }
}

/// Frame index to sprite-lump letter.
fn frame_letter(frame: u16) -> char {
    (b'A' + (frame & crate::defs::states::FF_FRAMEMASK) as u8 % 29) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullCanvas;
    impl UiCanvas for NullCanvas {
        fn draw_patch(&mut self, _name: &str, _x: i32, _y: i32) {}
        fn fill_flat(&mut self, _name: &str) {}
    }

    #[test]
    fn text_stage_runs_its_clock_then_advances() {
        let mut fin = Finale::start(GameMode::Registered, 1, None);
        let ticks = fin.text.len() as i32 * TEXTSPEED + TEXTWAIT + 2;
        for _ in 0..ticks {
            fin.tick(&[TicCmd::default()]);
        }
        assert_eq!(fin.stage, Stage::ArtScreen);
    }

    #[test]
    fn commercial_text_leads_into_the_cast() {
        let mut fin = Finale::start(GameMode::Commercial, 0, None);
        let ticks = fin.text.len() as i32 * TEXTSPEED + TEXTWAIT + 2;
        for _ in 0..ticks {
            fin.tick(&[TicCmd::default()]);
        }
        assert_eq!(fin.stage, Stage::Cast);
    }

    #[test]
    fn cast_member_dies_and_the_next_walks_in() {
        let mut fin = Finale::start(GameMode::Commercial, 0, None);
        fin.start_cast();
        assert_eq!(fin.castnum, 0);
        assert!(fin.responder(), "cast consumes the event");
        // run the death animation to its end
        for _ in 0..20 * TICRATE {
            fin.tick(&[TicCmd::default()]);
            if fin.castnum != 0 {
                break;
            }
        }
        assert_eq!(fin.castnum, 1);
        assert!(!fin.castdeath);
    }

    #[test]
    fn dehacked_override_replaces_the_text() {
        let fin = Finale::start(GameMode::Registered, 1, Some("CUSTOM"));
        assert_eq!(fin.text, "CUSTOM");
    }

    #[test]
    fn bunny_panorama_draw_never_panics_late() {
        let mut fin = Finale::start(GameMode::Registered, 3, None);
        fin.stage = Stage::ArtScreen;
        fin.count = ENDCOUNT + 500;
        fin.draw(&mut NullCanvas);
    }
}
