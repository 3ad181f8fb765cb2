//! Sound-effect and music identifiers plus their static descriptors.

/// One sfx descriptor.  `link` redirects to another effect, carrying its
/// own volume delta and fixed pitch (the chaingun reuses the pistol sample).
#[derive(Clone, Copy, Debug)]
pub struct SfxInfo {
    pub name: &'static str,
    /// Only one instance may play at a time.
    pub singularity: bool,
    /// Higher value = easier to evict.
    pub priority: i32,
    pub link: Option<Sfx>,
    /// Fixed pitch when linked; -1 = normal.
    pub pitch: i32,
    /// Volume delta applied when reached through a link.
    pub volume: i32,
}

macro_rules! sfx {
    ($( $id:ident : $name:literal, $sing:expr, $prio:expr, $link:expr, $pitch:expr, $vol:expr ; )+) => {
        /// Sound effect ids.  `None` is the silent sentinel.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum Sfx {
            $($id),+
        }

        pub const SFX: &[SfxInfo] = &[
            $(SfxInfo {
                name: $name,
                singularity: $sing,
                priority: $prio,
                link: $link,
                pitch: $pitch,
                volume: $vol,
            }),+
        ];

        pub const NUM_SFX: usize = SFX.len();
    };
}

impl Sfx {
    #[inline]
    pub fn info(self) -> &'static SfxInfo {
        &SFX[self as usize]
    }
}

sfx! {
    None:   "none",   false,   0, Option::None, -1, 0;
    pistol: "pistol", false,  64, Option::None, -1, 0;
    shotgn: "shotgn", false,  64, Option::None, -1, 0;
    sgcock: "sgcock", false,  64, Option::None, -1, 0;
    dshtgn: "dshtgn", false,  64, Option::None, -1, 0;
    dbopn:  "dbopn",  false,  64, Option::None, -1, 0;
    dbcls:  "dbcls",  false,  64, Option::None, -1, 0;
    dbload: "dbload", false,  64, Option::None, -1, 0;
    plasma: "plasma", false,  64, Option::None, -1, 0;
    bfg:    "bfg",    false,  64, Option::None, -1, 0;
    sawup:  "sawup",  false,  64, Option::None, -1, 0;
    sawidl: "sawidl", false, 118, Option::None, -1, 0;
    sawful: "sawful", false,  64, Option::None, -1, 0;
    sawhit: "sawhit", false,  64, Option::None, -1, 0;
    rlaunc: "rlaunc", false,  64, Option::None, -1, 0;
    rxplod: "rxplod", false,  70, Option::None, -1, 0;
    firsht: "firsht", false,  70, Option::None, -1, 0;
    firxpl: "firxpl", false,  70, Option::None, -1, 0;
    telept: "telept", false,  32, Option::None, -1, 0;
    posit1: "posit1", true,   98, Option::None, -1, 0;
    posit2: "posit2", true,   98, Option::None, -1, 0;
    posit3: "posit3", true,   98, Option::None, -1, 0;
    bgsit1: "bgsit1", true,   98, Option::None, -1, 0;
    bgsit2: "bgsit2", true,   98, Option::None, -1, 0;
    sklatk: "sklatk", false,  70, Option::None, -1, 0;
    popain: "popain", false,  96, Option::None, -1, 0;
    dmpain: "dmpain", false,  96, Option::None, -1, 0;
    plpain: "plpain", false,  96, Option::None, -1, 0;
    slop:   "slop",   false,  78, Option::None, -1, 0;
    itemup: "itemup", true,   78, Option::None, -1, 0;
    wpnup:  "wpnup",  true,   78, Option::None, -1, 0;
    oof:    "oof",    false,  96, Option::None, -1, 0;
    noway:  "noway",  false,  78, Option::None, -1, 0;
    barexp: "barexp", false,  70, Option::None, -1, 0;
    punch:  "punch",  false,  64, Option::None, -1, 0;
    podth1: "podth1", false,  70, Option::None, -1, 0;
    podth2: "podth2", false,  70, Option::None, -1, 0;
    podth3: "podth3", false,  70, Option::None, -1, 0;
    bgdth1: "bgdth1", false,  70, Option::None, -1, 0;
    bgdth2: "bgdth2", false,  70, Option::None, -1, 0;
    pldeth: "pldeth", false,  32, Option::None, -1, 0;
    pdiehi: "pdiehi", false,  32, Option::None, -1, 0;
    posact: "posact", true,  120, Option::None, -1, 0;
    bgact:  "bgact",  true,  120, Option::None, -1, 0;
    dmact:  "dmact",  true,  120, Option::None, -1, 0;
    itmbk:  "itmbk",  false, 100, Option::None, -1, 0;
    pstop:  "pstop",  false, 100, Option::None, -1, 0;
    tink:   "tink",   false,  60, Option::None, -1, 0;
    chgun:  "chgun",  false,  64, Some(Sfx::pistol), 150, 0;
}

macro_rules! music {
    ($( $id:ident : $name:literal ; )+) => {
        /// Music ids.  `None` is the silent sentinel.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum Music {
            $($id),+
        }

        pub const MUSIC_NAMES: &[&str] = &[$($name),+];

        pub const NUM_MUSIC: usize = MUSIC_NAMES.len();
    };
}

impl Music {
    /// Lump name is `D_` + this.
    #[inline]
    pub fn name(self) -> &'static str {
        MUSIC_NAMES[self as usize]
    }

    pub fn from_index(i: usize) -> Option<Music> {
        if i == 0 || i >= NUM_MUSIC {
            return Option::None;
        }
        // ids are contiguous; the table defines the order
        Some(unsafe { std::mem::transmute::<u16, Music>(i as u16) })
    }
}

music! {
    None:   "none";
    // Doom 1 episodes 1-3 (episode 4 borrows, see the selection table)
    e1m1:   "e1m1"; e1m2: "e1m2"; e1m3: "e1m3"; e1m4: "e1m4"; e1m5: "e1m5";
    e1m6:   "e1m6"; e1m7: "e1m7"; e1m8: "e1m8"; e1m9: "e1m9";
    e2m1:   "e2m1"; e2m2: "e2m2"; e2m3: "e2m3"; e2m4: "e2m4"; e2m5: "e2m5";
    e2m6:   "e2m6"; e2m7: "e2m7"; e2m8: "e2m8"; e2m9: "e2m9";
    e3m1:   "e3m1"; e3m2: "e3m2"; e3m3: "e3m3"; e3m4: "e3m4"; e3m5: "e3m5";
    e3m6:   "e3m6"; e3m7: "e3m7"; e3m8: "e3m8"; e3m9: "e3m9";
    inter:  "inter"; intro: "intro"; bunny: "bunny"; victor: "victor";
    introa: "introa";
    // Doom 2
    runnin: "runnin"; stalks: "stalks"; countd: "countd"; betwee: "betwee";
    doom:   "doom";   the_da: "the_da"; shawn:  "shawn";  ddtblu: "ddtblu";
    in_cit: "in_cit"; dead:   "dead";   stlks2: "stlks2"; theda2: "theda2";
    doom2:  "doom2";  ddtbl2: "ddtbl2"; runni2: "runni2"; dead2:  "dead2";
    stlks3: "stlks3"; romero: "romero"; shawn2: "shawn2"; messag: "messag";
    count2: "count2"; ddtbl3: "ddtbl3"; ampie:  "ampie";  theda3: "theda3";
    adrian: "adrian"; messg2: "messg2"; romer2: "romer2"; tense:  "tense";
    shawn3: "shawn3"; openin: "openin"; evil:   "evil";   ultima: "ultima";
    read_m: "read_m"; dm2ttl: "dm2ttl"; dm2int: "dm2int";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chaingun_links_to_pistol() {
        let info = Sfx::chgun.info();
        assert_eq!(info.link, Some(Sfx::pistol));
        assert_eq!(info.pitch, 150);
    }

    #[test]
    fn music_index_round_trip() {
        assert_eq!(Music::from_index(Music::e1m1 as usize), Some(Music::e1m1));
        assert_eq!(Music::from_index(Music::runnin as usize), Some(Music::runnin));
        assert_eq!(Music::from_index(0), Option::None);
        assert_eq!(Music::from_index(NUM_MUSIC + 3), Option::None);
    }

    #[test]
    fn silent_sentinel_first() {
        assert_eq!(Sfx::None as usize, 0);
        assert_eq!(SFX[0].priority, 0);
    }
}
