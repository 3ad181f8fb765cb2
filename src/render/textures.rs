//! Graphics repository: palette, colormaps, flats, composite wall textures
//! and sprite frames, decoded once per WAD and addressed by id afterwards.
//!
//! The renderer never touches lump bytes; everything it samples comes from
//! this bank.

use crate::defs::{NUM_SPRITES, SPRITE_NAMES, SpriteId};
use crate::render::Pixel;
use crate::wad::{Wad, WadError};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use log::warn;
use std::collections::HashMap;
use thiserror::Error;

/// Runtime handle for a wall texture or flat in this bank.
pub type TextureId = u16;

/// Id 0 is reserved: the "-" / missing sentinel.
pub const NO_TEXTURE: TextureId = 0;

/// Number of diminishing-light colormap rows (row 32 is the invulnerability
/// inverse, row 33 the all-black row).
pub const NUM_COLORMAPS: usize = 32;
pub const INVERSE_COLORMAP: usize = 32;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error("PLAYPAL lump missing")]
    NoPalette,

    #[error("COLORMAP lump missing")]
    NoColormap,

    #[error("texture id {0} out of range")]
    BadId(TextureId),
}

/* ───────────────────────────── pixel data ─────────────────────────────── */

/// One vertical run of opaque pixels inside a masked column.
#[derive(Clone, Debug, Default)]
pub struct Post {
    pub topdelta: usize,
    pub pixels: Vec<u8>,
}

/// A patch-format graphic: masked columns plus draw offsets.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    pub width: usize,
    pub height: usize,
    pub leftoffset: i32,
    pub topoffset: i32,
    pub columns: Vec<Vec<Post>>,
}

/// A composited wall texture: full opaque columns for the common case plus
/// the post lists for masked mid-texture drawing.
#[derive(Clone, Debug, Default)]
pub struct WallTexture {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// column-major `width * height` palette indices
    pub opaque: Vec<u8>,
    pub columns: Vec<Vec<Post>>,
}

impl WallTexture {
    /// Borrow one opaque column.
    #[inline]
    pub fn column(&self, x: usize) -> &[u8] {
        let x = x % self.width.max(1);
        &self.opaque[x * self.height..(x + 1) * self.height]
    }
}

/// A 64x64 floor/ceiling tile, row-major.
#[derive(Clone, Debug)]
pub struct Flat {
    pub name: String,
    pub pixels: Vec<u8>,
}

/// One rotation set of a sprite frame.
#[derive(Clone, Copy, Debug)]
pub struct SpriteFrame {
    /// false = one lump covers all 8/16 view angles.
    pub rotate: bool,
    pub patch: [u16; 16],
    pub flip: [bool; 16],
}

impl Default for SpriteFrame {
    fn default() -> Self {
        Self {
            rotate: false,
            patch: [u16::MAX; 16],
            flip: [false; 16],
        }
    }
}

/// All frames of one sprite family.
#[derive(Clone, Debug, Default)]
pub struct SpriteDef {
    pub frames: Vec<SpriteFrame>,
}

/* ──────────────────────────── brightmaps ─────────────────────────────── */

/// Palette mask: 1 = pixel keeps full brightness regardless of sector light.
pub type Brightmap = [u8; 256];

/// Flame/energy palette ranges (reds, oranges, bright yellows).
pub static BRIGHT_FLAME: Brightmap = build_brightmap(&[(160, 167), (176, 191), (208, 231)]);

/// Only the saturated red range.
pub static BRIGHT_RED: Brightmap = build_brightmap(&[(176, 191)]);

const fn build_brightmap(ranges: &[(usize, usize)]) -> Brightmap {
    let mut map = [0u8; 256];
    let mut r = 0;
    while r < ranges.len() {
        let (lo, hi) = ranges[r];
        let mut i = lo;
        while i <= hi {
            map[i] = 1;
            i += 1;
        }
        r += 1;
    }
    map
}

/// Sprites that glow partially even in dark sectors.
pub fn sprite_brightmap(sprite: SpriteId) -> Option<&'static Brightmap> {
    match sprite {
        SpriteId::BAR1 | SpriteId::BEXP => Some(&BRIGHT_FLAME),
        SpriteId::POSS => Some(&BRIGHT_RED),
        _ => None,
    }
}

/* ─────────────────────────── the bank itself ─────────────────────────── */

pub struct TextureBank {
    /// RGB for palette 0 of PLAYPAL, as 0xAARRGGBB.
    pub palette: [Pixel; 256],
    /// 34 x 256 light-translation rows from COLORMAP.
    colormaps: Vec<[u8; 256]>,

    walls: Vec<WallTexture>,
    walls_by_name: HashMap<String, TextureId>,

    flats: Vec<Flat>,
    flats_by_name: HashMap<String, TextureId>,

    patches: Vec<Patch>,
    pub sprites: Vec<SpriteDef>,

    /// Player colour remaps (green range -> gray / brown / red).
    pub translations: [[u8; 256]; 3],
}

impl Default for TextureBank {
    fn default() -> Self {
        Self::empty()
    }
}

impl TextureBank {
    /// A bank with identity palette/colormaps and only the missing-texture
    /// sentinels - enough for headless simulation and tests.
    pub fn empty() -> Self {
        let mut palette = [0u32; 256];
        for (i, p) in palette.iter_mut().enumerate() {
            let g = i as u32;
            *p = 0xFF00_0000 | (g << 16) | (g << 8) | g;
        }
        let identity = {
            let mut row = [0u8; 256];
            for (i, v) in row.iter_mut().enumerate() {
                *v = i as u8;
            }
            row
        };

        let checker = WallTexture {
            name: "-".into(),
            width: 8,
            height: 8,
            opaque: (0..64)
                .map(|i| if (i / 8 ^ i % 8) & 1 == 0 { 96 } else { 103 })
                .collect(),
            columns: vec![Vec::new(); 8],
        };
        let checker_flat = Flat {
            name: "-".into(),
            pixels: (0..4096)
                .map(|i| if (i / 64 ^ i % 64) & 1 == 0 { 96u8 } else { 103 })
                .collect(),
        };

        let mut walls_by_name = HashMap::new();
        walls_by_name.insert("-".to_string(), NO_TEXTURE);
        let mut flats_by_name = HashMap::new();
        flats_by_name.insert("-".to_string(), NO_TEXTURE);

        let mut bank = Self {
            palette,
            colormaps: vec![identity; 34],
            walls: vec![checker],
            walls_by_name,
            flats: vec![checker_flat],
            flats_by_name,
            patches: Vec::new(),
            sprites: vec![SpriteDef::default(); NUM_SPRITES],
            translations: build_translations(),
        };
        // the sky sentinel always resolves, even without a WAD
        bank.insert_flat("F_SKY1", vec![0; 4096]);
        bank
    }

    /// Decode everything the renderer needs from `wad`.
    pub fn from_wad(wad: &Wad) -> Result<Self, TextureError> {
        let mut bank = Self::empty();
        bank.load_palette(wad)?;
        bank.load_colormaps(wad)?;
        bank.load_flats(wad);
        bank.load_walls(wad)?;
        bank.load_sprites(wad);
        Ok(bank)
    }

    /* ------------------------------ lookups ---------------------------- */

    #[inline]
    pub fn colormap(&self, row: usize) -> &[u8; 256] {
        &self.colormaps[row.min(self.colormaps.len() - 1)]
    }

    pub fn wall(&self, id: TextureId) -> &WallTexture {
        self.walls.get(id as usize).unwrap_or(&self.walls[0])
    }

    pub fn flat(&self, id: TextureId) -> &Flat {
        self.flats.get(id as usize).unwrap_or(&self.flats[0])
    }

    pub fn patch(&self, idx: u16) -> Option<&Patch> {
        self.patches.get(idx as usize)
    }

    pub fn num_walls(&self) -> usize {
        self.walls.len()
    }

    /// Resolve a wall texture name; "-" and unknown names map to the
    /// sentinel (unknowns with a warning).
    pub fn wall_id(&self, name: &str) -> TextureId {
        if name == "-" || name.is_empty() {
            return NO_TEXTURE;
        }
        match self.walls_by_name.get(&name.to_ascii_uppercase()) {
            Some(&id) => id,
            None => {
                warn!("unknown wall texture {name:?}");
                NO_TEXTURE
            }
        }
    }

    pub fn flat_id(&self, name: &str) -> TextureId {
        match self.flats_by_name.get(&name.to_ascii_uppercase()) {
            Some(&id) => id,
            None => {
                warn!("unknown flat {name:?}");
                NO_TEXTURE
            }
        }
    }

    /// Wall texture height in fixed units (for pegging math).
    pub fn wall_height(&self, id: TextureId) -> i32 {
        self.wall(id).height as i32
    }

    /* ------------------------------ inserts ---------------------------- */

    pub fn insert_flat(&mut self, name: &str, pixels: Vec<u8>) -> TextureId {
        let id = self.flats.len() as TextureId;
        self.flats.push(Flat {
            name: name.into(),
            pixels,
        });
        self.flats_by_name.insert(name.to_ascii_uppercase(), id);
        id
    }

    pub fn insert_wall(&mut self, tex: WallTexture) -> TextureId {
        let id = self.walls.len() as TextureId;
        self.walls_by_name.insert(tex.name.to_ascii_uppercase(), id);
        self.walls.push(tex);
        id
    }

    /* ------------------------------ loading ---------------------------- */

    fn load_palette(&mut self, wad: &Wad) -> Result<(), TextureError> {
        let idx = wad.find_lump("PLAYPAL").ok_or(TextureError::NoPalette)?;
        let bytes = wad.lump_bytes(idx)?;
        if bytes.len() < 768 {
            return Err(TextureError::NoPalette);
        }
        for i in 0..256 {
            let r = bytes[i * 3] as u32;
            let g = bytes[i * 3 + 1] as u32;
            let b = bytes[i * 3 + 2] as u32;
            self.palette[i] = 0xFF00_0000 | (r << 16) | (g << 8) | b;
        }
        Ok(())
    }

    fn load_colormaps(&mut self, wad: &Wad) -> Result<(), TextureError> {
        let idx = wad.find_lump("COLORMAP").ok_or(TextureError::NoColormap)?;
        let bytes = wad.lump_bytes(idx)?;
        self.colormaps.clear();
        for chunk in bytes.chunks_exact(256) {
            let mut row = [0u8; 256];
            row.copy_from_slice(chunk);
            self.colormaps.push(row);
        }
        if self.colormaps.is_empty() {
            return Err(TextureError::NoColormap);
        }
        Ok(())
    }

    fn load_flats(&mut self, wad: &Wad) {
        let Some(start) = wad.find_lump("F_START").or_else(|| wad.find_lump("FF_START")) else {
            return;
        };
        let Some(end) = wad.find_lump("F_END").or_else(|| wad.find_lump("FF_END")) else {
            return;
        };
        for i in start + 1..end {
            let Ok(bytes) = wad.lump_bytes(i) else {
                continue;
            };
            if bytes.len() != 4096 {
                continue; // nested markers etc.
            }
            let name = Wad::lump_name(&wad.lumps[i].name).to_owned();
            self.insert_flat(&name, bytes.to_vec());
        }
    }

    fn load_walls(&mut self, wad: &Wad) -> Result<(), TextureError> {
        /* PNAMES: patch number -> directory lump */
        let mut patch_lumps: Vec<Option<usize>> = Vec::new();
        if let Some(pn) = wad.find_lump("PNAMES") {
            let mut cur = wad.lump_bytes(pn)?;
            let count = cur.read_i32::<LE>().unwrap_or(0);
            for _ in 0..count {
                let mut name = [0u8; 8];
                if std::io::Read::read_exact(&mut cur, &mut name).is_err() {
                    break;
                }
                patch_lumps.push(wad.find_lump(Wad::lump_name(&name)));
            }
        }

        /* decode every referenced patch once */
        let mut patch_cache: HashMap<usize, u16> = HashMap::new();
        let mut decode_patch = |bank: &mut Self, lump: usize| -> Option<u16> {
            if let Some(&i) = patch_cache.get(&lump) {
                return Some(i);
            }
            let bytes = wad.lump_bytes(lump).ok()?;
            let patch = parse_patch(bytes)?;
            let idx = bank.patches.len() as u16;
            bank.patches.push(patch);
            patch_cache.insert(lump, idx);
            Some(idx)
        };

        for list in ["TEXTURE1", "TEXTURE2"] {
            let Some(t) = wad.find_lump(list) else {
                continue;
            };
            let bytes = wad.lump_bytes(t)?;
            let mut cur = bytes;
            let count = cur.read_i32::<LE>().unwrap_or(0).max(0) as usize;
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                offsets.push(cur.read_i32::<LE>().unwrap_or(0) as usize);
            }

            for off in offsets {
                if off + 22 > bytes.len() {
                    warn!("{list}: texture header out of bounds");
                    continue;
                }
                let mut cur = &bytes[off..];
                let mut name = [0u8; 8];
                std::io::Read::read_exact(&mut cur, &mut name).ok();
                let _masked = cur.read_i32::<LE>().unwrap_or(0);
                let width = cur.read_i16::<LE>().unwrap_or(0).max(1) as usize;
                let height = cur.read_i16::<LE>().unwrap_or(0).max(1) as usize;
                let _columndir = cur.read_i32::<LE>().unwrap_or(0);
                let patchcount = cur.read_i16::<LE>().unwrap_or(0).max(0) as usize;

                let mut opaque = vec![0u8; width * height];
                for _ in 0..patchcount {
                    let originx = cur.read_i16::<LE>().unwrap_or(0) as i32;
                    let originy = cur.read_i16::<LE>().unwrap_or(0) as i32;
                    let pnum = cur.read_i16::<LE>().unwrap_or(0) as usize;
                    let _stepdir = cur.read_i16::<LE>().unwrap_or(0);
                    let _colormap = cur.read_i16::<LE>().unwrap_or(0);

                    let Some(&Some(lump)) = patch_lumps.get(pnum).as_ref() else {
                        continue;
                    };
                    let Some(pidx) = decode_patch(self, *lump) else {
                        continue;
                    };
                    let patch = self.patches[pidx as usize].clone();
                    blit_patch(&mut opaque, width, height, &patch, originx, originy);
                }

                // regenerate posts from the composited columns
                let columns = (0..width)
                    .map(|x| posts_from_column(&opaque[x * height..(x + 1) * height]))
                    .collect();

                self.insert_wall(WallTexture {
                    name: Wad::lump_name(&name).to_owned(),
                    width,
                    height,
                    opaque,
                    columns,
                });
            }
        }
        Ok(())
    }

    fn load_sprites(&mut self, wad: &Wad) {
        let Some(start) = wad.find_lump("S_START").or_else(|| wad.find_lump("SS_START")) else {
            return;
        };
        let Some(end) = wad.find_lump("S_END").or_else(|| wad.find_lump("SS_END")) else {
            return;
        };

        let mut by_prefix: HashMap<&str, usize> = HashMap::new();
        for (i, n) in SPRITE_NAMES.iter().enumerate() {
            by_prefix.insert(n, i);
        }

        for i in start + 1..end {
            let name = Wad::lump_name(&wad.lumps[i].name).to_owned();
            if name.len() < 6 {
                continue;
            }
            let Some(&sprite) = by_prefix.get(&name[0..4]) else {
                continue;
            };
            let Ok(bytes) = wad.lump_bytes(i) else {
                continue;
            };
            let Some(patch) = parse_patch(bytes) else {
                warn!("sprite lump {name} is not a patch");
                continue;
            };
            let pidx = self.patches.len() as u16;
            self.patches.push(patch);

            let mut install = |bank: &mut Self, frame: usize, rot: usize, flip: bool| {
                let def = &mut bank.sprites[sprite];
                if def.frames.len() <= frame {
                    def.frames.resize(frame + 1, SpriteFrame::default());
                }
                let f = &mut def.frames[frame];
                if rot == 0 {
                    // one lump for all rotations
                    f.rotate = false;
                    for r in 0..16 {
                        f.patch[r] = pidx;
                        f.flip[r] = flip;
                    }
                } else {
                    f.rotate = true;
                    // rotations 1-8 occupy the even slots; 16-angle sets
                    // (A1 through G, suffix 9-G) fill the odd ones
                    let slot = rotation_slot(rot);
                    f.patch[slot] = pidx;
                    f.flip[slot] = flip;
                }
            };

            let frame = name.as_bytes()[4].wrapping_sub(b'A') as usize;
            let rot = rotation_index(name.as_bytes()[5]);
            if frame < 29 {
                if let Some(rot) = rot {
                    install(self, frame, rot, false);
                }
            }
            if name.len() >= 8 {
                let frame2 = name.as_bytes()[6].wrapping_sub(b'A') as usize;
                let rot2 = rotation_index(name.as_bytes()[7]);
                if frame2 < 29 {
                    if let Some(rot2) = rot2 {
                        install(self, frame2, rot2, true);
                    }
                }
            }
        }
    }
}

/* ────────────────────────────── helpers ──────────────────────────────── */

/// `'0'` = all rotations, `'1'..='8'` = eight buckets, `'9'..='G'` = the
/// sixteen-angle extension.
fn rotation_index(c: u8) -> Option<usize> {
    match c {
        b'0' => Some(0),
        b'1'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'G' => Some((c - b'A') as usize + 10),
        _ => None,
    }
}

/// Map a rotation number (1-16) onto its slot in the frame table.
fn rotation_slot(rot: usize) -> usize {
    if rot <= 8 {
        (rot - 1) * 2
    } else {
        (rot - 9) * 2 + 1
    }
}

/// Decode a patch-format lump; `None` when the header is inconsistent.
pub fn parse_patch(bytes: &[u8]) -> Option<Patch> {
    let mut cur = bytes;
    let width = cur.read_i16::<LE>().ok()?;
    let height = cur.read_i16::<LE>().ok()?;
    let leftoffset = cur.read_i16::<LE>().ok()? as i32;
    let topoffset = cur.read_i16::<LE>().ok()? as i32;
    if width <= 0 || height <= 0 || width > 2048 || height > 2048 {
        return None;
    }
    let (width, height) = (width as usize, height as usize);

    let mut columns = Vec::with_capacity(width);
    for x in 0..width {
        let off_pos = 8 + x * 4;
        if off_pos + 4 > bytes.len() {
            return None;
        }
        let mut off =
            u32::from_le_bytes(bytes[off_pos..off_pos + 4].try_into().unwrap()) as usize;
        let mut posts = Vec::new();
        loop {
            let &topdelta = bytes.get(off)?;
            if topdelta == 0xFF {
                break;
            }
            let &len = bytes.get(off + 1)?;
            let start = off + 3; // skip pad byte
            let end = start + len as usize;
            if end + 1 > bytes.len() {
                return None;
            }
            posts.push(Post {
                topdelta: topdelta as usize,
                pixels: bytes[start..end].to_vec(),
            });
            off = end + 1; // skip trailing pad
        }
        columns.push(posts);
    }

    Some(Patch {
        width,
        height,
        leftoffset,
        topoffset,
        columns,
    })
}

/// Composite one patch into a column-major opaque buffer.
fn blit_patch(
    opaque: &mut [u8],
    width: usize,
    height: usize,
    patch: &Patch,
    originx: i32,
    originy: i32,
) {
    for (px, posts) in patch.columns.iter().enumerate() {
        let x = originx + px as i32;
        if x < 0 || x >= width as i32 {
            continue;
        }
        let col = &mut opaque[x as usize * height..(x as usize + 1) * height];
        for post in posts {
            for (i, &pix) in post.pixels.iter().enumerate() {
                let y = originy + post.topdelta as i32 + i as i32;
                if (0..height as i32).contains(&y) {
                    col[y as usize] = pix;
                }
            }
        }
    }
}

/// Rebuild a post list from an opaque column (index 0 = transparent).
fn posts_from_column(col: &[u8]) -> Vec<Post> {
    let mut posts = Vec::new();
    let mut y = 0;
    while y < col.len() {
        if col[y] == 0 {
            y += 1;
            continue;
        }
        let start = y;
        while y < col.len() && col[y] != 0 && y - start < 254 {
            y += 1;
        }
        posts.push(Post {
            topdelta: start,
            pixels: col[start..y].to_vec(),
        });
    }
    posts
}

/// Green-range player colour translations (gray, brown, red).
fn build_translations() -> [[u8; 256]; 3] {
    let mut tables = [[0u8; 256]; 3];
    for (t, table) in tables.iter_mut().enumerate() {
        for i in 0..256 {
            table[i] = if (0x70..=0x7F).contains(&i) {
                // remap green ramp to gray / brown / red ramps
                ((0x60 + (t << 5)) + (i & 0xF)) as u8
            } else {
                i as u8
            };
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bank_has_sentinels() {
        let bank = TextureBank::empty();
        assert_eq!(bank.wall_id("-"), NO_TEXTURE);
        assert_eq!(bank.wall(NO_TEXTURE).width, 8);
        assert_eq!(bank.flat(NO_TEXTURE).pixels.len(), 4096);
    }

    #[test]
    fn patch_round_trip() {
        // 1x4 patch: one post at topdelta 1, two pixels
        let mut bytes = Vec::new();
        bytes.extend(1i16.to_le_bytes()); // width
        bytes.extend(4i16.to_le_bytes()); // height
        bytes.extend(0i16.to_le_bytes()); // leftoffset
        bytes.extend(0i16.to_le_bytes()); // topoffset
        bytes.extend(12u32.to_le_bytes()); // column 0 offset
        bytes.extend([1u8, 2, 0, 7, 9, 0, 0xFF]); // topdelta len pad px px pad end

        let patch = parse_patch(&bytes).expect("patch");
        assert_eq!(patch.width, 1);
        assert_eq!(patch.columns[0].len(), 1);
        assert_eq!(patch.columns[0][0].topdelta, 1);
        assert_eq!(patch.columns[0][0].pixels, vec![7, 9]);
    }

    #[test]
    fn posts_skip_transparent_runs() {
        let col = [0u8, 5, 6, 0, 0, 9];
        let posts = posts_from_column(&col);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].topdelta, 1);
        assert_eq!(posts[0].pixels, vec![5, 6]);
        assert_eq!(posts[1].topdelta, 5);
    }

    #[test]
    fn translations_touch_only_green_range() {
        let t = build_translations();
        for table in &t {
            for i in 0..0x70 {
                assert_eq!(table[i], i as u8);
            }
            assert_ne!(table[0x70], 0x70);
        }
    }

    #[test]
    fn brightmaps_flag_flame_ranges() {
        assert_eq!(BRIGHT_FLAME[180], 1);
        assert_eq!(BRIGHT_FLAME[10], 0);
        assert_eq!(BRIGHT_RED[180], 1);
        assert_eq!(BRIGHT_RED[220], 0);
    }
}
