//! Map loading: binary lumps to the runtime [`Level`].
//!
//! The steps run in a fixed order because later ones read earlier outputs:
//! format probe, blockmap decision, vertices, sectors, sidedefs, linedefs,
//! blockmap synthesis, subsectors, nodes, segs, group-lines, reject,
//! slime-trail removal, seg lengths.  Thing spawning is the simulation's
//! job; the loader only stores the raw records.

use crate::fixed::{FRACBITS, FRACUNIT, Fixed};
use crate::level::blockmap::Blockmap;
use crate::level::bsp::NF_SUBSECTOR;
use crate::level::{
    BOXBOTTOM, BOXLEFT, BOXRIGHT, BOXTOP, Level, Linedef, LinedefFlags, Node, Reject, Sector,
    Seg, Sidedef, SlopeType, Subsector, Vertex,
};
use crate::render::textures::TextureBank;
use crate::tables::{ANG60, ANGLETOFINESHIFT, angle_diff, fine_cosine, fine_sine, point_to_angle2_safe};
use crate::wad::{
    MapLinedef, MapNode, MapSector, MapSeg, MapSidedef, MapSubsector, MapThing, MapVertex,
    ML_BLOCKMAP, ML_LINEDEFS, ML_NODES, ML_REJECT, ML_SECTORS, ML_SEGS, ML_SIDEDEFS, ML_SSECTORS,
    ML_THINGS, ML_VERTEXES, NO_INDEX, Wad, WadError,
};
use log::{info, warn};
use thiserror::Error;

/// Maximum actor radius; sector block boxes grow by this margin.
pub const MAXRADIUS: Fixed = 32 * FRACUNIT;

#[derive(Error, Debug)]
pub enum LevelError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error("level marker idx {0} out of range")]
    MarkerOob(usize),

    #[error("map uses unsupported node format {0}")]
    UnsupportedFormat(&'static str),

    #[error("map has no {0}")]
    EmptyLump(&'static str),

    #[error("subsector {0} is not part of any sector")]
    OrphanSubsector(usize),

    #[error("{kind} {index} references missing {what} {target}")]
    BadReference {
        kind: &'static str,
        index: usize,
        what: &'static str,
        target: usize,
    },
}

/// Loader behaviour toggles.
#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    /// Always synthesise the blockmap, even when the lump is usable.
    pub rebuild_blockmap: bool,
    /// Pad a short reject with 0xFF (hide) instead of 0x00 (visible).
    pub reject_pad_ff: bool,
    /// Missing back sidedefs resolve to a zeroed sector (the portable
    /// stand-in for the original's wild pointer read).
    pub null_sector_zeroed: bool,
    /// Light-index swing for wall-orientation contrast; 0 disables.
    pub fake_contrast: i32,
    /// Interpolated contrast for near-axis walls; 0 = hard steps only.
    pub smooth_contrast: i32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            rebuild_blockmap: false,
            reject_pad_ff: false,
            null_sector_zeroed: true,
            fake_contrast: 1,
            smooth_contrast: 1,
        }
    }
}

/// Specials that legitimately carry no sector tag.
const TAGLESS_SPECIALS: &[u16] = &[1, 26, 27, 28, 31, 32, 33, 34, 48, 85, 117, 118];

/* ──────────────────────────── format probe ───────────────────────────── */

fn probe_format(wad: &Wad, marker: usize) -> Result<(), LevelError> {
    // Hexen maps carry a BEHAVIOR lump at the end of the block.
    if let Some(l) = wad.lumps.get(marker + 11) {
        if Wad::lump_name(&l.name) == "BEHAVIOR" {
            return Err(LevelError::UnsupportedFormat("Hexen"));
        }
    }
    if let Some(l) = wad.lumps.get(marker + ML_NODES) {
        if let Ok(bytes) = wad.lump_bytes(marker + ML_NODES) {
            if bytes.starts_with(b"xNd4\0\0\0\0") && l.size >= 8 {
                return Err(LevelError::UnsupportedFormat("DeePBSP"));
            }
            if bytes.starts_with(b"XNOD") {
                return Err(LevelError::UnsupportedFormat("ZDBSP"));
            }
            if bytes.starts_with(b"ZNOD") {
                return Err(LevelError::UnsupportedFormat("ZDBSP compressed"));
            }
        }
    }
    Ok(())
}

/* ─────────────────────────────── loader ──────────────────────────────── */

/// Load the map behind directory index `marker`.
pub fn load_level(
    wad: &Wad,
    marker: usize,
    bank: &TextureBank,
    opts: &LoadOptions,
) -> Result<Level, LevelError> {
    if marker + ML_BLOCKMAP >= wad.lumps.len() {
        return Err(LevelError::MarkerOob(marker));
    }
    let name = Wad::lump_name(&wad.lumps[marker].name).to_owned();

    /* 1. format probe ---------------------------------------------------- */
    probe_format(wad, marker)?;

    /* 2. blockmap usability decision -------------------------------------- */
    let blockmap_words = load_blockmap_words(wad, marker, opts);

    /* 3. vertices ---------------------------------------------------------- */
    let raw_vertices: Vec<MapVertex> = wad.lump_to_vec(marker + ML_VERTEXES)?;
    if raw_vertices.is_empty() {
        return Err(LevelError::EmptyLump("vertices"));
    }
    let mut vertices: Vec<Vertex> = raw_vertices
        .iter()
        .map(|v| Vertex {
            x: (v.x as Fixed) << FRACBITS,
            y: (v.y as Fixed) << FRACBITS,
            rx: (v.x as Fixed) << FRACBITS,
            ry: (v.y as Fixed) << FRACBITS,
            moved: false,
        })
        .collect();

    /* 4. sectors ----------------------------------------------------------- */
    let raw_sectors: Vec<MapSector> = wad.lump_to_vec(marker + ML_SECTORS)?;
    if raw_sectors.is_empty() {
        return Err(LevelError::EmptyLump("sectors"));
    }
    let mut sectors: Vec<Sector> = raw_sectors
        .iter()
        .map(|s| Sector {
            floorh: (s.floorh as Fixed) << FRACBITS,
            ceilh: (s.ceilh as Fixed) << FRACBITS,
            old_floorh: (s.floorh as Fixed) << FRACBITS,
            old_ceilh: (s.ceilh as Fixed) << FRACBITS,
            floorpic: bank.flat_id(name8(&s.floorpic)),
            ceilpic: bank.flat_id(name8(&s.ceilpic)),
            light: s.light,
            special: s.special,
            tag: s.tag,
            sound_org: (0, 0),
            blockbox: [0; 4],
            lines: Vec::new(),
        })
        .collect();

    /* 5. sidedefs ---------------------------------------------------------- */
    let raw_sides: Vec<MapSidedef> = wad.lump_to_vec(marker + ML_SIDEDEFS)?;
    let sidedefs: Vec<Sidedef> = raw_sides
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.sector as usize >= sectors.len() {
                return Err(LevelError::BadReference {
                    kind: "sidedef",
                    index: i,
                    what: "sector",
                    target: s.sector as usize,
                });
            }
            Ok(Sidedef {
                texoffset: (s.texoffset as Fixed) << FRACBITS,
                rowoffset: (s.rowoffset as Fixed) << FRACBITS,
                top: bank.wall_id(name8(&s.top)),
                bottom: bank.wall_id(name8(&s.bottom)),
                mid: bank.wall_id(name8(&s.mid)),
                sector: s.sector,
            })
        })
        .collect::<Result<_, _>>()?;

    /* 6. linedefs ---------------------------------------------------------- */
    let raw_lines: Vec<MapLinedef> = wad.lump_to_vec(marker + ML_LINEDEFS)?;
    if raw_lines.is_empty() {
        return Err(LevelError::EmptyLump("linedefs"));
    }
    let mut linedefs = Vec::with_capacity(raw_lines.len());
    for (i, ml) in raw_lines.iter().enumerate() {
        for v in [ml.v1, ml.v2] {
            if v as usize >= vertices.len() {
                return Err(LevelError::BadReference {
                    kind: "linedef",
                    index: i,
                    what: "vertex",
                    target: v as usize,
                });
            }
        }
        let v1 = &vertices[ml.v1 as usize];
        let v2 = &vertices[ml.v2 as usize];
        let dx = v2.x - v1.x;
        let dy = v2.y - v1.y;

        let slope = if dx == 0 {
            SlopeType::Vertical
        } else if dy == 0 {
            SlopeType::Horizontal
        } else if (dy ^ dx) >= 0 {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        };

        let bbox = [
            v1.y.max(v2.y),
            v1.y.min(v2.y),
            v1.x.min(v2.x),
            v1.x.max(v2.x),
        ];

        let side = |idx: u16| -> Option<u16> {
            if idx == NO_INDEX { None } else { Some(idx) }
        };
        let right_sidedef = side(ml.side[0]);
        let left_sidedef = side(ml.side[1]);

        if ml.special > 141 && ml.special != 271 && ml.special != 272 {
            warn!("{name}: linedef {i} has unknown special {}", ml.special);
        }
        if ml.special != 0 && ml.tag == 0 && !TAGLESS_SPECIALS.contains(&ml.special) {
            warn!("{name}: linedef {i} special {} has no tag", ml.special);
        }

        let sector_of = |sd: Option<u16>| -> Result<Option<u16>, LevelError> {
            match sd {
                None => Ok(None),
                Some(s) => {
                    let s = s as usize;
                    if s >= sidedefs.len() {
                        return Err(LevelError::BadReference {
                            kind: "linedef",
                            index: i,
                            what: "sidedef",
                            target: s,
                        });
                    }
                    Ok(Some(sidedefs[s].sector))
                }
            }
        };

        linedefs.push(Linedef {
            v1: ml.v1,
            v2: ml.v2,
            dx,
            dy,
            flags: LinedefFlags::from_bits_truncate(ml.flags),
            special: ml.special as i16,
            tag: ml.tag as i16,
            right_sidedef,
            left_sidedef,
            front_sector: sector_of(right_sidedef)?.unwrap_or(0),
            back_sector: sector_of(left_sidedef)?,
            bbox,
            slope,
        });
    }

    /* 7. blockmap synthesis when needed ------------------------------------ */
    let blockmap = match blockmap_words {
        Some(words) => Blockmap::from_words(&words, false)
            .unwrap_or_else(|| Blockmap::build(&vertices, &linedefs)),
        None => Blockmap::build(&vertices, &linedefs),
    };

    /* 8. subsectors, nodes, segs ------------------------------------------- */
    let raw_subs: Vec<MapSubsector> = wad.lump_to_vec(marker + ML_SSECTORS)?;
    if raw_subs.is_empty() {
        return Err(LevelError::EmptyLump("subsectors"));
    }

    let raw_nodes: Vec<MapNode> = wad.lump_to_vec(marker + ML_NODES)?;
    let nodes: Vec<Node> = raw_nodes
        .iter()
        .map(|n| {
            let child = |c: u16| -> i32 {
                if c == NO_INDEX {
                    return -1;
                }
                if c & 0x8000 != 0 {
                    let mut ss = (c & 0x7FFF) as i32;
                    if ss as usize >= raw_subs.len() {
                        ss = 0;
                    }
                    ss | NF_SUBSECTOR
                } else {
                    c as i32
                }
            };
            Node {
                x: (n.x as Fixed) << FRACBITS,
                y: (n.y as Fixed) << FRACBITS,
                dx: (n.dx as Fixed) << FRACBITS,
                dy: (n.dy as Fixed) << FRACBITS,
                bbox: [
                    [
                        (n.bbox[0][0] as Fixed) << FRACBITS,
                        (n.bbox[0][1] as Fixed) << FRACBITS,
                        (n.bbox[0][2] as Fixed) << FRACBITS,
                        (n.bbox[0][3] as Fixed) << FRACBITS,
                    ],
                    [
                        (n.bbox[1][0] as Fixed) << FRACBITS,
                        (n.bbox[1][1] as Fixed) << FRACBITS,
                        (n.bbox[1][2] as Fixed) << FRACBITS,
                        (n.bbox[1][3] as Fixed) << FRACBITS,
                    ],
                ],
                children: [child(n.children[0]), child(n.children[1])],
            }
        })
        .collect();

    let raw_segs: Vec<MapSeg> = wad.lump_to_vec(marker + ML_SEGS)?;
    if raw_segs.is_empty() {
        return Err(LevelError::EmptyLump("segs"));
    }

    let mut null_sector: Option<u16> = None;
    let mut segs = Vec::with_capacity(raw_segs.len());
    for (i, ms) in raw_segs.iter().enumerate() {
        let line_idx = ms.linedef as usize;
        if line_idx >= linedefs.len() {
            return Err(LevelError::BadReference {
                kind: "seg",
                index: i,
                what: "linedef",
                target: line_idx,
            });
        }
        let ld = &linedefs[line_idx];
        let side = (ms.side != 0) as usize;

        let front_sd = if side == 0 {
            ld.right_sidedef
        } else {
            ld.left_sidedef
        };
        let front_sector = front_sd.map(|s| sidedefs[s as usize].sector).unwrap_or(0);

        let back_sector = if ld.flags.contains(LinedefFlags::TWO_SIDED) {
            let other = if side == 0 {
                ld.left_sidedef
            } else {
                ld.right_sidedef
            };
            match other {
                Some(sd) => Some(sidedefs[sd as usize].sector),
                None => {
                    // sloppy map: two-sided flag without a second side
                    warn!(
                        "{name}: linedef {line_idx} is two-sided but has no second sidedef"
                    );
                    if opts.null_sector_zeroed {
                        Some(*null_sector.get_or_insert_with(|| {
                            let id = sectors.len() as u16;
                            sectors.push(zeroed_sector());
                            id
                        }))
                    } else {
                        None
                    }
                }
            }
        } else {
            None
        };

        segs.push(Seg {
            v1: ms.v1,
            v2: ms.v2,
            offset: (ms.offset as Fixed) << FRACBITS,
            angle: (ms.angle as u16 as u32) << 16,
            linedef: ms.linedef,
            side: side as u8,
            front_sector,
            back_sector,
            length: 0,
            r_angle: 0,
            fakecontrast: 0,
        });
    }

    let subsectors: Vec<Subsector> = raw_subs
        .iter()
        .map(|s| Subsector {
            sector: 0, // grouped below
            first_seg: s.firstseg,
            num_segs: s.numsegs,
        })
        .collect();

    let mut level = Level {
        name,
        things: wad.lump_to_vec::<MapThing>(marker + ML_THINGS)?,
        vertices,
        linedefs,
        sidedefs,
        sectors,
        subsectors,
        segs,
        nodes,
        blockmap,
        reject: Reject::default(),
        sky_flat: bank.flat_id("F_SKY1"),
    };

    /* 9. group lines ------------------------------------------------------- */
    group_lines(&mut level)?;

    /* 10. reject ----------------------------------------------------------- */
    level.reject = load_reject(wad, marker, level.sectors.len(), opts);

    /* 11. slime trails ------------------------------------------------------ */
    remove_slime_trails(&mut level);

    /* 12. seg lengths + render angles + fake contrast ----------------------- */
    seg_lengths(&mut level, false, opts);

    info!(
        "{}: {} lines, {} sectors, {} segs, {} things{}",
        level.name,
        level.linedefs.len(),
        level.sectors.len(),
        level.segs.len(),
        level.things.len(),
        if level.blockmap.built { ", blockmap built" } else { "" },
    );

    Ok(level)
}

/* ─────────────────────────── pipeline steps ──────────────────────────── */

fn name8(raw: &[u8; 8]) -> &str {
    Wad::lump_name(raw)
}

fn zeroed_sector() -> Sector {
    Sector {
        floorh: 0,
        ceilh: 0,
        old_floorh: 0,
        old_ceilh: 0,
        floorpic: 0,
        ceilpic: 0,
        light: 0,
        special: 0,
        tag: 0,
        sound_org: (0, 0),
        blockbox: [0; 4],
        lines: Vec::new(),
    }
}

/// Fetch and byte-swap the BLOCKMAP lump, or `None` when it must be rebuilt.
fn load_blockmap_words(wad: &Wad, marker: usize, opts: &LoadOptions) -> Option<Vec<i16>> {
    if opts.rebuild_blockmap {
        return None;
    }
    let idx = marker + ML_BLOCKMAP;
    let bytes = wad.lump_bytes(idx).ok()?;
    let count = bytes.len() / 2;
    if bytes.len() < 8 || count >= 0x10000 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect(),
    )
}

/// Assign subsector sectors, build per-sector line tables, bounding boxes
/// and block boxes.
fn group_lines(level: &mut Level) -> Result<(), LevelError> {
    for i in 0..level.subsectors.len() {
        let ss = level.subsectors[i];
        let mut sector = None;
        for j in 0..ss.num_segs {
            let seg = &level.segs[(ss.first_seg + j) as usize];
            let ld = &level.linedefs[seg.linedef as usize];
            let sd = if seg.side == 0 {
                ld.right_sidedef
            } else {
                ld.left_sidedef
            };
            if let Some(sd) = sd {
                sector = Some(level.sidedefs[sd as usize].sector);
                break;
            }
        }
        level.subsectors[i].sector = sector.ok_or(LevelError::OrphanSubsector(i))?;
    }

    for i in 0..level.linedefs.len() {
        let front = level.linedefs[i].front_sector;
        let back = level.linedefs[i].back_sector;
        level.sectors[front as usize].lines.push(i as u16);
        if let Some(back) = back {
            if back != front {
                level.sectors[back as usize].lines.push(i as u16);
            }
        }
    }

    let bm = &level.blockmap;
    for sector in level.sectors.iter_mut() {
        let mut bbox = [Fixed::MIN, Fixed::MAX, Fixed::MAX, Fixed::MIN];
        for &li in &sector.lines {
            let ld = &level.linedefs[li as usize];
            for v in [ld.v1, ld.v2] {
                let v = &level.vertices[v as usize];
                bbox[BOXTOP] = bbox[BOXTOP].max(v.y);
                bbox[BOXBOTTOM] = bbox[BOXBOTTOM].min(v.y);
                bbox[BOXLEFT] = bbox[BOXLEFT].min(v.x);
                bbox[BOXRIGHT] = bbox[BOXRIGHT].max(v.x);
            }
        }
        if sector.lines.is_empty() {
            bbox = [0; 4];
        }

        sector.sound_org = (
            ((bbox[BOXLEFT] as i64 + bbox[BOXRIGHT] as i64) >> 1) as Fixed,
            ((bbox[BOXBOTTOM] as i64 + bbox[BOXTOP] as i64) >> 1) as Fixed,
        );

        let clamp_h = |v: i64| -> i32 { v.clamp(0, bm.height as i64 - 1) as i32 };
        let clamp_w = |v: i64| -> i32 { v.clamp(0, bm.width as i64 - 1) as i32 };
        let shift = crate::level::MAPBLOCKSHIFT;
        sector.blockbox[BOXTOP] =
            clamp_h((bbox[BOXTOP] as i64 - bm.origin_y as i64 + MAXRADIUS as i64) >> shift);
        sector.blockbox[BOXBOTTOM] =
            clamp_h((bbox[BOXBOTTOM] as i64 - bm.origin_y as i64 - MAXRADIUS as i64) >> shift);
        sector.blockbox[BOXRIGHT] =
            clamp_w((bbox[BOXRIGHT] as i64 - bm.origin_x as i64 + MAXRADIUS as i64) >> shift);
        sector.blockbox[BOXLEFT] =
            clamp_w((bbox[BOXLEFT] as i64 - bm.origin_x as i64 - MAXRADIUS as i64) >> shift);
    }
    Ok(())
}

/// Load the reject matrix, padding short lumps.
fn load_reject(wad: &Wad, marker: usize, num_sectors: usize, opts: &LoadOptions) -> Reject {
    let needed = (num_sectors * num_sectors + 7) / 8;
    let mut bytes = wad
        .lump_bytes(marker + ML_REJECT)
        .map(|b| b.to_vec())
        .unwrap_or_default();
    if bytes.len() < needed {
        warn!(
            "reject lump short by {} bytes, padding with {}",
            needed - bytes.len(),
            if opts.reject_pad_ff { "0xff" } else { "0x00" },
        );
        bytes.resize(needed, if opts.reject_pad_ff { 0xFF } else { 0x00 });
    }
    Reject::new(bytes, num_sectors)
}

/// Project interior seg vertices onto their linedef; render-only.
fn remove_slime_trails(level: &mut Level) {
    for i in 0..level.segs.len() {
        let seg = level.segs[i];
        let ld = &level.linedefs[seg.linedef as usize];

        // exactly vertical or horizontal linedefs cannot produce trails
        if ld.dx == 0 || ld.dy == 0 {
            continue;
        }

        let dxf = (ld.dx >> FRACBITS) as i64;
        let dyf = (ld.dy >> FRACBITS) as i64;
        let dx2 = dxf * dxf;
        let dy2 = dyf * dyf;
        let dxy = dxf * dyf;
        let s = dx2 + dy2;

        let lv1 = level.vertices[ld.v1 as usize];

        for vid in [seg.v1, seg.v2] {
            if vid == ld.v1 || vid == ld.v2 {
                // endpoint updates would move real geometry
                continue;
            }
            let v = &mut level.vertices[vid as usize];
            if v.moved {
                continue;
            }
            v.moved = true;

            let ox = v.x as i64;
            let oy = v.y as i64;
            let rx = ((dx2 * ox + dy2 * lv1.x as i64 + dxy * (oy - lv1.y as i64)) / s) as Fixed;
            let ry = ((dy2 * oy + dx2 * lv1.y as i64 + dxy * (ox - lv1.x as i64)) / s) as Fixed;

            if (rx - v.x).abs() <= 8 * FRACUNIT && (ry - v.y).abs() <= 8 * FRACUNIT {
                v.rx = rx;
                v.ry = ry;
            }
        }
    }
}

/// Compute seg lengths, stable render angles and fake-contrast deltas.
/// With `contrast_only` the lengths and angles are left untouched.
pub fn seg_lengths(level: &mut Level, contrast_only: bool, opts: &LoadOptions) {
    let rightangle = fine_sine(((ANG60 / 2) >> ANGLETOFINESHIFT) as usize).abs();
    let fakecont_val = opts.fake_contrast;
    let smoothlit_val = if opts.fake_contrast != 0 {
        opts.smooth_contrast
    } else {
        0
    };

    for i in 0..level.segs.len() {
        let (v1, v2) = {
            let s = &level.segs[i];
            (
                level.vertices[s.v1 as usize],
                level.vertices[s.v2 as usize],
            )
        };
        let dx = v2.rx as i64 - v1.rx as i64;
        let dy = v2.ry as i64 - v1.ry as i64;

        if !contrast_only {
            let dist = ((dx * dx + dy * dy) as u64).isqrt();
            let seg = &mut level.segs[i];
            seg.length = (dist / 2) as u32;

            // recompute the angle the renderer uses; fall back to the map
            // angle when they diverge wildly (degenerate micro-segs)
            let new_angle = point_to_angle2_safe(v1.rx, v1.ry, v2.rx, v2.ry);
            seg.r_angle = if angle_diff(new_angle, seg.angle) > ANG60 / 2 {
                seg.angle
            } else {
                new_angle
            };
        }

        let seg = &mut level.segs[i];
        let shifted = (seg.r_angle >> ANGLETOFINESHIFT) as usize;
        let sine_val = fine_sine(shifted).abs();
        let cosine_val = fine_cosine(shifted).abs();

        let fc = if dy == 0 {
            -fakecont_val
        } else if sine_val < rightangle {
            -smoothlit_val + smoothlit_val * sine_val / rightangle
        } else if dx == 0 {
            fakecont_val
        } else if cosine_val < rightangle {
            smoothlit_val - smoothlit_val * cosine_val / rightangle
        } else {
            0
        };
        seg.fakecontrast = fc as i16;
    }
}

/* ────────────────────────────── tests ────────────────────────────────── */

#[cfg(test)]
pub mod fixture {
    //! A tiny but complete synthetic map: one square sector, 64 units high,
    //! with a proper BSP (one node, two subsectors is overkill - a single
    //! subsector with four segs and a degenerate node suffices for the
    //! traversal code).

    use super::*;
    use crate::wad::fixture::build_wad;

    pub fn le16(v: i16) -> [u8; 2] {
        v.to_le_bytes()
    }

    /// Square map: vertices (0,0) (256,0) (256,256) (0,256), one sector,
    /// four one-sided lines, one subsector holding four segs, one node.
    pub fn square_map_wad() -> Wad {
        let mut vertexes = Vec::new();
        for (x, y) in [(0i16, 0i16), (256, 0), (256, 256), (0, 256)] {
            vertexes.extend(le16(x));
            vertexes.extend(le16(y));
        }

        // sector: floor 0, ceil 128, light 160
        let mut sectors = Vec::new();
        sectors.extend(le16(0));
        sectors.extend(le16(128));
        sectors.extend(*b"FLAT5\0\0\0");
        sectors.extend(*b"CEIL3_5\0");
        sectors.extend(le16(160));
        sectors.extend(le16(0));
        sectors.extend(le16(0));

        // one sidedef per line, all facing sector 0
        let mut sidedefs = Vec::new();
        for _ in 0..4 {
            sidedefs.extend(le16(0));
            sidedefs.extend(le16(0));
            sidedefs.extend(*b"-\0\0\0\0\0\0\0");
            sidedefs.extend(*b"-\0\0\0\0\0\0\0");
            sidedefs.extend(*b"STARTAN3");
            sidedefs.extend(le16(0));
        }

        // lines wound clockwise so the right side faces inward
        let mut linedefs = Vec::new();
        for (v1, v2) in [(0u16, 3u16), (3, 2), (2, 1), (1, 0)] {
            linedefs.extend(le16(v1 as i16));
            linedefs.extend(le16(v2 as i16));
            linedefs.extend(le16(1)); // blocking
            linedefs.extend(le16(0));
            linedefs.extend(le16(0));
            linedefs.extend(le16(0)); // right side
            linedefs.extend(le16(NO_INDEX as i16)); // no left side
        }
        // fix sidedef indices: line i uses sidedef i
        for i in 0..4usize {
            let off = i * 14 + 10;
            linedefs[off..off + 2].copy_from_slice(&le16(i as i16));
        }

        // segs matching the lines
        let mut segs = Vec::new();
        for (i, (v1, v2)) in [(0u16, 3u16), (3, 2), (2, 1), (1, 0)].iter().enumerate() {
            segs.extend(le16(*v1 as i16));
            segs.extend(le16(*v2 as i16));
            segs.extend(le16(0)); // angle (unused by tests)
            segs.extend(le16(i as i16)); // linedef
            segs.extend(le16(0)); // side 0
            segs.extend(le16(0)); // offset
        }

        // single subsector holding all four segs
        let mut ssectors = Vec::new();
        ssectors.extend(le16(4));
        ssectors.extend(le16(0));

        // one node whose both children are subsector 0
        let mut nodes = Vec::new();
        nodes.extend(le16(128)); // x
        nodes.extend(le16(0)); // y
        nodes.extend(le16(0)); // dx
        nodes.extend(le16(128)); // dy
        for _ in 0..2 {
            nodes.extend(le16(256)); // top
            nodes.extend(le16(0)); // bottom
            nodes.extend(le16(0)); // left
            nodes.extend(le16(256)); // right
        }
        nodes.extend((0x8000u16).to_le_bytes());
        nodes.extend((0x8000u16).to_le_bytes());

        // player 1 start in the middle
        let mut things = Vec::new();
        things.extend(le16(128));
        things.extend(le16(128));
        things.extend(le16(0));
        things.extend(le16(1));
        things.extend(le16(0x07));

        Wad::from_bytes(build_wad(&[
            ("E1M1", vec![]),
            ("THINGS", things),
            ("LINEDEFS", linedefs),
            ("SIDEDEFS", sidedefs),
            ("VERTEXES", vertexes),
            ("SEGS", segs),
            ("SSECTORS", ssectors),
            ("NODES", nodes),
            ("SECTORS", sectors),
            ("REJECT", vec![0]),
            ("BLOCKMAP", vec![]), // too short: forces a rebuild
        ]))
        .unwrap()
    }

    pub fn load_square() -> Level {
        let wad = square_map_wad();
        let bank = TextureBank::empty();
        load_level(&wad, 0, &bank, &LoadOptions::default()).expect("square map loads")
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::load_square;
    use super::*;

    #[test]
    fn square_map_loads_and_groups() {
        let level = fixture::load_square();
        assert_eq!(level.sectors.len(), 1);
        assert_eq!(level.subsectors[0].sector, 0);
        assert_eq!(level.sectors[0].lines.len(), 4);
        assert!(level.blockmap.built, "empty lump must trigger a rebuild");
    }

    #[test]
    fn locate_subsector_inside_square() {
        let level = load_square();
        assert_eq!(level.locate_subsector(128 * FRACUNIT, 128 * FRACUNIT), 0);
        assert_eq!(level.sector_at(10 * FRACUNIT, 200 * FRACUNIT), 0);
    }

    #[test]
    fn seg_lengths_and_contrast() {
        let level = load_square();
        // every edge is 256 units; length is stored halved in whole units
        for seg in &level.segs {
            assert_eq!(seg.length >> FRACBITS, 128);
        }
        // vertical walls brighten, horizontal walls darken
        let vertical = level
            .segs
            .iter()
            .find(|s| level.linedefs[s.linedef as usize].dx == 0)
            .unwrap();
        let horizontal = level
            .segs
            .iter()
            .find(|s| level.linedefs[s.linedef as usize].dy == 0)
            .unwrap();
        assert_eq!(vertical.fakecontrast, 1);
        assert_eq!(horizontal.fakecontrast, -1);
    }

    #[test]
    fn reject_pads_and_answers() {
        let level = load_square();
        assert!(!level.reject.is_hidden(0, 0));
    }

    #[test]
    fn things_survive_loading() {
        let level = load_square();
        assert_eq!(level.things.len(), 1);
        assert_eq!(level.things[0].kind, 1);
        assert_eq!(level.things[0].x, 128);
    }

    #[test]
    fn missing_marker_is_reported() {
        let wad = fixture::square_map_wad();
        assert!(matches!(
            load_level(&wad, 500, &TextureBank::empty(), &LoadOptions::default()),
            Err(LevelError::MarkerOob(500))
        ));
    }
}
