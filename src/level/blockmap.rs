//! Broad-phase collision grid: 128-unit blocks with per-block line lists.
//!
//! Loaded from the `BLOCKMAP` lump when it is usable, otherwise synthesised
//! by stepping every linedef through the grid.  Both paths produce the same
//! word layout (`[orgx, orgy, width, height, offsets.., lists..]`) and then
//! share one decode step, so a built map behaves exactly like a loaded one.

use crate::fixed::{FRACBITS, FRACUNIT, Fixed};
use crate::level::{Linedef, LinedefId, Vertex};
use log::info;

/// Block edge length in map units.
pub const MAPBLOCKUNITS: i32 = 128;
/// World-fixed to block index shift.
pub const MAPBLOCKSHIFT: u32 = FRACBITS + 7;
pub const MAPBLOCKSIZE: Fixed = MAPBLOCKUNITS * FRACUNIT;

/// map-unit to block shift used by the builder.
const MAPBTOFRAC: u32 = 7;

#[derive(Debug, Default)]
pub struct Blockmap {
    pub origin_x: Fixed,
    pub origin_y: Fixed,
    /// Grid extent in blocks.
    pub width: i32,
    pub height: i32,
    /// True when the lump was absent/unusable and the grid was synthesised.
    pub built: bool,
    lists: Vec<Vec<LinedefId>>,
}

impl Blockmap {
    /* ------------------------------------------------------------------ */
    /* decoding                                                           */
    /* ------------------------------------------------------------------ */

    /// Decode the shared word layout (loaded lump or built image).
    pub fn from_words(words: &[i16], built: bool) -> Option<Blockmap> {
        if words.len() < 4 {
            return None;
        }
        let origin_x = (words[0] as Fixed) << FRACBITS;
        let origin_y = (words[1] as Fixed) << FRACBITS;
        let width = words[2] as u16 as i32;
        let height = words[3] as u16 as i32;

        let blocks = (width as usize).checked_mul(height as usize)?;
        if words.len() < 4 + blocks {
            return None;
        }

        let mut lists = Vec::with_capacity(blocks);
        for b in 0..blocks {
            // offsets are unsigned words from the lump start
            let off = words[4 + b] as u16 as usize;
            let mut list = Vec::new();
            let mut i = off;
            // historic leading zero
            if words.get(i) == Some(&0) {
                i += 1;
            }
            while let Some(&w) = words.get(i) {
                if w == -1 {
                    break;
                }
                list.push(w as u16);
                i += 1;
            }
            lists.push(list);
        }

        Some(Blockmap {
            origin_x,
            origin_y,
            width,
            height,
            built,
            lists,
        })
    }

    /* ------------------------------------------------------------------ */
    /* building                                                           */
    /* ------------------------------------------------------------------ */

    /// Synthesise the classic lump image from the level geometry, then
    /// decode it through the common path.
    pub fn build(vertices: &[Vertex], linedefs: &[Linedef]) -> Blockmap {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for v in vertices {
            let x = v.x >> FRACBITS;
            let y = v.y >> FRACBITS;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        if vertices.is_empty() {
            (min_x, min_y, max_x, max_y) = (0, 0, 0, 0);
        }

        let width = ((max_x - min_x) >> MAPBTOFRAC) + 1;
        let height = ((max_y - min_y) >> MAPBTOFRAC) + 1;
        let total = (width * height) as usize;

        /* stamp every linedef into the blocks it crosses */
        let mut blocks: Vec<Vec<i16>> = vec![Vec::new(); total];

        for (line_idx, ln) in linedefs.iter().enumerate() {
            let v1 = &vertices[ln.v1 as usize];
            let v2 = &vertices[ln.v2 as usize];
            let x0 = (v1.x >> FRACBITS) - min_x;
            let y0 = (v1.y >> FRACBITS) - min_y;
            let x1 = (v2.x >> FRACBITS) - min_x;
            let y1 = (v2.y >> FRACBITS) - min_y;

            let dx = if (ln.dx >> FRACBITS) < 0 { -1i32 } else { 1 };
            let dy = if (ln.dy >> FRACBITS) < 0 { -1i32 } else { 1 };
            let mut adx = (ln.dx >> FRACBITS).abs();
            let mut ady = (ln.dy >> FRACBITS).abs();

            // Bresenham-style block traversal
            let mut diff = if adx == 0 {
                1
            } else if ady == 0 {
                -1
            } else {
                (((x0 >> MAPBTOFRAC) << MAPBTOFRAC)
                    + if dx > 0 { MAPBLOCKUNITS - 1 } else { 0 }
                    - x0)
                    * ady
                    * dx
                    - (((y0 >> MAPBTOFRAC) << MAPBTOFRAC)
                        + if dy > 0 { MAPBLOCKUNITS - 1 } else { 0 }
                        - y0)
                        * adx
                        * dy
            };

            let mut idx = (y0 >> MAPBTOFRAC) * width + (x0 >> MAPBTOFRAC);
            let end_idx = (y1 >> MAPBTOFRAC) * width + (x1 >> MAPBTOFRAC);
            let step_y_block = dy * width;
            adx <<= MAPBTOFRAC;
            ady <<= MAPBTOFRAC;

            while (0..total as i32).contains(&idx) {
                blocks[idx as usize].push(line_idx as i16);
                if idx == end_idx {
                    break;
                }
                if diff < 0 {
                    diff += ady;
                    idx += dx;
                } else {
                    diff -= adx;
                    idx += step_y_block;
                }
            }
        }

        /* compress into the shared integer lump layout */
        let mut words: Vec<i16> = vec![0; total + 4];
        words[0] = min_x as i16;
        words[1] = min_y as i16;
        words[2] = width as i16;
        words[3] = height as i16;

        for (b, list) in blocks.iter().enumerate() {
            let pos = words.len();
            words[4 + b] = pos as i16;
            words.push(0);
            words.extend(list.iter().copied());
            words.push(-1);
        }

        info!(
            "blockmap: built {}x{} blocks for {} lines",
            width,
            height,
            linedefs.len()
        );

        Self::from_words(&words, true).expect("self-built blockmap must decode")
    }

    /* ------------------------------------------------------------------ */
    /* queries                                                            */
    /* ------------------------------------------------------------------ */

    /// Block column for a world x.
    #[inline]
    pub fn block_x(&self, x: Fixed) -> i32 {
        ((x as i64 - self.origin_x as i64) >> MAPBLOCKSHIFT) as i32
    }

    /// Block row for a world y.
    #[inline]
    pub fn block_y(&self, y: Fixed) -> i32 {
        ((y as i64 - self.origin_y as i64) >> MAPBLOCKSHIFT) as i32
    }

    /// Line ids stamped into block `(bx, by)`; empty outside the grid.
    pub fn lines_in(&self, bx: i32, by: i32) -> &[LinedefId] {
        if bx < 0 || by < 0 || bx >= self.width || by >= self.height {
            return &[];
        }
        &self.lists[(by * self.width + bx) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LinedefFlags, SlopeType};

    fn vx(x: i32, y: i32) -> Vertex {
        Vertex {
            x: x * FRACUNIT,
            y: y * FRACUNIT,
            rx: x * FRACUNIT,
            ry: y * FRACUNIT,
            moved: false,
        }
    }

    fn line(v1: u16, v2: u16, verts: &[Vertex]) -> Linedef {
        Linedef {
            v1,
            v2,
            dx: verts[v2 as usize].x - verts[v1 as usize].x,
            dy: verts[v2 as usize].y - verts[v1 as usize].y,
            flags: LinedefFlags::empty(),
            special: 0,
            tag: 0,
            right_sidedef: None,
            left_sidedef: None,
            front_sector: 0,
            back_sector: None,
            bbox: [0; 4],
            slope: SlopeType::Horizontal,
        }
    }

    #[test]
    fn build_stamps_a_horizontal_line_across_blocks() {
        let verts = vec![vx(0, 0), vx(300, 0)];
        let lines = vec![line(0, 1, &verts)];
        let bm = Blockmap::build(&verts, &lines);

        assert!(bm.built);
        assert_eq!(bm.width, 3); // 300 units = blocks 0..=2
        // the line must appear in every block it crosses
        for bx in 0..3 {
            assert_eq!(bm.lines_in(bx, 0), &[0], "block {bx}");
        }
        assert!(bm.lines_in(3, 0).is_empty());
    }

    #[test]
    fn diagonal_line_touches_start_and_end_blocks() {
        let verts = vec![vx(10, 10), vx(260, 260)];
        let lines = vec![line(0, 1, &verts)];
        let bm = Blockmap::build(&verts, &lines);

        assert!(bm.lines_in(bm.block_x(10 * FRACUNIT), bm.block_y(10 * FRACUNIT)).contains(&0));
        assert!(
            bm.lines_in(bm.block_x(260 * FRACUNIT), bm.block_y(260 * FRACUNIT)).contains(&0)
        );
    }

    #[test]
    fn out_of_grid_queries_are_empty() {
        let verts = vec![vx(0, 0), vx(10, 10)];
        let lines = vec![line(0, 1, &verts)];
        let bm = Blockmap::build(&verts, &lines);
        assert!(bm.lines_in(-1, 0).is_empty());
        assert!(bm.lines_in(0, 99).is_empty());
    }
}
