//! Per-frame BSP traversal: front-to-back wall emission with the
//! run-length solid-column clip list.

use crate::fixed::Fixed;
use crate::level::bsp::NF_SUBSECTOR;
use crate::level::{BOXBOTTOM, BOXLEFT, BOXRIGHT, BOXTOP, SegId, SubsectorId};
use crate::render::setup::{Frame, Renderer};
use crate::tables::{ANG90, ANG180, ANGLETOFINESHIFT, Angle, point_to_angle2_safe};

/// One fully-covered span of view columns, inclusive.
#[derive(Default, PartialEq, Debug, Clone, Copy)]
pub struct ClipRange {
    pub first: i32,
    pub last: i32,
}

/// Which corners of a node box to test against the view, indexed by the
/// box-side signature (the classic checkcoord table).
#[rustfmt::skip]
const CHECKCOORD: [[usize; 4]; 12] = [
    [3, 0, 2, 1], [3, 0, 2, 0], [3, 1, 2, 0], [0, 0, 0, 0],
    [2, 0, 2, 1], [0, 0, 0, 0], [3, 1, 3, 0], [0, 0, 0, 0],
    [2, 0, 3, 1], [2, 1, 3, 1], [2, 1, 3, 0], [0, 0, 0, 0],
];

impl Renderer {
    /// Two sentinels so the clip routine never runs off the ends.
    pub(crate) fn init_solid_segs(&mut self) {
        let w = self.viewwidth as i32;
        self.solidsegs.clear();
        self.solidsegs.push(ClipRange {
            first: -0x7FFF_FFFF,
            last: -1,
        });
        self.solidsegs.push(ClipRange {
            first: w,
            last: 0x7FFF_FFFF,
        });
    }

    /* ─────────────────────── clip list handling ──────────────────────── */

    /// Clip a solid wall span against the list, emit the visible pieces
    /// and merge the span in.
    fn clip_solid_wall_segment(&mut self, f: &Frame<'_>, first: i32, last: i32) {
        let mut start = 0usize;
        while self.solidsegs[start].last < first - 1 {
            start += 1;
        }

        if first < self.solidsegs[start].first {
            if last < self.solidsegs[start].first - 1 {
                // entirely visible: insert a new clip post
                self.store_wall_range(f, first, last);
                self.solidsegs.insert(start, ClipRange { first, last });
                return;
            }
            // fragment above the post
            self.store_wall_range(f, first, self.solidsegs[start].first - 1);
            self.solidsegs[start].first = first;
        }

        if last <= self.solidsegs[start].last {
            return; // already fully clipped
        }

        let mut next = start;
        while last >= self.solidsegs[next + 1].first - 1 {
            // fragment between two posts
            self.store_wall_range(
                f,
                self.solidsegs[next].last + 1,
                self.solidsegs[next + 1].first - 1,
            );
            next += 1;
            if last <= self.solidsegs[next].last {
                self.solidsegs[start].last = self.solidsegs[next].last;
                self.crunch_solid_segs(start, next);
                return;
            }
        }

        // fragment past the last post
        self.store_wall_range(f, self.solidsegs[next].last + 1, last);
        self.solidsegs[start].last = last;
        self.crunch_solid_segs(start, next);
    }

    fn crunch_solid_segs(&mut self, start: usize, next: usize) {
        if next != start {
            self.solidsegs.drain(start + 1..=next);
        }
    }

    /// Emit the visible pieces of a window span without touching the list.
    fn clip_pass_wall_segment(&mut self, f: &Frame<'_>, first: i32, last: i32) {
        let mut start = 0usize;
        while self.solidsegs[start].last < first - 1 {
            start += 1;
        }

        if first < self.solidsegs[start].first {
            if last < self.solidsegs[start].first - 1 {
                self.store_wall_range(f, first, last);
                return;
            }
            self.store_wall_range(f, first, self.solidsegs[start].first - 1);
        }

        if last <= self.solidsegs[start].last {
            return; // hidden behind one post
        }

        while last >= self.solidsegs[start + 1].first - 1 {
            self.store_wall_range(
                f,
                self.solidsegs[start].last + 1,
                self.solidsegs[start + 1].first - 1,
            );
            start += 1;
            if last <= self.solidsegs[start].last {
                return;
            }
        }

        self.store_wall_range(f, self.solidsegs[start].last + 1, last);
    }

    /* ─────────────────────────── seg emission ────────────────────────── */

    /// Clip one seg to the view cone and hand it to the wall pipeline.
    fn add_line(&mut self, f: &Frame<'_>, seg_id: SegId) {
        let level = f.level;
        let seg = &level.segs[seg_id as usize];
        let v1 = &level.vertices[seg.v1 as usize];
        let v2 = &level.vertices[seg.v2 as usize];

        // overflow-safe angles off the render vertices
        let mut angle1 = point_to_angle2_safe(self.viewx, self.viewy, v1.rx, v1.ry);
        let mut angle2 = point_to_angle2_safe(self.viewx, self.viewy, v2.rx, v2.ry);

        let span = angle1.wrapping_sub(angle2);
        if span >= ANG180 {
            return; // facing away
        }

        self.cur_seg = seg_id;
        self.rw_angle1 = angle1;

        angle1 = angle1.wrapping_sub(self.viewangle);
        angle2 = angle2.wrapping_sub(self.viewangle);

        let mut tspan = angle1.wrapping_add(self.clipangle);
        if tspan > 2 * self.clipangle {
            tspan = tspan.wrapping_sub(2 * self.clipangle);
            if tspan >= span {
                return; // totally off the left edge
            }
            angle1 = self.clipangle;
        }
        let mut tspan = self.clipangle.wrapping_sub(angle2);
        if tspan > 2 * self.clipangle {
            tspan = tspan.wrapping_sub(2 * self.clipangle);
            if tspan >= span {
                return; // totally off the right edge
            }
            angle2 = self.clipangle.wrapping_neg();
        }

        let a1 = (angle1.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize;
        let a2 = (angle2.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize;
        let x1 = self.viewangletox[a1];
        let x2 = self.viewangletox[a2];

        if x1 >= x2 {
            return; // does not cross a column
        }

        let front = &level.sectors[seg.front_sector as usize];
        let solid = match seg.back_sector {
            None => true,
            Some(bs) => {
                let back = &level.sectors[bs as usize];
                if back.ceilh <= front.floorh || back.floorh >= front.ceilh {
                    true // closed door
                } else if back.ceilh != front.ceilh || back.floorh != front.floorh {
                    false // window
                } else {
                    // identical planes: reject when nothing can show
                    let ld = &level.linedefs[seg.linedef as usize];
                    let sd = if seg.side == 0 {
                        ld.right_sidedef
                    } else {
                        ld.left_sidedef
                    };
                    let mid = sd
                        .map(|sd| level.sidedefs[sd as usize].mid)
                        .unwrap_or(0);
                    if back.ceilpic == front.ceilpic
                        && back.floorpic == front.floorpic
                        && back.light == front.light
                        && mid == 0
                    {
                        return;
                    }
                    false
                }
            }
        };

        if solid {
            self.clip_solid_wall_segment(f, x1, x2 - 1);
        } else {
            self.clip_pass_wall_segment(f, x1, x2 - 1);
        }
    }

    /* ──────────────────────────── node walk ──────────────────────────── */

    /// True when any part of the bbox might touch an unclipped column.
    fn check_bbox(&self, bspcoord: &[Fixed; 4]) -> bool {
        let boxx = if bspcoord[BOXRIGHT] <= self.viewx {
            2
        } else if bspcoord[BOXLEFT] < self.viewx {
            1
        } else {
            0
        };
        let boxy = if bspcoord[BOXTOP] <= self.viewy {
            2
        } else if bspcoord[BOXBOTTOM] < self.viewy {
            1
        } else {
            0
        };

        let boxpos = (boxy << 2) + boxx;
        if boxpos == 5 {
            return true; // inside the box
        }

        let c = &CHECKCOORD[boxpos];
        let x1 = bspcoord[c[0]];
        let y1 = bspcoord[c[1]];
        let x2 = bspcoord[c[2]];
        let y2 = bspcoord[c[3]];

        /* project the spanning corners onto the view */
        let mut angle1 =
            point_to_angle2_safe(self.viewx, self.viewy, x1, y1).wrapping_sub(self.viewangle);
        let mut angle2 =
            point_to_angle2_safe(self.viewx, self.viewy, x2, y2).wrapping_sub(self.viewangle);

        let span = angle1.wrapping_sub(angle2);
        if span >= ANG180 {
            return true; // surrounds the viewpoint
        }

        let mut tspan = angle1.wrapping_add(self.clipangle);
        if tspan > 2 * self.clipangle {
            tspan = tspan.wrapping_sub(2 * self.clipangle);
            if tspan >= span {
                return false;
            }
            angle1 = self.clipangle;
        }
        let mut tspan = self.clipangle.wrapping_sub(angle2);
        if tspan > 2 * self.clipangle {
            tspan = tspan.wrapping_sub(2 * self.clipangle);
            if tspan >= span {
                return false;
            }
            angle2 = self.clipangle.wrapping_neg();
        }

        let a1 = (angle1.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize;
        let a2 = (angle2.wrapping_add(ANG90) >> ANGLETOFINESHIFT) as usize;
        let x1 = self.viewangletox[a1];
        let mut x2 = self.viewangletox[a2];

        if x1 == x2 {
            return false; // too narrow to matter
        }
        x2 -= 1;

        /* fully covered by solid columns? */
        let mut start = 0usize;
        while self.solidsegs[start].last < x2 {
            start += 1;
        }
        !(x1 >= self.solidsegs[start].first && x2 <= self.solidsegs[start].last)
    }

    /// Leaf handler: sprites, floor/ceiling planes, then the segs.
    fn render_subsector(&mut self, f: &Frame<'_>, num: SubsectorId) {
        let level = f.level;
        let sub = &level.subsectors[num as usize];
        let sector_id = sub.sector;
        let sector = &level.sectors[sector_id as usize];

        /* sprites: once per sector per frame */
        if self.sector_visit[sector_id as usize] != self.validcount {
            self.sector_visit[sector_id as usize] = self.validcount;
            self.add_sprites(f, sector_id);
        }

        /* floor plane when it can face the view */
        let floorplane = if sector.floorh < self.viewz {
            Some(self.planes.find_plane(
                sector.floorh,
                sector.floorpic,
                sector.light as i32,
                f.level.sky_flat,
                self.viewz,
                self.viewwidth,
            ))
        } else {
            None
        };
        let ceilingplane = if sector.ceilh > self.viewz || sector.ceilpic == level.sky_flat {
            Some(self.planes.find_plane(
                sector.ceilh,
                sector.ceilpic,
                sector.light as i32,
                f.level.sky_flat,
                self.viewz,
                self.viewwidth,
            ))
        } else {
            None
        };
        self.planes.floorplane = floorplane;
        self.planes.ceilingplane = ceilingplane;

        for i in 0..sub.num_segs {
            self.add_line(f, sub.first_seg + i);
        }
    }

    /// Recursive descent from a node id (front first, back if its box
    /// still shows through).
    pub(crate) fn render_bsp_node(&mut self, f: &Frame<'_>, bspnum: i32) {
        if bspnum & NF_SUBSECTOR != 0 {
            // leaf
            if bspnum == -1 {
                self.render_subsector(f, 0);
            } else {
                self.render_subsector(f, (bspnum & !NF_SUBSECTOR) as SubsectorId);
            }
            return;
        }

        let node = &f.level.nodes[bspnum as usize];
        let side = node.point_on_side(self.viewx, self.viewy);

        let children = node.children;
        let bbox_back = node.bbox[side ^ 1];

        self.render_bsp_node(f, children[side]);

        if self.check_bbox(&bbox_back) {
            self.render_bsp_node(f, children[side ^ 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::setup::Renderer;

    /// Regression test for merging behaviour of the clip list.
    #[test]
    fn sentinels_bound_the_clip_list() {
        let mut r = Renderer::new(320, 200);
        r.init_solid_segs();
        assert_eq!(r.solidsegs.len(), 2);
        assert!(r.solidsegs[0].last < 0);
        assert!(r.solidsegs[1].first >= 320);
    }
}
