//! Visplanes: deferred floor/ceiling runs gathered during the wall walk
//! and rasterised afterwards as horizontal spans (or sky columns).

use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul};
use crate::render::draw::{ColFn, ColumnCtx, SpanCtx, draw_column, draw_span};
use crate::render::setup::{
    Frame, LIGHTSEGSHIFT, LIGHTZSHIFT, MAXLIGHTZ, Renderer,
};
use crate::render::textures::TextureId;
use crate::tables::{ANGLETOFINESHIFT, ANGLETOSKYSHIFT, fine_cosine, fine_sine};

/// Column sentinel: no pixel claimed.
const UNSET: u16 = u16::MAX;

/// Shortish skies get stretched when the view can pitch.
const SKYSTRETCH_HEIGHT: i32 = 228;

pub struct VisPlane {
    pub height: Fixed,
    pub picnum: TextureId,
    pub lightlevel: i32,
    pub minx: i32,
    pub maxx: i32,
    /// Per-column pixel bounds, padded one entry each side.
    pub top: Vec<u16>,
    pub bottom: Vec<u16>,
}

impl VisPlane {
    fn new(height: Fixed, picnum: TextureId, lightlevel: i32, width: usize) -> VisPlane {
        VisPlane {
            height,
            picnum,
            lightlevel,
            minx: width as i32,
            maxx: -1,
            top: vec![UNSET; width + 2],
            bottom: vec![0; width + 2],
        }
    }

    /// Claim one column; caller keeps x within the view.
    #[inline]
    pub fn set_span(&mut self, x: i32, top: i32, bottom: i32) {
        self.top[(x + 1) as usize] = top as u16;
        self.bottom[(x + 1) as usize] = bottom as u16;
    }
}

/// The 128-slot hash of visplanes plus the two per-subsector cursors.
#[derive(Default)]
pub struct PlaneArena {
    pub planes: Vec<VisPlane>,
    hash: Vec<i32>,
    next: Vec<i32>,
    width: usize,
    pub floorplane: Option<usize>,
    pub ceilingplane: Option<usize>,
    /// Spans emitted by the last `draw_planes`, for diagnostics.
    pub spans_drawn: u32,
}

const PLANE_HASH: usize = 128;

fn plane_key(picnum: TextureId, lightlevel: i32, height: Fixed) -> usize {
    (picnum as i64 * 3 + lightlevel as i64 + height as i64 * 7).rem_euclid(PLANE_HASH as i64)
        as usize
}

impl PlaneArena {
    pub fn clear(&mut self, width: usize) {
        self.planes.clear();
        self.hash = vec![-1; PLANE_HASH];
        self.next.clear();
        self.width = width;
        self.floorplane = None;
        self.ceilingplane = None;
        self.spans_drawn = 0;
    }

    /// Find the plane for `(height, picnum, light)`, creating it if absent.
    /// Sky planes collapse their light and flatten their height so sky
    /// floors and ceilings never merge with real ones.
    pub fn find_plane(
        &mut self,
        mut height: Fixed,
        picnum: TextureId,
        mut lightlevel: i32,
        sky_flat: TextureId,
        viewz: Fixed,
        width: usize,
    ) -> usize {
        if picnum == sky_flat {
            lightlevel = 0;
            // keep floor skies apart from ceiling skies
            height = if height > viewz { 1 } else { 0 };
        }

        let key = plane_key(picnum, lightlevel, height);
        let mut check = self.hash[key];
        while check != -1 {
            let p = &self.planes[check as usize];
            if p.height == height && p.picnum == picnum && p.lightlevel == lightlevel {
                return check as usize;
            }
            check = self.next[check as usize];
        }

        let idx = self.planes.len();
        self.planes
            .push(VisPlane::new(height, picnum, lightlevel, width));
        self.next.push(self.hash[key]);
        self.hash[key] = idx as i32;
        idx
    }

    /// Reuse `idx` for the column range, or split off a fresh copy when
    /// the range overlaps columns it already claimed.
    pub fn check_plane(&mut self, idx: usize, start: i32, stop: i32) -> usize {
        let (intrl, intrh, unionl, unionh);
        {
            let p = &self.planes[idx];
            intrl = p.minx.max(start);
            unionl = p.minx.min(start);
            intrh = p.maxx.min(stop);
            unionh = p.maxx.max(stop);
        }

        let mut x = intrl;
        while x <= intrh {
            if self.planes[idx].top[(x + 1) as usize] != UNSET {
                break;
            }
            x += 1;
        }

        if x > intrh {
            let p = &mut self.planes[idx];
            p.minx = unionl;
            p.maxx = unionh;
            return idx; // free to extend
        }

        /* overlap: make a duplicate for the new range */
        let (height, picnum, lightlevel) = {
            let p = &self.planes[idx];
            (p.height, p.picnum, p.lightlevel)
        };
        let key = plane_key(picnum, lightlevel, height);
        let new_idx = self.planes.len();
        let mut np = VisPlane::new(height, picnum, lightlevel, self.width);
        np.minx = start;
        np.maxx = stop;
        self.planes.push(np);
        self.next.push(self.hash[key]);
        self.hash[key] = new_idx as i32;
        new_idx
    }
}

/* ───────────────────────────── rasterising ───────────────────────────── */

impl Renderer {
    /// Draw every gathered visplane: sky columns or flat spans.
    pub(crate) fn draw_planes(&mut self, f: &Frame<'_>) {
        let mut planes = std::mem::take(&mut self.planes);
        for plane in &planes.planes {
            if plane.minx > plane.maxx {
                continue;
            }
            if plane.picnum == f.level.sky_flat {
                self.draw_sky_plane(f, plane);
            } else {
                planes.spans_drawn += self.draw_flat_plane(f, plane);
            }
        }
        self.planes = planes;
    }

    fn draw_sky_plane(&mut self, f: &Frame<'_>, plane: &VisPlane) {
        // sky is always drawn with the zero colormap, never diminished
        let colormap = f.bank.colormap(0);
        let sky_tex = f.bank.wall_id("SKY1");
        let sky = f.bank.wall(sky_tex);

        let mut iscale = self.pspriteiscale >> self.detailshift;
        let mut texturemid = 100 * FRACUNIT;
        if self.opts.mouselook && (sky.height as i32) < 200 {
            // stretch short skies so looking up never runs out of texture
            iscale = iscale * sky.height as i32 / SKYSTRETCH_HEIGHT;
            texturemid += (sky.height as i32 - SKYSTRETCH_HEIGHT) << FRACBITS;
        }

        let mut fuzz = self.fuzz;
        for x in plane.minx..=plane.maxx {
            let yl = plane.top[(x + 1) as usize];
            let yh = plane.bottom[(x + 1) as usize];
            if yl == UNSET || (yl as i32) > yh as i32 {
                continue;
            }

            let angle = ((self.viewangle.wrapping_add(self.xtoviewangle[x as usize]))
                >> ANGLETOSKYSHIFT) as usize;
            let col = sky.column(angle % sky.width.max(1));

            let ctx = ColumnCtx {
                x: x << self.detailshift,
                yl: yl as i32,
                yh: yh as i32,
                iscale,
                texturemid,
                centery: self.centery,
                source: col,
                texheight: sky.height as i32,
                colormap,
                colormap2: colormap,
                brightmap: None,
                translation: None,
            };
            draw_column(
                &mut self.fb,
                &f.bank.palette,
                self.width,
                self.height,
                &ctx,
                ColFn::Opaque,
                &mut fuzz,
                self.detailshift == 1,
            );
        }
        self.fuzz = fuzz;
    }

    /// Returns the number of spans emitted.
    fn draw_flat_plane(&mut self, f: &Frame<'_>, plane: &VisPlane) -> u32 {
        let flat = f.bank.flat(plane.picnum);

        /* swirling flats substitute a distorted copy */
        let mut distorted = [0u8; 4096];
        let source: &[u8] = match self.swirl_bindings.get(&plane.picnum) {
            Some(&mode) => {
                crate::render::swirl::distorted_flat(
                    mode,
                    f.sim.leveltime,
                    &flat.pixels,
                    &mut distorted,
                );
                &distorted
            }
            None => &flat.pixels,
        };

        let planeheight = (plane.height - self.viewz).abs();
        let basexscale = fixed_div(self.viewsin, self.centerxfrac);
        let baseyscale = -fixed_div(self.viewcos, self.centerxfrac);

        let light = ((plane.lightlevel >> LIGHTSEGSHIFT) + self.extralight)
            .clamp(0, super::setup::LIGHTLEVELS as i32 - 1) as usize;
        let zrow = self.zlight[light];

        let mut spans = 0u32;
        let mut spanstart = vec![0i32; self.viewheight];
        let mut fb = std::mem::take(&mut self.fb);

        let mut draw_run = |r: &Renderer, fb: &mut [u32], y: i32, x1: i32, x2: i32| {
            if y < 0 || y >= r.viewheight as i32 || x2 < x1 {
                return;
            }
            let distance = fixed_mul(planeheight, r.yslope[y as usize]);
            let xstep = fixed_mul(distance, basexscale);
            let ystep = fixed_mul(distance, baseyscale);

            let length = fixed_mul(distance, r.distscale[x1 as usize]);
            let angle = ((r.viewangle.wrapping_add(r.xtoviewangle[x1 as usize]))
                >> ANGLETOFINESHIFT) as usize;
            let xfrac = r.viewx + fixed_mul(fine_cosine(angle), length);
            let yfrac = -r.viewy - fixed_mul(fine_sine(angle), length);

            let zi = ((distance >> LIGHTZSHIFT) as usize).min(MAXLIGHTZ - 1);
            let cmap_row = match r.fixedcolormap {
                Some(fixed) => fixed,
                None => zrow[zi],
            };

            let ctx = SpanCtx {
                y,
                x1,
                x2,
                xfrac,
                yfrac,
                xstep,
                ystep,
                source,
                colormap: f.bank.colormap(cmap_row),
            };
            draw_span(fb, &f.bank.palette, r.width, &ctx, r.detailshift);
            spans += 1;
        };

        /* per-column bounds become horizontal runs, classic make-spans */
        let mut prev_top: i32 = self.viewheight as i32; // nothing open yet
        let mut prev_bottom: i32 = -1;
        for x in plane.minx..=plane.maxx + 1 {
            let (t, b) = if x <= plane.maxx && plane.top[(x + 1) as usize] != UNSET {
                (
                    plane.top[(x + 1) as usize] as i32,
                    plane.bottom[(x + 1) as usize] as i32,
                )
            } else {
                (self.viewheight as i32, -1)
            };

            // rows that just closed end at x-1
            let mut y = prev_top;
            while y < t && y <= prev_bottom {
                draw_run(self, &mut fb, y, spanstart[y as usize], x - 1);
                y += 1;
            }
            let mut y = prev_bottom;
            while y > b && y >= prev_top {
                draw_run(self, &mut fb, y, spanstart[y as usize], x - 1);
                y -= 1;
            }

            // rows that just opened start at x
            let mut y = t;
            while y < prev_top && y <= b {
                spanstart[y as usize] = x;
                y += 1;
            }
            let mut y = b;
            while y > prev_bottom && y >= t {
                spanstart[y as usize] = x;
                y -= 1;
            }

            prev_top = t;
            prev_bottom = b;
        }

        drop(draw_run);
        self.fb = fb;
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_plane_is_idempotent_until_clear() {
        let mut arena = PlaneArena::default();
        arena.clear(320);
        let a = arena.find_plane(64 * FRACUNIT, 5, 160, 1, 41 * FRACUNIT, 320);
        let b = arena.find_plane(64 * FRACUNIT, 5, 160, 1, 41 * FRACUNIT, 320);
        assert_eq!(a, b);
        let c = arena.find_plane(80 * FRACUNIT, 5, 160, 1, 41 * FRACUNIT, 320);
        assert_ne!(a, c);
        arena.clear(320);
        assert!(arena.planes.is_empty());
    }

    #[test]
    fn sky_planes_collapse_light_and_height() {
        let mut arena = PlaneArena::default();
        arena.clear(320);
        let sky = 1; // sky flat id
        let above = arena.find_plane(500 * FRACUNIT, sky, 255, sky, 41 * FRACUNIT, 320);
        let above2 = arena.find_plane(300 * FRACUNIT, sky, 10, sky, 41 * FRACUNIT, 320);
        assert_eq!(above, above2, "all sky ceilings share one plane");
        let below = arena.find_plane(-500 * FRACUNIT, sky, 255, sky, 41 * FRACUNIT, 320);
        assert_ne!(above, below, "sky floors stay apart from sky ceilings");
    }

    #[test]
    fn check_plane_extends_when_free_and_splits_on_overlap() {
        let mut arena = PlaneArena::default();
        arena.clear(320);
        let p = arena.find_plane(0, 3, 128, 1, 41 * FRACUNIT, 320);
        arena.planes[p].minx = 10;
        arena.planes[p].maxx = 20;

        // free extension: no claimed columns yet
        let same = arena.check_plane(p, 15, 40);
        assert_eq!(same, p);
        assert_eq!(arena.planes[p].maxx, 40);

        // claim a column, then an overlapping range must split
        arena.planes[p].set_span(16, 5, 10);
        let split = arena.check_plane(p, 16, 18);
        assert_ne!(split, p);
        assert_eq!(arena.planes[split].minx, 16);
    }

    #[test]
    fn hash_key_mixes_inputs() {
        let a = plane_key(4, 128, 64 * FRACUNIT);
        let b = plane_key(5, 128, 64 * FRACUNIT);
        assert!(a < PLANE_HASH && b < PLANE_HASH);
        assert_ne!(a, b);
    }
}
