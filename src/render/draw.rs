//! The inner rasterisers: column variants and the flat span drawer.
//!
//! Every variant walks the same `count = yh - yl` loop with a destination
//! pointer striding one screen row and a 16.16 texture accumulator; they
//! differ only in the final pixel blend.  Low-detail mode doubles pixels
//! without changing any arithmetic.

use crate::fixed::{FRACBITS, Fixed};
use crate::random::Rng;
use crate::render::Pixel;
use crate::render::textures::Brightmap;

/// Which blend a column uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColFn {
    #[default]
    Opaque,
    /// Store through a palette translation first.
    Translated,
    /// Alpha ~168/256 over blend.
    TranslucentOver,
    /// Saturating per-channel add.
    TranslucentAdd,
    /// The spectre shimmer: sample a vertical neighbour, darken.
    Fuzz,
    /// Softer fuzz: low-alpha over blend.
    FuzzTranslucent,
    /// Accessibility fuzz: desaturate then darken.
    FuzzGrayscale,
}

/* ───────────────────────────── blending ──────────────────────────────── */

#[inline(always)]
fn blend_over(bg: Pixel, fg: Pixel, alpha: u32) -> Pixel {
    let inv = 256 - alpha;
    let rb = ((fg & 0x00FF_00FF) * alpha + (bg & 0x00FF_00FF) * inv) >> 8;
    let g = ((fg & 0x0000_FF00) * alpha + (bg & 0x0000_FF00) * inv) >> 8;
    0xFF00_0000 | (rb & 0x00FF_00FF) | (g & 0x0000_FF00)
}

#[inline(always)]
fn blend_add(bg: Pixel, fg: Pixel) -> Pixel {
    let r = ((bg >> 16) & 0xFF) + ((fg >> 16) & 0xFF);
    let g = ((bg >> 8) & 0xFF) + ((fg >> 8) & 0xFF);
    let b = (bg & 0xFF) + (fg & 0xFF);
    0xFF00_0000 | (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

#[inline(always)]
fn blend_dark(px: Pixel, level: u32) -> Pixel {
    let rb = ((px & 0x00FF_00FF) * level) >> 8;
    let g = ((px & 0x0000_FF00) * level) >> 8;
    0xFF00_0000 | (rb & 0x00FF_00FF) | (g & 0x0000_FF00)
}

#[inline(always)]
fn blend_dark_grayscale(px: Pixel, level: u32) -> Pixel {
    // Rec.601-ish integer luma
    let r = (px >> 16) & 0xFF;
    let g = (px >> 8) & 0xFF;
    let b = px & 0xFF;
    let y = ((r * 77 + g * 150 + b * 29) >> 8) * level >> 8;
    0xFF00_0000 | (y << 16) | (y << 8) | y
}

/* ─────────────────────────────── fuzz ────────────────────────────────── */

pub const FUZZTABLE: usize = 50;

/// Classic +row/-row offset signs.
#[rustfmt::skip]
pub static FUZZ_OFFSET: [i32; FUZZTABLE] = [
    1, -1, 1, -1, 1, 1, -1, 1, 1, -1, 1, 1, 1, -1,
    1, 1, 1, -1, -1, -1, -1, 1, -1, -1, 1, 1, 1, 1, -1,
    1, -1, 1, 1, -1, -1, 1, 1, -1, -1, -1, -1, 1, 1,
    1, 1, -1, 1, 1, -1, 1,
];

/// The fuzz cursor keeps a tic-time reference so the shimmer advances at
/// simulation rate even when frames render far faster.
#[derive(Clone, Copy, Debug, Default)]
pub struct FuzzState {
    pub pos: usize,
    tic_pos: usize,
    /// Optional cosmetic jitter applied at tic boundaries.
    pub jitter: bool,
}

impl FuzzState {
    /// Call once per rendered frame; `new_tic` marks simulation advances.
    pub fn frame(&mut self, new_tic: bool, vis_rng: &mut Rng) {
        if new_tic {
            if self.jitter {
                self.pos = (self.pos + vis_rng.next() as usize) % FUZZTABLE;
            }
            self.tic_pos = self.pos;
        } else {
            // re-renders of the same tic restart from the saved cursor
            self.pos = self.tic_pos;
        }
    }

    #[inline]
    fn step(&mut self) -> i32 {
        let v = FUZZ_OFFSET[self.pos];
        self.pos = (self.pos + 1) % FUZZTABLE;
        v
    }
}

/* ───────────────────────────── columns ───────────────────────────────── */

/// Everything one column draw needs; grouped so the hot loops stay free of
/// argument shuffling.
pub struct ColumnCtx<'a> {
    pub x: i32,
    pub yl: i32,
    pub yh: i32,
    /// 16.16 texel step per screen row.
    pub iscale: Fixed,
    pub texturemid: Fixed,
    /// Screen row that projects to `texturemid`.
    pub centery: i32,
    /// Source texel column.
    pub source: &'a [u8],
    /// Non-zero when the texture height is not a power of two.
    pub texheight: i32,
    /// Diminished-light palette row.
    pub colormap: &'a [u8; 256],
    /// Full-bright row used where the brightmap flags a pixel.
    pub colormap2: &'a [u8; 256],
    pub brightmap: Option<&'static Brightmap>,
    pub translation: Option<&'a [u8; 256]>,
}

/// Draw one column variant into `fb` (row stride = `width`).
/// `pixel_double` widens every written pixel for low-detail mode.
#[allow(clippy::too_many_arguments)]
pub fn draw_column(
    fb: &mut [Pixel],
    pal: &[Pixel; 256],
    width: usize,
    height: usize,
    ctx: &ColumnCtx<'_>,
    variant: ColFn,
    fuzz: &mut FuzzState,
    pixel_double: bool,
) {
    let mut yl = ctx.yl;
    let mut yh = ctx.yh;

    /* fuzz cannot sample off the screen edge */
    if matches!(
        variant,
        ColFn::Fuzz | ColFn::FuzzTranslucent | ColFn::FuzzGrayscale
    ) {
        if yl <= 0 {
            yl = 1;
        }
        if yh >= height as i32 - 1 {
            yh = height as i32 - 2;
        }
    }

    let count = yh - yl;
    if count < 0 {
        return;
    }

    let mut frac = ctx.texturemid + (yl - ctx.centery) * ctx.iscale;
    let mut dest = yl as usize * width + ctx.x as usize;

    for _ in 0..=count {
        /* sample the texture column */
        let idx = if ctx.texheight > 0 {
            // arbitrary heights take the modulo path
            let h = (ctx.texheight as i64) << FRACBITS;
            let mut f = (frac as i64) % h;
            if f < 0 {
                f += h;
            }
            (f >> FRACBITS) as usize
        } else {
            ((frac >> FRACBITS) & 127) as usize % ctx.source.len().max(1)
        };
        let mut pix = ctx.source[idx.min(ctx.source.len() - 1)];

        if let Some(tr) = ctx.translation {
            pix = tr[pix as usize];
        }

        /* brightmapped pixels read the full-power row */
        let mapped = match ctx.brightmap {
            Some(bm) if bm[pix as usize] != 0 => ctx.colormap2[pix as usize],
            _ => ctx.colormap[pix as usize],
        };
        let color = pal[mapped as usize];

        let write = |fb: &mut [Pixel], dest: usize, value: Pixel| {
            fb[dest] = value;
            if pixel_double && dest + 1 < fb.len() {
                fb[dest + 1] = value;
            }
        };

        match variant {
            ColFn::Opaque | ColFn::Translated => write(fb, dest, color),
            ColFn::TranslucentOver => write(fb, dest, blend_over(fb[dest], color, 168)),
            ColFn::TranslucentAdd => write(fb, dest, blend_add(fb[dest], color)),
            ColFn::Fuzz => {
                let off = fuzz.step() * width as i32;
                let src = (dest as i32 + off) as usize;
                let neighbour = fb[src.min(fb.len() - 1)];
                write(fb, dest, blend_dark(neighbour, 192));
            }
            ColFn::FuzzTranslucent => {
                let off = fuzz.step() * width as i32;
                let src = (dest as i32 + off) as usize;
                let neighbour = fb[src.min(fb.len() - 1)];
                write(fb, dest, blend_over(neighbour, color, 64));
            }
            ColFn::FuzzGrayscale => {
                let off = fuzz.step() * width as i32;
                let src = (dest as i32 + off) as usize;
                let neighbour = fb[src.min(fb.len() - 1)];
                write(fb, dest, blend_dark_grayscale(neighbour, 192));
            }
        }

        dest += width;
        frac += ctx.iscale;
    }
}

/// Draw a masked post column (sprites, masked mid textures): the post's
/// pixels replace `source`, offsets already folded into `yl/yh`.
#[allow(clippy::too_many_arguments)]
pub fn draw_masked_column(
    fb: &mut [Pixel],
    pal: &[Pixel; 256],
    width: usize,
    height: usize,
    ctx: &ColumnCtx<'_>,
    variant: ColFn,
    fuzz: &mut FuzzState,
    pixel_double: bool,
) {
    // masked drawing shares the exact inner loop; the mask already shaped
    // yl/yh and source
    draw_column(fb, pal, width, height, ctx, variant, fuzz, pixel_double);
}

/* ─────────────────────────────── spans ───────────────────────────────── */

/// One horizontal flat run.
pub struct SpanCtx<'a> {
    pub y: i32,
    pub x1: i32,
    pub x2: i32,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
    /// 64x64 flat texels, row-major.
    pub source: &'a [u8],
    pub colormap: &'a [u8; 256],
}

/// Sample a 64x64 flat along a screen row.  `detailshift` doubles pixels
/// for low-detail mode without changing the sampling arithmetic.
pub fn draw_span(
    fb: &mut [Pixel],
    pal: &[Pixel; 256],
    width: usize,
    ctx: &SpanCtx<'_>,
    detailshift: u32,
) {
    if ctx.x2 < ctx.x1 {
        return;
    }
    let mut xfrac = ctx.xfrac;
    let mut yfrac = ctx.yfrac;
    let row = ctx.y as usize * width;

    for x in ctx.x1..=ctx.x2 {
        // 6+6 bit texel index, exactly the classic packing
        let spot = (((yfrac >> 10) & 0x0FC0) | ((xfrac >> 16) & 0x3F)) as usize;
        let mapped = ctx.colormap[ctx.source[spot] as usize];
        let dest = row + ((x as usize) << detailshift);
        fb[dest] = pal[mapped as usize];
        if detailshift == 1 && dest + 1 < fb.len() {
            fb[dest + 1] = pal[mapped as usize];
        }

        xfrac += ctx.xstep;
        yfrac += ctx.ystep;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::FRACUNIT;

    fn identity_map() -> [u8; 256] {
        let mut m = [0u8; 256];
        for (i, v) in m.iter_mut().enumerate() {
            *v = i as u8;
        }
        m
    }

    fn gray_pal() -> [Pixel; 256] {
        let mut p = [0u32; 256];
        for (i, v) in p.iter_mut().enumerate() {
            let g = i as u32;
            *v = 0xFF00_0000 | (g << 16) | (g << 8) | g;
        }
        p
    }

    #[test]
    fn opaque_column_writes_expected_rows() {
        let (w, h) = (8usize, 16usize);
        let mut fb = vec![0u32; w * h];
        let source = vec![9u8; 128];
        let map = identity_map();
        let ctx = ColumnCtx {
            x: 3,
            yl: 2,
            yh: 5,
            iscale: FRACUNIT,
            texturemid: 0,
            centery: 2,
            source: &source,
            texheight: 0,
            colormap: &map,
            colormap2: &map,
            brightmap: None,
            translation: None,
        };
        let mut fuzz = FuzzState::default();
        draw_column(&mut fb, &gray_pal(), w, h, &ctx, ColFn::Opaque, &mut fuzz, false);

        for y in 0..h {
            let px = fb[y * w + 3];
            if (2..=5).contains(&(y as i32)) {
                assert_eq!(px & 0xFF, 9, "row {y}");
            } else {
                assert_eq!(px, 0, "row {y}");
            }
        }
    }

    #[test]
    fn add_blend_saturates() {
        assert_eq!(blend_add(0xFFFF_0000 | 0xF0, 0xFF00_0000 | 0xF0), 0xFFFF_00FF);
    }

    #[test]
    fn over_blend_is_weighted() {
        let out = blend_over(0xFF00_0000, 0xFF00_00FF, 168);
        let b = out & 0xFF;
        assert!(b > 128 && b < 176, "blue {b}");
    }

    #[test]
    fn span_packs_texel_index_classically() {
        let (w, h) = (8usize, 4usize);
        let mut fb = vec![0u32; w * h];
        let mut flat = vec![0u8; 4096];
        flat[0] = 7; // texel (0,0)
        let map = identity_map();
        let ctx = SpanCtx {
            y: 1,
            x1: 0,
            x2: 0,
            xfrac: 0,
            yfrac: 0,
            xstep: 0,
            ystep: 0,
            source: &flat,
            colormap: &map,
        };
        draw_span(&mut fb, &gray_pal(), w, &ctx, 0);
        assert_eq!(fb[w] & 0xFF, 7);
    }

    #[test]
    fn fuzz_state_rewinds_within_a_tic() {
        let mut rng = Rng::new();
        let mut fz = FuzzState::default();
        fz.frame(true, &mut rng);
        let start = fz.pos;
        fz.step();
        fz.step();
        // same tic re-render: cursor rewinds
        fz.frame(false, &mut rng);
        assert_eq!(fz.pos, start);
        // next tic: keeps going from wherever drawing left it
        fz.step();
        fz.frame(true, &mut rng);
        assert_ne!(fz.pos, start);
    }
}
