//! Wall rendering: turn a clipped seg range into drawn columns, visplane
//! spans and a drawseg record for later sprite clipping.

use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_mul};
use crate::level::{LinedefFlags, SegId};
use crate::render::draw::{ColFn, ColumnCtx, draw_column};
use crate::render::setup::{
    Frame, LIGHTLEVELS, LIGHTSEGSHIFT, LIGHTSCALESHIFT, MAXLIGHTSCALE, Renderer,
};
use crate::render::textures::NO_TEXTURE;
use crate::tables::{ANG90, ANG180, ANGLETOFINESHIFT, FINEANGLES, angle_diff, fine_sine, fine_tangent, to_fine};

/// Sub-pixel precision of the wall height steppers.
const HEIGHTBITS: u32 = 12;
const HEIGHTUNIT: Fixed = 1 << HEIGHTBITS;

pub const SIL_NONE: u32 = 0;
pub const SIL_BOTTOM: u32 = 1;
pub const SIL_TOP: u32 = 2;
pub const SIL_BOTH: u32 = 3;

/// One emitted wall range, kept for masked drawing and sprite clipping.
#[derive(Clone, Copy, Debug)]
pub struct DrawSeg {
    pub seg: SegId,
    pub x1: i32,
    pub x2: i32,
    pub scale1: Fixed,
    pub scale2: Fixed,
    pub scalestep: Fixed,
    pub silhouette: u32,
    pub bsilheight: Fixed,
    pub tsilheight: Fixed,
    /// Base offsets into the openings arena, indexed by `x - x1`.
    pub sprtopclip: Option<usize>,
    pub sprbottomclip: Option<usize>,
    pub maskedtexturecol: Option<usize>,
}

impl Renderer {
    /// Append a slice to the openings arena, returning its base index.
    fn alloc_openings(&mut self, src: &[i16]) -> usize {
        let base = self.openings.len();
        self.openings.extend_from_slice(src);
        base
    }

    /// One opaque wall column at view column `x`.
    #[allow(clippy::too_many_arguments)]
    fn draw_wall_col(
        &self,
        f: &Frame<'_>,
        fb: &mut [u32],
        fuzz: &mut crate::render::draw::FuzzState,
        tex: crate::render::textures::TextureId,
        x: i32,
        yl: i32,
        yh: i32,
        texturemid: Fixed,
        texturecolumn: i32,
        scale: Fixed,
        cmap_row: usize,
    ) {
        if yl > yh {
            return;
        }
        let wall = f.bank.wall(tex);
        let col = wall.column(texturecolumn.rem_euclid(wall.width.max(1) as i32) as usize);
        let ctx = ColumnCtx {
            x: x << self.detailshift,
            yl,
            yh,
            iscale: crate::fixed::fixed_div(FRACUNIT, scale).max(1),
            texturemid,
            centery: self.centery,
            source: col,
            texheight: wall.height as i32,
            colormap: f.bank.colormap(cmap_row),
            colormap2: f.bank.colormap(0),
            brightmap: None,
            translation: None,
        };
        draw_column(
            fb,
            &f.bank.palette,
            self.width,
            self.height,
            &ctx,
            ColFn::Opaque,
            fuzz,
            self.detailshift == 1,
        );
    }

    /// The full wall emission for columns `start..=stop` of `cur_seg`.
    pub(crate) fn store_wall_range(&mut self, f: &Frame<'_>, start: i32, stop: i32) {
        if start > stop {
            return;
        }
        let level = f.level;
        let seg = level.segs[self.cur_seg as usize];
        let ld = &level.linedefs[seg.linedef as usize];
        let sd_id = if seg.side == 0 {
            ld.right_sidedef
        } else {
            ld.left_sidedef
        };
        let Some(sd_id) = sd_id else { return };
        let side = &level.sidedefs[sd_id as usize];
        let front = &level.sectors[seg.front_sector as usize];
        let back = seg.back_sector.map(|b| &level.sectors[b as usize]);

        /* geometry of the wall plane */
        let rw_normalangle = seg.r_angle.wrapping_add(ANG90);
        let mut offsetangle = angle_diff(rw_normalangle, self.rw_angle1);
        if offsetangle > ANG90 {
            offsetangle = ANG90;
        }
        let distangle = ANG90.wrapping_sub(offsetangle);

        let v1 = &level.vertices[seg.v1 as usize];
        let hyp = if v1.rx == self.viewx && v1.ry == self.viewy {
            0
        } else {
            self.point_to_dist(v1.rx, v1.ry)
        };
        let rw_distance = fixed_mul(hyp, fine_sine(to_fine(distangle)));

        let rw_scale =
            self.scale_from_global_angle(
                self.viewangle.wrapping_add(self.xtoviewangle[start as usize]),
                rw_normalangle,
                rw_distance,
            );
        let (scale2, rw_scalestep) = if stop > start {
            let s2 = self.scale_from_global_angle(
                self.viewangle.wrapping_add(self.xtoviewangle[stop as usize]),
                rw_normalangle,
                rw_distance,
            );
            (s2, (s2 - rw_scale) / (stop - start))
        } else {
            (rw_scale, 0)
        };

        /* world heights relative to the eye */
        let mut worldtop = front.ceilh - self.viewz;
        let worldbottom = front.floorh - self.viewz;

        let mut midtexture = NO_TEXTURE;
        let mut toptexture = NO_TEXTURE;
        let mut bottomtexture = NO_TEXTURE;
        let mut maskedtexture = false;

        let mut rw_midtexturemid = 0;
        let mut rw_toptexturemid = 0;
        let mut rw_bottomtexturemid = 0;

        let mut markfloor;
        let mut markceiling;

        let mut ds = DrawSeg {
            seg: self.cur_seg,
            x1: start,
            x2: stop,
            scale1: rw_scale,
            scale2,
            scalestep: rw_scalestep,
            silhouette: SIL_NONE,
            bsilheight: 0,
            tsilheight: 0,
            sprtopclip: None,
            sprbottomclip: None,
            maskedtexturecol: None,
        };

        let mut worldhigh = 0;
        let mut worldlow = 0;

        match back {
            None => {
                /* one-sided line */
                midtexture = side.mid;
                markfloor = true;
                markceiling = true;
                rw_midtexturemid = if ld.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                    // bottom of texture at bottom
                    let vtop =
                        front.floorh + (f.bank.wall_height(side.mid) << FRACBITS);
                    vtop - self.viewz
                } else {
                    worldtop
                };
                rw_midtexturemid += side.rowoffset;

                ds.silhouette = SIL_BOTH;
                ds.sprtopclip = Some(self.alloc_openings(&self.screenheightarray.clone()));
                ds.sprbottomclip = Some(self.alloc_openings(&self.negonearray.clone()));
                ds.bsilheight = Fixed::MAX;
                ds.tsilheight = Fixed::MIN;
            }
            Some(back) => {
                /* two-sided: window with optional upper/lower walls */
                if front.floorh > back.floorh {
                    ds.silhouette = SIL_BOTTOM;
                    ds.bsilheight = front.floorh;
                } else if back.floorh > self.viewz {
                    ds.silhouette = SIL_BOTTOM;
                    ds.bsilheight = Fixed::MAX;
                }
                if front.ceilh < back.ceilh {
                    ds.silhouette |= SIL_TOP;
                    ds.tsilheight = front.ceilh;
                } else if back.ceilh < self.viewz {
                    ds.silhouette |= SIL_TOP;
                    ds.tsilheight = Fixed::MIN;
                }

                if back.ceilh <= front.floorh {
                    ds.sprbottomclip = Some(self.alloc_openings(&self.negonearray.clone()));
                    ds.bsilheight = Fixed::MAX;
                    ds.silhouette |= SIL_BOTTOM;
                }
                if back.floorh >= front.ceilh {
                    ds.sprtopclip = Some(self.alloc_openings(&self.screenheightarray.clone()));
                    ds.tsilheight = Fixed::MIN;
                    ds.silhouette |= SIL_TOP;
                }

                worldhigh = back.ceilh - self.viewz;
                worldlow = back.floorh - self.viewz;

                // both-sky ceilings draw no top wall at all
                if front.ceilpic == level.sky_flat && back.ceilpic == level.sky_flat {
                    worldtop = worldhigh;
                }

                markfloor = worldlow != worldbottom
                    || back.floorpic != front.floorpic
                    || back.light != front.light;
                markceiling = worldhigh != worldtop
                    || back.ceilpic != front.ceilpic
                    || back.light != front.light;

                if back.ceilh <= front.floorh || back.floorh >= front.ceilh {
                    // closed door
                    markceiling = true;
                    markfloor = true;
                }

                if worldhigh < worldtop {
                    toptexture = side.top;
                    rw_toptexturemid = if ld.flags.contains(LinedefFlags::UPPER_UNPEGGED) {
                        worldtop
                    } else {
                        let vtop =
                            back.ceilh + (f.bank.wall_height(side.top) << FRACBITS);
                        vtop - self.viewz
                    };
                }
                if worldlow > worldbottom {
                    bottomtexture = side.bottom;
                    rw_bottomtexturemid = if ld.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
                        worldtop
                    } else {
                        worldlow
                    };
                }
                rw_toptexturemid += side.rowoffset;
                rw_bottomtexturemid += side.rowoffset;

                if side.mid != NO_TEXTURE {
                    maskedtexture = true;
                    // reserve one texture-column slot per x
                    let base = self.openings.len();
                    self.openings
                        .extend(std::iter::repeat(i16::MIN).take((stop - start + 1) as usize));
                    ds.maskedtexturecol = Some(base);
                }
            }
        }

        let segtextured = midtexture != NO_TEXTURE
            || toptexture != NO_TEXTURE
            || bottomtexture != NO_TEXTURE
            || maskedtexture;

        /* texture column origin and wall lights */
        let mut rw_offset = 0;
        let mut rw_centerangle = 0u32;
        let mut walllights = [0usize; MAXLIGHTSCALE];
        if segtextured {
            let mut offsetangle = rw_normalangle.wrapping_sub(self.rw_angle1);
            if offsetangle > ANG180 {
                offsetangle = offsetangle.wrapping_neg();
            }
            if offsetangle > ANG90 {
                offsetangle = ANG90;
            }
            rw_offset = fixed_mul(hyp, fine_sine(to_fine(offsetangle)));
            if rw_normalangle.wrapping_sub(self.rw_angle1) < ANG180 {
                rw_offset = -rw_offset;
            }
            rw_offset += side.texoffset + seg.offset;
            rw_centerangle = ANG90
                .wrapping_add(self.viewangle)
                .wrapping_sub(rw_normalangle);

            let lightnum = ((front.light as i32) >> LIGHTSEGSHIFT)
                + self.extralight
                + seg.fakecontrast as i32;
            walllights = self.scalelight[lightnum.clamp(0, LIGHTLEVELS as i32 - 1) as usize];
        }

        /* plane visibility pruning against the eye height */
        if front.floorh >= self.viewz {
            markfloor = false; // under the floor plane
        }
        if front.ceilh <= self.viewz && front.ceilpic != level.sky_flat {
            markceiling = false; // above the ceiling plane
        }

        /* steppers, in reduced 20.12 precision */
        let worldtop_r = worldtop >> 4;
        let worldbottom_r = worldbottom >> 4;
        let topstep = -fixed_mul(rw_scalestep, worldtop_r);
        let mut topfrac = (self.centeryfrac >> 4) - fixed_mul(worldtop_r, rw_scale);
        let bottomstep = -fixed_mul(rw_scalestep, worldbottom_r);
        let mut bottomfrac = (self.centeryfrac >> 4) - fixed_mul(worldbottom_r, rw_scale);

        let mut pixhigh = 0;
        let mut pixhighstep = 0;
        let mut pixlow = 0;
        let mut pixlowstep = 0;
        if back.is_some() {
            let worldhigh_r = worldhigh >> 4;
            let worldlow_r = worldlow >> 4;
            if toptexture != NO_TEXTURE {
                pixhigh = (self.centeryfrac >> 4) - fixed_mul(worldhigh_r, rw_scale);
                pixhighstep = -fixed_mul(rw_scalestep, worldhigh_r);
            }
            if bottomtexture != NO_TEXTURE {
                pixlow = (self.centeryfrac >> 4) - fixed_mul(worldlow_r, rw_scale);
                pixlowstep = -fixed_mul(rw_scalestep, worldlow_r);
            }
        }

        /* open the plane ranges this wall touches */
        if markceiling {
            if let Some(cp) = self.planes.ceilingplane {
                self.planes.ceilingplane = Some(self.planes.check_plane(cp, start, stop));
            } else {
                markceiling = false;
            }
        }
        if markfloor {
            if let Some(fp) = self.planes.floorplane {
                self.planes.floorplane = Some(self.planes.check_plane(fp, start, stop));
            } else {
                markfloor = false;
            }
        }

        /* ───────────────────── the column loop ───────────────────────── */

        let mut scale = rw_scale;
        let mut fuzz = self.fuzz;
        let mut fb = std::mem::take(&mut self.fb);

        for x in start..=stop {
            // round the top up so adjoining spans never leave a seam
            let mut yl = ((topfrac + HEIGHTUNIT - 1) >> HEIGHTBITS) as i32;
            if yl < (self.ceilingclip[x as usize] + 1) as i32 {
                yl = (self.ceilingclip[x as usize] + 1) as i32;
            }

            if markceiling {
                let top = self.ceilingclip[x as usize] as i32 + 1;
                let mut bottom = yl - 1;
                if bottom >= self.floorclip[x as usize] as i32 {
                    bottom = self.floorclip[x as usize] as i32 - 1;
                }
                if top <= bottom {
                    if let Some(cp) = self.planes.ceilingplane {
                        self.planes.planes[cp].set_span(x, top, bottom);
                    }
                }
            }

            let mut yh = (bottomfrac >> HEIGHTBITS) as i32;
            if yh >= self.floorclip[x as usize] as i32 {
                yh = self.floorclip[x as usize] as i32 - 1;
            }

            if markfloor {
                let mut top = yh + 1;
                let bottom = self.floorclip[x as usize] as i32 - 1;
                if top <= self.ceilingclip[x as usize] as i32 {
                    top = self.ceilingclip[x as usize] as i32 + 1;
                }
                if top <= bottom {
                    if let Some(fp) = self.planes.floorplane {
                        self.planes.planes[fp].set_span(x, top, bottom);
                    }
                }
            }

            /* texture column and light for this x */
            let mut texturecolumn = 0i32;
            let mut cmap_row = 0usize;
            if segtextured {
                let angle = ((rw_centerangle.wrapping_add(self.xtoviewangle[x as usize]))
                    >> ANGLETOFINESHIFT) as usize
                    & (FINEANGLES / 2 - 1);
                texturecolumn =
                    (rw_offset - fixed_mul(fine_tangent(angle), rw_distance)) >> FRACBITS;

                let index =
                    ((scale >> LIGHTSCALESHIFT) as usize).min(MAXLIGHTSCALE - 1);
                cmap_row = match self.fixedcolormap {
                    Some(fixed) => fixed,
                    None => walllights[index],
                };
            }

            if midtexture != NO_TEXTURE {
                /* single-sided: one full column */
                self.draw_wall_col(
                    f, &mut fb, &mut fuzz, midtexture, x, yl, yh, rw_midtexturemid,
                    texturecolumn, scale, cmap_row,
                );
                self.ceilingclip[x as usize] = self.viewheight as i16;
                self.floorclip[x as usize] = -1;
            } else {
                if toptexture != NO_TEXTURE {
                    let mut mid = (pixhigh >> HEIGHTBITS) as i32;
                    pixhigh += pixhighstep;
                    if mid >= self.floorclip[x as usize] as i32 {
                        mid = self.floorclip[x as usize] as i32 - 1;
                    }
                    if mid >= yl {
                        self.draw_wall_col(
                            f, &mut fb, &mut fuzz, toptexture, x, yl, mid, rw_toptexturemid,
                            texturecolumn, scale, cmap_row,
                        );
                        self.ceilingclip[x as usize] = mid as i16;
                    } else {
                        self.ceilingclip[x as usize] = (yl - 1) as i16;
                    }
                } else if markceiling {
                    self.ceilingclip[x as usize] = (yl - 1) as i16;
                }

                if bottomtexture != NO_TEXTURE {
                    let mut mid = ((pixlow + HEIGHTUNIT - 1) >> HEIGHTBITS) as i32;
                    pixlow += pixlowstep;
                    if mid <= self.ceilingclip[x as usize] as i32 {
                        mid = self.ceilingclip[x as usize] as i32 + 1;
                    }
                    if mid <= yh {
                        self.draw_wall_col(
                            f, &mut fb, &mut fuzz, bottomtexture, x, mid, yh,
                            rw_bottomtexturemid, texturecolumn, scale, cmap_row,
                        );
                        self.floorclip[x as usize] = mid as i16;
                    } else {
                        self.floorclip[x as usize] = (yh + 1) as i16;
                    }
                } else if markfloor {
                    self.floorclip[x as usize] = (yh + 1) as i16;
                }

                if let Some(base) = ds.maskedtexturecol {
                    self.openings[base + (x - start) as usize] = texturecolumn as i16;
                }
            }

            scale += rw_scalestep;
            topfrac += topstep;
            bottomfrac += bottomstep;
        }

        self.fb = fb;
        self.fuzz = fuzz;

        /* save clip snapshots for sprites and masked mids */
        if (ds.silhouette & SIL_TOP != 0 || maskedtexture) && ds.sprtopclip.is_none() {
            let snap: Vec<i16> = (start..=stop)
                .map(|x| self.ceilingclip[x as usize])
                .collect();
            ds.sprtopclip = Some(self.alloc_openings(&snap));
        }
        if (ds.silhouette & SIL_BOTTOM != 0 || maskedtexture) && ds.sprbottomclip.is_none() {
            let snap: Vec<i16> = (start..=stop)
                .map(|x| self.floorclip[x as usize])
                .collect();
            ds.sprbottomclip = Some(self.alloc_openings(&snap));
        }
        if maskedtexture {
            if ds.silhouette & SIL_TOP == 0 {
                ds.silhouette |= SIL_TOP;
                ds.tsilheight = Fixed::MIN;
            }
            if ds.silhouette & SIL_BOTTOM == 0 {
                ds.silhouette |= SIL_BOTTOM;
                ds.bsilheight = Fixed::MAX;
            }
        }

        self.drawsegs.push(ds);
    }

    /* ──────────────────── masked mid textures ────────────────────────── */

    /// Draw the translucent window texture of a stored two-sided seg.
    pub(crate) fn render_masked_seg_range(&mut self, f: &Frame<'_>, ds_idx: usize, x1: i32, x2: i32) {
        let ds = self.drawsegs[ds_idx];
        let Some(colbase) = ds.maskedtexturecol else {
            return;
        };
        let level = f.level;
        let seg = level.segs[ds.seg as usize];
        let ld = &level.linedefs[seg.linedef as usize];
        let sd_id = if seg.side == 0 {
            ld.right_sidedef
        } else {
            ld.left_sidedef
        };
        let Some(sd_id) = sd_id else { return };
        let side = &level.sidedefs[sd_id as usize];
        if side.mid == NO_TEXTURE {
            return;
        }

        let front = &level.sectors[seg.front_sector as usize];
        let back_id = match seg.back_sector {
            Some(b) => b,
            None => return,
        };
        let back = &level.sectors[back_id as usize];

        let lightnum = ((front.light as i32) >> LIGHTSEGSHIFT)
            + self.extralight
            + seg.fakecontrast as i32;
        let walllights = self.scalelight[lightnum.clamp(0, LIGHTLEVELS as i32 - 1) as usize];

        let wall = f.bank.wall(side.mid);
        let texheight = (wall.height as Fixed) << FRACBITS;

        let texturemid = if ld.flags.contains(LinedefFlags::LOWER_UNPEGGED) {
            front.floorh.max(back.floorh) + texheight - self.viewz
        } else {
            front.ceilh.min(back.ceilh) - self.viewz
        } + side.rowoffset;

        let xstart = x1.max(ds.x1);
        let mut spryscale = ds.scale1 + (xstart - ds.x1) * ds.scalestep;

        for x in xstart..=x2.min(ds.x2) {
            let texcol = self.openings[colbase + (x - ds.x1) as usize];
            if texcol != i16::MIN {
                let col = &wall.columns[(texcol as i32).rem_euclid(wall.width as i32) as usize];

                let index =
                    ((spryscale >> LIGHTSCALESHIFT) as usize).min(MAXLIGHTSCALE - 1);
                let cmap_row = match self.fixedcolormap {
                    Some(fixed) => fixed,
                    None => walllights[index],
                };

                let topclip = ds
                    .sprtopclip
                    .map(|b| self.openings[b + (x - ds.x1) as usize])
                    .unwrap_or(-1);
                let bottomclip = ds
                    .sprbottomclip
                    .map(|b| self.openings[b + (x - ds.x1) as usize])
                    .unwrap_or(self.viewheight as i16);

                let sprtopscreen = self.centeryfrac - fixed_mul(texturemid, spryscale);
                self.draw_masked_posts(
                    f,
                    col,
                    x,
                    spryscale,
                    sprtopscreen,
                    texturemid,
                    topclip as i32,
                    bottomclip as i32,
                    cmap_row,
                    None,
                    None,
                    ColFn::Opaque,
                );

                // a drawn column never draws twice
                self.openings[colbase + (x - ds.x1) as usize] = i16::MIN;
            }
            spryscale += ds.scalestep;
        }
    }
}
