//! Sprites: projection into vissprites, back-to-front masked drawing with
//! drawseg clipping, and the player weapon overlay.

use crate::defs::flags::{MF_TRANSSHIFT, MobjFlags};
use crate::defs::states::{FF_FRAMEMASK, FF_FULLBRIGHT};
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul};
use crate::level::SectorId;
use crate::render::draw::{ColFn, ColumnCtx, draw_masked_column};
use crate::render::segs::{SIL_BOTTOM, SIL_TOP};
use crate::render::setup::{
    Frame, LIGHTLEVELS, LIGHTSEGSHIFT, LIGHTSCALESHIFT, MAXLIGHTSCALE, Renderer,
};
use crate::render::textures::{Brightmap, Post, sprite_brightmap};
use crate::sim::PlayerState;
use crate::tables::{ANG45, point_to_angle2};
use log::warn;

/// Screen row the weapon sprite hangs from, in original 200-line units.
const BASEYCENTER: i32 = 100;

/// One projected sprite awaiting the masked pass.
#[derive(Clone, Copy, Debug)]
pub struct VisSprite {
    pub x1: i32,
    pub x2: i32,
    pub gx: Fixed,
    pub gy: Fixed,
    pub gz: Fixed,
    pub gzt: Fixed,
    pub startfrac: Fixed,
    pub xiscale: Fixed,
    pub scale: Fixed,
    pub texturemid: Fixed,
    pub patch: u16,
    /// Colormap row; `None` selects the fuzz pipeline.
    pub cmap_row: Option<usize>,
    pub translation: Option<usize>,
    pub brightmap: Option<&'static Brightmap>,
    pub blend: ColFn,
}

impl Renderer {
    /* ───────────────────────── projection ────────────────────────────── */

    /// Project every mobj linked into `sector` (called once per sector
    /// per frame by the BSP walk).
    pub(crate) fn add_sprites(&mut self, f: &Frame<'_>, sector: SectorId) {
        let light = ((f.level.sectors[sector as usize].light as i32) >> LIGHTSEGSHIFT)
            + self.extralight;
        let spritelights = self.scalelight[light.clamp(0, LIGHTLEVELS as i32 - 1) as usize];

        let ents: Vec<hecs::Entity> = f.sim.grid.things_in_sector(sector).to_vec();
        for ent in ents {
            self.project_sprite(f, ent, &spritelights);
        }
    }

    fn project_sprite(
        &mut self,
        f: &Frame<'_>,
        ent: hecs::Entity,
        spritelights: &[usize; MAXLIGHTSCALE],
    ) {
        let Some(m) = f.sim.mobj(ent) else { return };

        /* interpolated world position */
        let interpolate = self.opts.uncapped && m.interp == 1 && self.fractionaltic < FRACUNIT;
        let frac = self.fractionaltic;
        let lerp = move |old: Fixed, new: Fixed| {
            if interpolate {
                old + fixed_mul(frac, new - old)
            } else {
                new
            }
        };
        let interpx = lerp(m.oldx, m.x);
        let interpy = lerp(m.oldy, m.y);
        let interpz = if m.float_z != m.z && m.float_z != 0 {
            lerp(m.old_float_z, m.float_z)
        } else {
            lerp(m.oldz, m.z)
        };

        /* transform into view space */
        let tr_x = interpx - self.viewx;
        let tr_y = interpy - self.viewy;
        let gxt = fixed_mul(tr_x, self.viewcos);
        let gyt = -fixed_mul(tr_y, self.viewsin);
        let tz = gxt - gyt;

        if tz < self.near_z() {
            return; // behind or hugging the near plane
        }
        let xscale = fixed_div(self.projection, tz);

        let gxt = -fixed_mul(tr_x, self.viewsin);
        let gyt = fixed_mul(tr_y, self.viewcos);
        let mut tx = -(gyt + gxt);

        if tx.abs() > tz << 2 {
            return; // outside the horizontal field
        }

        /* pick the rotation frame */
        let def = &f.bank.sprites[m.sprite as usize];
        if def.frames.is_empty() {
            return; // sprite sheet not loaded (headless run)
        }
        let frame_num = (m.frame & FF_FRAMEMASK) as usize;
        if frame_num >= def.frames.len() {
            // a data patch pointed past the sprite's frames
            debug_assert!(frame_num < def.frames.len(), "sprite frame overflow");
            warn!("sprite {:?} frame {frame_num} out of range", m.sprite);
            return;
        }
        let sprframe = &def.frames[frame_num];

        let (mut flip, patch_idx) = if sprframe.rotate {
            let ang = point_to_angle2(self.viewx, self.viewy, interpx, interpy);
            let sixteen = sprframe.patch.iter().skip(1).step_by(2).any(|&p| p != u16::MAX);
            let slot = if sixteen {
                (ang.wrapping_sub(m.angle)
                    .wrapping_add((ANG45 / 4).wrapping_mul(17))
                    >> 28) as usize
            } else {
                ((ang.wrapping_sub(m.angle)
                    .wrapping_add((ANG45 / 2).wrapping_mul(9))
                    >> 29) as usize)
                    * 2
            };
            (sprframe.flip[slot], sprframe.patch[slot])
        } else {
            (sprframe.flip[0], sprframe.patch[0])
        };
        if patch_idx == u16::MAX {
            return; // lump never loaded
        }
        let Some(patch) = f.bank.patch(patch_idx) else {
            return;
        };
        // cosmetic mirroring of corpses and gibs
        if m.flags.contains(MobjFlags::FLIPPABLE) && m.flip {
            flip = !flip;
        }

        /* horizontal extent */
        tx -= (patch.leftoffset as Fixed) << FRACBITS;
        let x1 = (self.centerxfrac + fixed_mul(tx, xscale)) >> FRACBITS;
        if x1 > self.viewwidth as i32 {
            return;
        }
        tx += (patch.width as Fixed) << FRACBITS;
        let x2 = ((self.centerxfrac + fixed_mul(tx, xscale)) >> FRACBITS) - 1;
        if x2 < 0 {
            return;
        }

        let gzt = interpz + ((patch.topoffset as Fixed) << FRACBITS);

        let (startfrac, xiscale) = {
            let iscale = fixed_div(FRACUNIT, xscale);
            if flip {
                (((patch.width as Fixed) << FRACBITS) - 1, -iscale)
            } else {
                (0, iscale)
            }
        };
        // clip the left edge into the fraction
        let startfrac = if x1 < 0 {
            startfrac + xiscale * (-x1)
        } else {
            startfrac
        };

        /* lighting and blend */
        let shadow = m.flags.contains(MobjFlags::SHADOW);
        let cmap_row = if shadow {
            None
        } else if let Some(fixed) = self.fixedcolormap {
            Some(fixed)
        } else if m.frame & FF_FULLBRIGHT != 0 {
            Some(0)
        } else {
            let index = ((xscale >> (LIGHTSCALESHIFT - self.detailshift)) as usize)
                .min(MAXLIGHTSCALE - 1);
            Some(spritelights[index])
        };

        let translation = match (m.flags & MobjFlags::TRANSLATION).bits() >> MF_TRANSSHIFT {
            0 => None,
            n => Some((n - 1) as usize),
        };

        let blend = if shadow {
            self.opts.fuzz_mode
        } else if m.flags.contains(MobjFlags::TRANSLUCENT) && self.opts.translucency {
            if m.frame & FF_FULLBRIGHT != 0 {
                ColFn::TranslucentAdd
            } else {
                ColFn::TranslucentOver
            }
        } else {
            ColFn::Opaque
        };

        self.vissprites.push(VisSprite {
            x1: x1.max(0),
            x2: x2.min(self.viewwidth as i32 - 1),
            gx: interpx,
            gy: interpy,
            gz: interpz,
            gzt,
            startfrac,
            xiscale,
            scale: xscale << self.detailshift,
            texturemid: gzt - self.viewz,
            patch: patch_idx,
            cmap_row,
            translation,
            brightmap: sprite_brightmap(m.sprite),
            blend,
        });
    }

    /* ─────────────────────── masked drawing ──────────────────────────── */

    /// Sort and draw every vissprite, the leftover masked mid textures,
    /// then the weapon overlay.
    pub(crate) fn draw_masked(&mut self, f: &Frame<'_>) {
        let mut order: Vec<usize> = (0..self.vissprites.len()).collect();
        // back to front: merge by projected scale
        order.sort_by_key(|&i| self.vissprites[i].scale);

        for i in order {
            let vis = self.vissprites[i];
            self.draw_sprite(f, &vis);
        }

        /* any masked mid textures not consumed by sprite clipping */
        for i in (0..self.drawsegs.len()).rev() {
            if self.drawsegs[i].maskedtexturecol.is_some() {
                let (x1, x2) = (self.drawsegs[i].x1, self.drawsegs[i].x2);
                self.render_masked_seg_range(f, i, x1, x2);
            }
        }

        self.draw_player_sprites(f);
    }

    /// Clip one vissprite against the drawsegs and draw its columns.
    fn draw_sprite(&mut self, f: &Frame<'_>, vis: &VisSprite) {
        let vw = self.viewwidth;
        let mut clipbot = vec![-2i16; vw];
        let mut cliptop = vec![-2i16; vw];

        /* walls in front of the sprite shape its clip bounds */
        for i in (0..self.drawsegs.len()).rev() {
            let ds = self.drawsegs[i];
            if ds.x1 > vis.x2 || ds.x2 < vis.x1 {
                continue;
            }
            if ds.silhouette == 0 && ds.maskedtexturecol.is_none() {
                continue;
            }

            let r1 = ds.x1.max(vis.x1);
            let r2 = ds.x2.min(vis.x2);

            let (lowscale, scale) = if ds.scale1 > ds.scale2 {
                (ds.scale2, ds.scale1)
            } else {
                (ds.scale1, ds.scale2)
            };

            let seg = &f.level.segs[ds.seg as usize];
            let behind = scale < vis.scale
                || (lowscale < vis.scale
                    && f.level.point_on_seg_side(vis.gx, vis.gy, seg) == 0);
            if behind {
                // the seg is behind the sprite: its masked texture draws now
                if ds.maskedtexturecol.is_some() {
                    self.render_masked_seg_range(f, i, r1, r2);
                }
                continue;
            }

            let sil = ds.silhouette;
            for x in r1..=r2 {
                let off = (x - ds.x1) as usize;
                if sil & SIL_BOTTOM != 0
                    && clipbot[x as usize] == -2
                    && vis.gz < ds.bsilheight
                {
                    if let Some(base) = ds.sprbottomclip {
                        clipbot[x as usize] = self.openings[base + off];
                    }
                }
                if sil & SIL_TOP != 0
                    && cliptop[x as usize] == -2
                    && vis.gzt > ds.tsilheight
                {
                    if let Some(base) = ds.sprtopclip {
                        cliptop[x as usize] = self.openings[base + off];
                    }
                }
            }
        }

        for x in vis.x1..=vis.x2 {
            if clipbot[x as usize] == -2 {
                clipbot[x as usize] = self.viewheight as i16;
            }
            if cliptop[x as usize] == -2 {
                cliptop[x as usize] = -1;
            }
        }

        self.draw_vis_sprite(f, vis, &cliptop, &clipbot);
    }

    /// The unclipped part of every sprite column.
    fn draw_vis_sprite(&mut self, f: &Frame<'_>, vis: &VisSprite, cliptop: &[i16], clipbot: &[i16]) {
        let Some(patch) = f.bank.patch(vis.patch) else {
            return;
        };
        let spryscale = vis.scale >> self.detailshift;
        let sprtopscreen = self.centeryfrac - fixed_mul(vis.texturemid, spryscale);

        let mut frac = vis.startfrac;
        for x in vis.x1..=vis.x2 {
            let texcol = (frac >> FRACBITS).clamp(0, patch.width as i32 - 1) as usize;
            self.draw_masked_posts(
                f,
                &patch.columns[texcol],
                x,
                spryscale,
                sprtopscreen,
                vis.texturemid,
                cliptop[x as usize] as i32,
                clipbot[x as usize] as i32,
                vis.cmap_row.unwrap_or(0),
                vis.translation,
                vis.brightmap,
                if vis.cmap_row.is_none() {
                    self.opts.fuzz_mode
                } else {
                    vis.blend
                },
            );
            frac += vis.xiscale;
        }
    }

    /// Shared masked-post renderer (sprites and masked mid textures).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw_masked_posts(
        &mut self,
        f: &Frame<'_>,
        posts: &[Post],
        x: i32,
        spryscale: Fixed,
        sprtopscreen: Fixed,
        basetexturemid: Fixed,
        cliptop: i32,
        clipbot: i32,
        cmap_row: usize,
        translation: Option<usize>,
        brightmap: Option<&'static Brightmap>,
        blend: ColFn,
    ) {
        if spryscale <= 0 {
            return;
        }
        let iscale = fixed_div(FRACUNIT, spryscale).max(1);
        let mut fuzz = self.fuzz;
        let mut fb = std::mem::take(&mut self.fb);

        for post in posts {
            let topscreen = sprtopscreen + spryscale * post.topdelta as i32;
            let bottomscreen = topscreen + spryscale * post.pixels.len() as i32;

            let mut yl = (topscreen + FRACUNIT - 1) >> FRACBITS;
            let mut yh = (bottomscreen - 1) >> FRACBITS;

            if yh >= clipbot {
                yh = clipbot - 1;
            }
            if yl <= cliptop {
                yl = cliptop + 1;
            }
            if yl > yh {
                continue;
            }

            let texturemid = basetexturemid - ((post.topdelta as Fixed) << FRACBITS);
            let ctx = ColumnCtx {
                x: x << self.detailshift,
                yl,
                yh,
                iscale,
                texturemid,
                centery: self.centery,
                source: &post.pixels,
                texheight: post.pixels.len().max(1) as i32,
                colormap: f.bank.colormap(cmap_row),
                colormap2: f.bank.colormap(0),
                brightmap,
                translation: translation.map(|t| &f.bank.translations[t]),
            };
            draw_masked_column(
                &mut fb,
                &f.bank.palette,
                self.width,
                self.height,
                &ctx,
                blend,
                &mut fuzz,
                self.detailshift == 1,
            );
        }

        self.fb = fb;
        self.fuzz = fuzz;
    }

    /* ─────────────────────── weapon overlay ──────────────────────────── */

    fn draw_player_sprites(&mut self, f: &Frame<'_>) {
        let p = &f.sim.players[self.view_player];
        if p.playerstate == PlayerState::Dead && p.viewheight < 6 * FRACUNIT {
            return;
        }

        /* overlay light comes from the sector under the player */
        let Some(m) = p.mo.and_then(|e| f.sim.mobj(e)) else {
            return;
        };
        let sector = f.level.subsectors[m.subsector as usize].sector;
        let light = ((f.level.sectors[sector as usize].light as i32) >> LIGHTSEGSHIFT)
            + self.extralight;
        let spritelights = self.scalelight[light.clamp(0, LIGHTLEVELS as i32 - 1) as usize];

        let interpolate = self.opts.uncapped && self.fractionaltic < FRACUNIT;
        let frac = self.fractionaltic;
        let lerp = move |old: Fixed, new: Fixed| {
            if interpolate {
                old + fixed_mul(frac, new - old)
            } else {
                new
            }
        };

        /* invisibility turns the weapon into fuzz */
        let invis = p.powers[crate::sim::pw::INVISIBILITY];
        let shadow = invis > 4 * 32 || invis & 8 != 0;

        for psp in p.psprites.iter() {
            let Some(state) = psp.state else { continue };
            let st = state.info();

            let def = &f.bank.sprites[st.sprite as usize];
            let frame_num = (st.frame & FF_FRAMEMASK) as usize;
            let Some(sprframe) = def.frames.get(frame_num) else {
                continue;
            };
            let patch_idx = sprframe.patch[0];
            if patch_idx == u16::MAX {
                continue;
            }
            let Some(patch) = f.bank.patch(patch_idx) else {
                continue;
            };

            let sx = lerp(psp.oldsx2, psp.sx2);
            let sy = lerp(psp.oldsy2, psp.sy2);

            let mut tx = sx - ((ORIG_HALF as Fixed) << FRACBITS);
            tx -= (patch.leftoffset as Fixed) << FRACBITS;
            let x1 = (self.centerxfrac + fixed_mul(tx, self.pspritescale)) >> FRACBITS;
            if x1 > self.viewwidth as i32 {
                continue;
            }
            tx += (patch.width as Fixed) << FRACBITS;
            let x2 = ((self.centerxfrac + fixed_mul(tx, self.pspritescale)) >> FRACBITS) - 1;
            if x2 < 0 {
                continue;
            }

            let texturemid = ((BASEYCENTER as Fixed) << FRACBITS) + FRACUNIT / 2
                - (sy - ((patch.topoffset as Fixed) << FRACBITS));

            let cmap_row = if shadow {
                None
            } else if let Some(fixed) = self.fixedcolormap {
                Some(fixed)
            } else if st.frame & FF_FULLBRIGHT != 0 {
                Some(0)
            } else {
                Some(spritelights[MAXLIGHTSCALE - 1])
            };

            let vis = VisSprite {
                x1: x1.max(0),
                x2: x2.min(self.viewwidth as i32 - 1),
                gx: 0,
                gy: 0,
                gz: 0,
                gzt: 0,
                startfrac: if sprframe.flip[0] {
                    ((patch.width as Fixed) << FRACBITS) - 1
                } else {
                    0
                } + if x1 < 0 {
                    (self.pspriteiscale >> self.detailshift) * (-x1)
                } else {
                    0
                },
                xiscale: if sprframe.flip[0] {
                    -(self.pspriteiscale >> self.detailshift)
                } else {
                    self.pspriteiscale >> self.detailshift
                },
                scale: self.pspritescale << self.detailshift,
                texturemid,
                patch: patch_idx,
                cmap_row,
                translation: None,
                brightmap: None,
                blend: if shadow {
                    self.opts.fuzz_mode
                } else {
                    ColFn::Opaque
                },
            };

            let cliptop = vec![-1i16; self.viewwidth];
            let clipbot = vec![self.viewheight as i16; self.viewwidth];
            self.draw_vis_sprite(f, &vis, &cliptop, &clipbot);
        }
    }
}

/// Half of the classic 320-unit psprite coordinate space.
const ORIG_HALF: i32 = 160;
