//! Actor physics: the XY mover with blockmap collision, the Z mover with
//! gravity and contacts, wall sliding and corpse torque.
//!
//! The collision test mirrors the original structure: a context is seeded
//! from the destination sector, then every nearby thing and line either
//! rejects the move or tightens the vertical opening.

use crate::defs::flags::MobjFlags;
use crate::defs::sound::Sfx;
use crate::defs::states::StateId;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, approx_distance, fixed_mul};
use crate::level::setup::MAXRADIUS;
use crate::level::{
    BOXBOTTOM, BOXLEFT, BOXRIGHT, BOXTOP, Level, Linedef, LinedefFlags, LinedefId, SlopeType,
};
use crate::sim::intercepts::{self, InterceptTarget};
use crate::sim::mobj::{self, Effect, MobjActions, set_mobj_state};
use crate::sim::tic::{Mobj, Sim, SoundOrigin};
use crate::sim::{
    FLOATSPEED, FRICTION, GRAVITY, MAXMOVE, MAXSTEP, STOPSPEED, VIEWHEIGHT,
};
use crate::tables::{ANG90, ANG180, ANGLETOFINESHIFT, fine_cosine, fine_sine, point_to_angle2, to_fine};
use hecs::Entity;
use log::debug;
use smallvec::SmallVec;

/* ─────────────────────── shared line predicates ──────────────────────── */

/// 0 = front side of the linedef, 1 = back.
pub(crate) fn point_on_line_side(level: &Level, x: Fixed, y: Fixed, ld: &Linedef) -> usize {
    let v1 = &level.vertices[ld.v1 as usize];

    if ld.dx == 0 {
        if x <= v1.x {
            return (ld.dy > 0) as usize;
        }
        return (ld.dy < 0) as usize;
    }
    if ld.dy == 0 {
        if y <= v1.y {
            return (ld.dx < 0) as usize;
        }
        return (ld.dx > 0) as usize;
    }

    let dx = x.wrapping_sub(v1.x);
    let dy = y.wrapping_sub(v1.y);
    let left = fixed_mul(ld.dy >> FRACBITS, dx);
    let right = fixed_mul(dy, ld.dx >> FRACBITS);
    if right < left { 0 } else { 1 }
}

/// Which side of the line a whole box is on; -1 when straddling.
fn box_on_line_side(level: &Level, bbox: &[Fixed; 4], ld: &Linedef) -> i32 {
    let v1 = &level.vertices[ld.v1 as usize];
    let (p1, p2) = match ld.slope {
        SlopeType::Horizontal => {
            let mut p1 = (bbox[BOXTOP] > v1.y) as i32;
            let mut p2 = (bbox[BOXBOTTOM] > v1.y) as i32;
            if ld.dx < 0 {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Vertical => {
            let mut p1 = (bbox[BOXRIGHT] < v1.x) as i32;
            let mut p2 = (bbox[BOXLEFT] < v1.x) as i32;
            if ld.dy < 0 {
                p1 ^= 1;
                p2 ^= 1;
            }
            (p1, p2)
        }
        SlopeType::Positive => (
            point_on_line_side(level, bbox[BOXLEFT], bbox[BOXTOP], ld) as i32,
            point_on_line_side(level, bbox[BOXRIGHT], bbox[BOXBOTTOM], ld) as i32,
        ),
        SlopeType::Negative => (
            point_on_line_side(level, bbox[BOXRIGHT], bbox[BOXTOP], ld) as i32,
            point_on_line_side(level, bbox[BOXLEFT], bbox[BOXBOTTOM], ld) as i32,
        ),
    };
    if p1 == p2 { p1 } else { -1 }
}

/// Vertical window a two-sided line leaves open.
pub(crate) fn line_opening(level: &Level, ld: &Linedef) -> (Fixed, Fixed, Fixed, Fixed) {
    let Some(back) = ld.back_sector else {
        // single sided line
        return (0, 0, 0, 0);
    };
    let front = &level.sectors[ld.front_sector as usize];
    let back = &level.sectors[back as usize];

    let opentop = front.ceilh.min(back.ceilh);
    let (openbottom, lowfloor) = if front.floorh > back.floorh {
        (front.floorh, back.floorh)
    } else {
        (back.floorh, front.floorh)
    };

    (opentop, openbottom, opentop - openbottom, lowfloor)
}

/* ─────────────────────────── P_CheckPosition ─────────────────────────── */

pub(crate) struct CheckResult {
    pub blocked: bool,
    pub floorz: Fixed,
    pub ceilingz: Fixed,
    pub dropoffz: Fixed,
    pub subsector: u16,
    pub ceiling_line: Option<LinedefId>,
    pub skull_hit: bool,
    pub spechit: SmallVec<[LinedefId; 8]>,
}

/// Test whether `m` fits at `(x, y)`, gathering the floor/ceiling the spot
/// offers.  Queues damage/pickup effects discovered on the way.
pub(crate) fn check_position(
    sim: &mut Sim,
    level: &Level,
    ent: Entity,
    m: &Mobj,
    x: Fixed,
    y: Fixed,
    fx: &mut MobjActions,
) -> CheckResult {
    let ss = level.locate_subsector(x, y);
    let sector = &level.sectors[level.subsectors[ss as usize].sector as usize];

    let mut res = CheckResult {
        blocked: false,
        floorz: sector.floorh,
        ceilingz: sector.ceilh,
        dropoffz: sector.floorh,
        subsector: ss,
        ceiling_line: None,
        skull_hit: false,
        spechit: SmallVec::new(),
    };

    if m.flags.contains(MobjFlags::NOCLIP) {
        return res;
    }

    let bbox = [y + m.radius, y - m.radius, x - m.radius, x + m.radius];

    /* things: iterate an area padded by the largest possible radius */
    {
        let Sim { grid, game_rng, .. } = sim;
        let target = m.target;
        let completed = grid.for_each_in_bbox(
            bbox[BOXLEFT] - MAXRADIUS,
            bbox[BOXBOTTOM] - MAXRADIUS,
            bbox[BOXRIGHT] + MAXRADIUS,
            bbox[BOXTOP] + MAXRADIUS,
            |stub| {
                if !stub.flags.intersects(
                    MobjFlags::SOLID | MobjFlags::SPECIAL | MobjFlags::SHOOTABLE,
                ) {
                    return true;
                }
                let blockdist = stub.radius + m.radius;
                if (stub.x - x).abs() >= blockdist || (stub.y - y).abs() >= blockdist {
                    return true;
                }
                if stub.ent == ent {
                    return true;
                }

                /* charging skull: ram whatever we touched */
                if m.flags.contains(MobjFlags::SKULLFLY) {
                    let damage = (game_rng.next() % 8 + 1) * m.info.damage;
                    fx.push(Effect::Damage {
                        target: stub.ent,
                        inflictor: Some(ent),
                        source: Some(ent),
                        damage,
                    });
                    res.skull_hit = true;
                    return false;
                }

                /* projectiles pass over and under */
                if m.flags.contains(MobjFlags::MISSILE) {
                    if m.z > stub.z + stub.height {
                        return true;
                    }
                    if m.z + m.height < stub.z {
                        return true;
                    }
                    if Some(stub.ent) == target {
                        return true; // never hit the shooter
                    }
                    if !stub.flags.contains(MobjFlags::SHOOTABLE) {
                        return !stub.flags.contains(MobjFlags::SOLID);
                    }
                    let damage = (game_rng.next() % 8 + 1) * m.info.damage;
                    fx.push(Effect::Damage {
                        target: stub.ent,
                        inflictor: Some(ent),
                        source: target,
                        damage,
                    });
                    return false;
                }

                /* walk-over pickups */
                if stub.flags.contains(MobjFlags::SPECIAL) {
                    let solid = stub.flags.contains(MobjFlags::SOLID);
                    if m.flags.contains(MobjFlags::PICKUP) {
                        fx.push(Effect::Touch {
                            special: stub.ent,
                            toucher: ent,
                        });
                    }
                    return !solid;
                }

                !stub.flags.contains(MobjFlags::SOLID)
            },
        );
        if !completed {
            res.blocked = true;
            return res;
        }
    }

    /* lines */
    sim.stamp += 1;
    let stamp = sim.stamp;
    let bm = &level.blockmap;
    let xl = bm.block_x(bbox[BOXLEFT]);
    let xh = bm.block_x(bbox[BOXRIGHT]);
    let yl = bm.block_y(bbox[BOXBOTTOM]);
    let yh = bm.block_y(bbox[BOXTOP]);

    for bx in xl..=xh {
        for by in yl..=yh {
            for &li in bm.lines_in(bx, by) {
                if sim.line_stamp[li as usize] == stamp {
                    continue;
                }
                sim.line_stamp[li as usize] = stamp;

                let ld = &level.linedefs[li as usize];
                if bbox[BOXRIGHT] <= ld.bbox[BOXLEFT]
                    || bbox[BOXLEFT] >= ld.bbox[BOXRIGHT]
                    || bbox[BOXTOP] <= ld.bbox[BOXBOTTOM]
                    || bbox[BOXBOTTOM] >= ld.bbox[BOXTOP]
                {
                    continue;
                }
                if box_on_line_side(level, &bbox, ld) != -1 {
                    continue;
                }

                /* the box crosses this line */
                if ld.back_sector.is_none() {
                    res.blocked = true;
                    return res;
                }
                if !m.flags.contains(MobjFlags::MISSILE) {
                    if ld.flags.contains(LinedefFlags::BLOCKING) {
                        res.blocked = true;
                        return res;
                    }
                    if m.player.is_none() && ld.flags.contains(LinedefFlags::BLOCK_MONSTERS) {
                        res.blocked = true;
                        return res;
                    }
                }

                let (opentop, openbottom, _range, lowfloor) = line_opening(level, ld);
                if opentop < res.ceilingz {
                    res.ceilingz = opentop;
                    res.ceiling_line = Some(li);
                }
                if openbottom > res.floorz {
                    res.floorz = openbottom;
                }
                if lowfloor < res.dropoffz {
                    res.dropoffz = lowfloor;
                }
                if ld.special != 0 {
                    res.spechit.push(li);
                }
            }
        }
    }

    res
}

/* ────────────────────────────── P_TryMove ────────────────────────────── */

/// Attempt the move, relinking the spatial index on success.
pub(crate) fn try_move(
    sim: &mut Sim,
    level: &Level,
    ent: Entity,
    x: Fixed,
    y: Fixed,
    fx: &mut MobjActions,
) -> bool {
    let Some(mut m) = sim.mobj(ent) else {
        return false;
    };

    let res = check_position(sim, level, ent, &m, x, y, fx);
    sim.tm_ceiling_line = res.ceiling_line;

    if res.skull_hit {
        // the ram connects: stop flying and settle
        m.flags.remove(MobjFlags::SKULLFLY);
        m.momx = 0;
        m.momy = 0;
        m.momz = 0;
        let spawnstate = m.info.spawnstate;
        set_mobj_state(ent, &mut m, spawnstate, fx);
        sim.put_mobj(ent, m);
        return false;
    }
    if res.blocked {
        return false;
    }

    if !m.flags.contains(MobjFlags::NOCLIP) {
        if res.ceilingz - res.floorz < m.height {
            return false; // doesn't fit
        }
        if !m.flags.contains(MobjFlags::TELEPORT) && res.ceilingz - m.z < m.height {
            return false; // must lower itself first
        }
        if !m.flags.contains(MobjFlags::TELEPORT) && res.floorz - m.z > MAXSTEP {
            return false; // too big a step up
        }
        if !m.flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT)
            && res.floorz - res.dropoffz > MAXSTEP
        {
            return false; // don't stand over a dropoff
        }
    }

    /* the move is ok: relink */
    let old_sector = level.subsectors[m.subsector as usize].sector;
    sim.grid.unset_position(&m.stub(ent), old_sector);

    m.floorz = res.floorz;
    m.ceilingz = res.ceilingz;
    m.x = x;
    m.y = y;
    m.subsector = res.subsector;

    let new_sector = level.subsectors[res.subsector as usize].sector;
    sim.grid.set_position(m.stub(ent), new_sector);
    sim.put_mobj(ent, m);

    for li in res.spechit {
        // line specials (doors, teleports) live outside this core
        debug!("crossed special line {li}");
    }

    true
}

/* ───────────────────────────── P_XYMovement ──────────────────────────── */

pub(crate) fn xy_movement(sim: &mut Sim, level: &Level, ent: Entity, fx: &mut MobjActions) {
    let Some(mut m) = sim.mobj(ent) else { return };

    if m.momx == 0 && m.momy == 0 {
        if m.flags.contains(MobjFlags::SKULLFLY) {
            // a skull that stopped flying settles back to its rest state
            m.flags.remove(MobjFlags::SKULLFLY);
            m.momz = 0;
            let spawnstate = m.info.spawnstate;
            set_mobj_state(ent, &mut m, spawnstate, fx);
        }
        sim.put_mobj(ent, m);
        return;
    }

    m.momx = m.momx.clamp(-MAXMOVE, MAXMOVE);
    m.momy = m.momy.clamp(-MAXMOVE, MAXMOVE);
    let mut xmove = m.momx;
    let mut ymove = m.momy;
    sim.put_mobj(ent, m);

    loop {
        let (ptryx, ptryy);
        if xmove > MAXMOVE / 2 || ymove > MAXMOVE / 2 || xmove < -MAXMOVE / 2
            || ymove < -MAXMOVE / 2
        {
            ptryx = m.x + xmove / 2;
            ptryy = m.y + ymove / 2;
            xmove >>= 1;
            ymove >>= 1;
        } else {
            ptryx = m.x + xmove;
            ptryy = m.y + ymove;
            xmove = 0;
            ymove = 0;
        }

        if !try_move(sim, level, ent, ptryx, ptryy, fx) {
            let Some(nm) = sim.mobj(ent) else { return };
            m = nm;

            if m.player.is_some() {
                slide_move(sim, level, ent, fx);
                match sim.mobj(ent) {
                    Some(nm) => m = nm,
                    None => return,
                }
            } else if m.flags.contains(MobjFlags::MISSILE) {
                /* a missile that struck a sky wall vanishes silently */
                if let Some(li) = sim.tm_ceiling_line {
                    let ld = &level.linedefs[li as usize];
                    if let Some(back) = ld.back_sector {
                        let back = &level.sectors[back as usize];
                        if back.ceilpic == level.sky_flat {
                            if m.z > back.ceilh {
                                mobj::remove_mobj(sim, level, ent);
                            } else {
                                // below the sky edge: explode, but jitter on
                                // the cosmetic stream
                                fx.push(Effect::Explode { ent, safe: true });
                            }
                            return;
                        }
                    }
                }
                fx.push(Effect::Explode { ent, safe: false });
                return;
            } else {
                m.momx = 0;
                m.momy = 0;
                sim.put_mobj(ent, m);
            }
        } else {
            match sim.mobj(ent) {
                Some(nm) => m = nm,
                None => return,
            }
        }

        if xmove == 0 && ymove == 0 {
            break;
        }
    }

    /* friction */
    if m.flags.intersects(MobjFlags::MISSILE | MobjFlags::SKULLFLY) {
        return;
    }
    if m.z > m.floorz {
        return; // no friction while airborne
    }

    if m.flags.contains(MobjFlags::CORPSE)
        && (m.momx > FRACUNIT / 4
            || m.momx < -FRACUNIT / 4
            || m.momy > FRACUNIT / 4
            || m.momy < -FRACUNIT / 4)
        && m.floorz != level.sectors[level.subsectors[m.subsector as usize].sector as usize].floorh
    {
        return; // don't stop a corpse sliding off a step
    }

    let idle = match m.player {
        Some(slot) => {
            let cmd = &sim.players[slot as usize].cmd;
            cmd.forwardmove == 0 && cmd.sidemove == 0
        }
        None => true,
    };

    if m.momx > -STOPSPEED
        && m.momx < STOPSPEED
        && m.momy > -STOPSPEED
        && m.momy < STOPSPEED
        && idle
    {
        if m.player.is_some()
            && m.state >= StateId::PLAY_RUN1
            && m.state <= StateId::PLAY_RUN4
        {
            set_mobj_state(ent, &mut m, StateId::PLAY, fx);
        }
        m.momx = 0;
        m.momy = 0;
    } else {
        m.momx = fixed_mul(m.momx, FRICTION);
        m.momy = fixed_mul(m.momy, FRICTION);
    }
    sim.put_mobj(ent, m);
}

/* ───────────────────────────── P_ZMovement ───────────────────────────── */

pub(crate) fn z_movement(sim: &mut Sim, level: &Level, ent: Entity, fx: &mut MobjActions) {
    let Some(mut m) = sim.mobj(ent) else { return };

    /* smooth out step-ups */
    if let Some(slot) = m.player {
        if m.z < m.floorz {
            let p = &mut sim.players[slot as usize];
            p.viewheight -= m.floorz - m.z;
            p.deltaviewheight = (VIEWHEIGHT - p.viewheight) >> 3;
        }
    }

    m.z += m.momz;

    /* floaters drift toward their target's midriff */
    if m.flags.contains(MobjFlags::FLOAT) && !m.flags.contains(MobjFlags::INFLOAT) {
        if let Some(tgt) = m.target.and_then(|e| sim.mobj(e)) {
            let dist = approx_distance(m.x - tgt.x, m.y - tgt.y);
            let delta = (tgt.z + (m.height >> 1)) - m.z;
            if delta < 0 && dist < -(delta * 3) {
                m.z -= FLOATSPEED;
            } else if delta > 0 && dist < delta * 3 {
                m.z += FLOATSPEED;
            }
        }
    }

    /* floor contact */
    if m.z <= m.floorz {
        if m.flags.contains(MobjFlags::SKULLFLY) {
            m.momz = -m.momz; // the skull slammed into something
        }

        if m.flags.contains(MobjFlags::BOUNCES) && m.momz < 0 {
            // lose half the energy per bounce, keep flying
            m.momz = -(m.momz >> 1);
            m.z = m.floorz;
        } else {
            if m.momz < 0 {
                if let Some(slot) = m.player {
                    if m.momz < -GRAVITY * 8 {
                        // hard landing: squat the view and grunt
                        let p = &mut sim.players[slot as usize];
                        p.deltaviewheight = m.momz >> 3;
                        p.psp_dy_max = m.momz >> 2;
                        if m.health > 0 {
                            sim.sfx(SoundOrigin::Mobj(ent), Sfx::oof);
                        }
                    }
                }
                m.momz = 0;
            }
            m.z = m.floorz;

            if m.flags.contains(MobjFlags::MISSILE) && !m.flags.contains(MobjFlags::NOCLIP) {
                fx.push(Effect::Explode { ent, safe: false });
                sim.put_mobj(ent, m);
                return;
            }
        }
    } else if !m.flags.contains(MobjFlags::NOGRAVITY) {
        // double gravity on the first airborne tic, classic behaviour
        if m.momz == 0 {
            m.momz = -GRAVITY * 2;
        } else {
            m.momz -= GRAVITY;
        }
    }

    /* ceiling contact */
    if m.z + m.height > m.ceilingz {
        if m.flags.contains(MobjFlags::SKULLFLY) {
            m.momz = -m.momz;
        }
        if m.momz > 0 {
            m.momz = 0;
        }
        m.z = m.ceilingz - m.height;

        if m.flags.contains(MobjFlags::MISSILE) && !m.flags.contains(MobjFlags::NOCLIP) {
            fx.push(Effect::Explode { ent, safe: false });
            sim.put_mobj(ent, m);
            return;
        }
    }

    sim.put_mobj(ent, m);
}

/* ───────────────────────────── P_SlideMove ───────────────────────────── */

/// Slide a blocked player along the wall instead of stopping dead.
pub(crate) fn slide_move(sim: &mut Sim, level: &Level, ent: Entity, fx: &mut MobjActions) {
    let Some(mut m) = sim.mobj(ent) else { return };

    for _hit in 0..3 {
        /* trace from the leading corner of the bbox */
        let leadx = if m.momx > 0 { m.x + m.radius } else { m.x - m.radius };
        let leady = if m.momy > 0 { m.y + m.radius } else { m.y - m.radius };
        let trailx = if m.momx > 0 { m.x - m.radius } else { m.x + m.radius };
        let traily = if m.momy > 0 { m.y - m.radius } else { m.y + m.radius };

        let mut best_frac = FRACUNIT + 1;
        let mut best_line: Option<LinedefId> = None;

        for (sx, sy) in [(leadx, leady), (trailx, leady), (leadx, traily)] {
            intercepts::path_traverse(
                sim,
                level,
                sx,
                sy,
                sx + m.momx,
                sy + m.momy,
                true,
                false,
                |_sim, level, ic| {
                    let InterceptTarget::Line(li) = ic.target else {
                        return true;
                    };
                    let ld = &level.linedefs[li as usize];

                    let blocking = if ld.back_sector.is_none() {
                        if point_on_line_side(level, m.x, m.y, ld) == 1 {
                            return true; // hit the back of a wall: ignore
                        }
                        true
                    } else {
                        let (opentop, openbottom, openrange, _low) = line_opening(level, ld);
                        openrange < m.height
                            || opentop - m.z < m.height
                            || openbottom - m.z > MAXSTEP
                    };

                    if !blocking {
                        return true;
                    }
                    if ic.frac < best_frac {
                        best_frac = ic.frac;
                        best_line = Some(li);
                    }
                    false
                },
            );
        }

        /* the move is unobstructed for its full length */
        if best_frac == FRACUNIT + 1 {
            stair_step(sim, level, ent, &m, fx);
            return;
        }

        /* move up to the wall */
        best_frac -= 0x800;
        if best_frac > 0 {
            let newx = fixed_mul(m.momx, best_frac);
            let newy = fixed_mul(m.momy, best_frac);
            if !try_move(sim, level, ent, m.x + newx, m.y + newy, fx) {
                stair_step(sim, level, ent, &m, fx);
                return;
            }
        }

        /* project the remainder along the wall */
        let remainder = (FRACUNIT - (best_frac + 0x800)).clamp(0, FRACUNIT);
        if remainder == 0 {
            return;
        }
        let mut tmx = fixed_mul(m.momx, remainder);
        let mut tmy = fixed_mul(m.momy, remainder);
        if let Some(li) = best_line {
            hit_slide_line(level, &m, &level.linedefs[li as usize], &mut tmx, &mut tmy);
        }

        let Some(nm) = sim.mobj(ent) else { return };
        m = nm;
        m.momx = tmx;
        m.momy = tmy;
        sim.put_mobj(ent, m);

        if try_move(sim, level, ent, m.x + tmx, m.y + tmy, fx) {
            return;
        }
        match sim.mobj(ent) {
            Some(nm) => m = nm,
            None => return,
        }
    }
}

/// Last-resort axis-aligned nudge when sliding found no wall to hug.
fn stair_step(sim: &mut Sim, level: &Level, ent: Entity, m: &Mobj, fx: &mut MobjActions) {
    if !try_move(sim, level, ent, m.x, m.y + m.momy, fx) {
        try_move(sim, level, ent, m.x + m.momx, m.y, fx);
    }
}

/// Deflect the blocked fraction of a move along the wall it hit.
fn hit_slide_line(level: &Level, m: &Mobj, ld: &Linedef, tmx: &mut Fixed, tmy: &mut Fixed) {
    if ld.slope == SlopeType::Horizontal {
        *tmy = 0;
        return;
    }
    if ld.slope == SlopeType::Vertical {
        *tmx = 0;
        return;
    }

    let side = point_on_line_side(level, m.x, m.y, ld);
    let mut lineangle = point_to_angle2(0, 0, ld.dx, ld.dy);
    if side == 1 {
        lineangle = lineangle.wrapping_add(ANG180);
    }

    let moveangle = point_to_angle2(0, 0, *tmx, *tmy);
    let mut deltaangle = moveangle.wrapping_sub(lineangle);
    if deltaangle > ANG180 {
        deltaangle = deltaangle.wrapping_add(ANG180);
    }

    let lineangle = (lineangle >> ANGLETOFINESHIFT) as usize;
    let deltaangle = (deltaangle >> ANGLETOFINESHIFT) as usize;

    let movelen = approx_distance(*tmx, *tmy);
    let newlen = fixed_mul(movelen, fine_cosine(deltaangle));

    *tmx = fixed_mul(newlen, fine_cosine(lineangle));
    *tmy = fixed_mul(newlen, fine_sine(lineangle));
}

/* ─────────────────────────── corpse torque ───────────────────────────── */

/// Nudge a corpse that hangs more than halfway off a ledge until it falls.
pub(crate) fn apply_torque(sim: &mut Sim, level: &Level, _ent: Entity, m: &mut Mobj) {
    let center_sector = level.sector_at(m.x, m.y);
    let under = level.sectors[center_sector as usize].floorh;

    if m.z <= under {
        m.falling = false;
        m.gear = 0;
        return; // fully supported
    }

    // find the ledge edge: a line of the low sector with differing floors
    for &li in &level.sectors[center_sector as usize].lines {
        let ld = &level.linedefs[li as usize];
        let Some(back) = ld.back_sector else { continue };
        let front_f = level.sectors[ld.front_sector as usize].floorh;
        let back_f = level.sectors[back as usize].floorh;
        if front_f == back_f {
            continue;
        }
        // corpse box must reach the line
        if m.x + m.radius < ld.bbox[BOXLEFT]
            || m.x - m.radius > ld.bbox[BOXRIGHT]
            || m.y + m.radius < ld.bbox[BOXBOTTOM]
            || m.y - m.radius > ld.bbox[BOXTOP]
        {
            continue;
        }

        /* push perpendicular to the ledge, toward the centre's side */
        let side = point_on_line_side(level, m.x, m.y, ld);
        let lineangle = point_to_angle2(0, 0, ld.dx, ld.dy);
        let normal = if side == 0 {
            lineangle.wrapping_sub(ANG90)
        } else {
            lineangle.wrapping_add(ANG90)
        };
        let fine = to_fine(normal);

        // thrust ramps up the longer the corpse teeters
        let thrust = (FRACUNIT >> 4) << m.gear.min(4);
        m.momx += fixed_mul(thrust, fine_cosine(fine));
        m.momy += fixed_mul(thrust, fine_sine(fine));

        m.falling = true;
        m.gear = (m.gear + 1).min(16);
        m.geartics -= 1;
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::mobjinfo::MobjType;
    use crate::level::setup::fixture::load_square;
    use crate::sim::mobj::spawn_mobj;
    use crate::sim::tic::{Sim, SimOptions};
    use crate::sim::{ONFLOORZ, TicCmd};

    #[test]
    fn try_move_within_room_succeeds() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::TROOP,
            100 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        let mut fx = MobjActions::new();
        assert!(try_move(&mut sim, &level, ent, 120 * FRACUNIT, 100 * FRACUNIT, &mut fx));
        let m = sim.mobj(ent).unwrap();
        assert_eq!(m.x, 120 * FRACUNIT);
    }

    #[test]
    fn try_move_into_wall_fails() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::TROOP,
            100 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        let mut fx = MobjActions::new();
        // radius 20 cannot stand 4 units from the west wall
        assert!(!try_move(&mut sim, &level, ent, 4 * FRACUNIT, 100 * FRACUNIT, &mut fx));
        let m = sim.mobj(ent).unwrap();
        assert_eq!(m.x, 100 * FRACUNIT, "failed move must not relocate");
    }

    #[test]
    fn solid_things_block_each_other() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let a = spawn_mobj(
            &mut sim,
            &level,
            MobjType::TROOP,
            100 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        let _b = spawn_mobj(
            &mut sim,
            &level,
            MobjType::BARREL,
            160 * FRACUNIT,
            100 * FRACUNIT,
            ONFLOORZ,
        );
        let mut fx = MobjActions::new();
        // troop radius 20 + barrel radius 10: 150 is within 30 of 160
        assert!(!try_move(&mut sim, &level, a, 150 * FRACUNIT, 100 * FRACUNIT, &mut fx));
        assert!(try_move(&mut sim, &level, a, 120 * FRACUNIT, 100 * FRACUNIT, &mut fx));
    }

    #[test]
    fn gravity_pulls_airborne_things_down() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::BARREL,
            100 * FRACUNIT,
            100 * FRACUNIT,
            64 * FRACUNIT,
        );
        let mut fx = MobjActions::new();
        z_movement(&mut sim, &level, ent, &mut fx);
        let m = sim.mobj(ent).unwrap();
        // first airborne tic applies doubled gravity
        assert_eq!(m.momz, -2 * GRAVITY);
        z_movement(&mut sim, &level, ent, &mut fx);
        assert!(sim.mobj(ent).unwrap().z < 64 * FRACUNIT);
    }

    #[test]
    fn missile_into_sky_wall_is_removed_silently() {
        // two-sector fixture would be ideal; the square room has no sky,
        // so exercise the plain explode path and the thinker bookkeeping
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        sim.spawn_map_things(&level);
        sim.ticker(&level, &[TicCmd::default()]);
        let before = sim.thinkers.len();

        let ent = spawn_mobj(
            &mut sim,
            &level,
            MobjType::ROCKET,
            200 * FRACUNIT,
            128 * FRACUNIT,
            32 * FRACUNIT,
        );
        {
            let mut m = sim.mobj(ent).unwrap();
            m.momx = 40 * FRACUNIT; // straight at the east wall
            sim.put_mobj(ent, m);
        }
        // a few tics: flight, impact, explosion frames, removal
        for _ in 0..40 {
            sim.ticker(&level, &[TicCmd::default()]);
        }
        assert_eq!(sim.thinkers.len(), before, "missile must fully retire");
    }
}
