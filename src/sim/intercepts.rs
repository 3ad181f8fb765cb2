//! Trace lines through the blockmap: the machinery behind hitscan attacks,
//! wall sliding and splash-damage sight checks.
//!
//! A trace walks the blocks its segment touches, gathers every line and
//! thing crossing, sorts them by fractional distance and visits them in
//! order until a visitor says stop.

use crate::defs::flags::MobjFlags;
use crate::fixed::{FRACBITS, FRACUNIT, Fixed, fixed_div, fixed_mul};
use crate::level::{Level, LinedefId, MAPBLOCKSIZE, MAPBLOCKSHIFT};
use crate::sim::mobj::{self, Effect, MobjActions};
use crate::sim::movement::line_opening;
use crate::sim::spatial::ThingStub;
use crate::sim::tic::{Mobj, Sim};
use crate::sim::MELEERANGE;
use crate::tables::{Angle, fine_cosine, fine_sine, to_fine};
use hecs::Entity;
use smallvec::SmallVec;

/// A parametric trace line.
#[derive(Clone, Copy, Debug, Default)]
pub struct Divline {
    pub x: Fixed,
    pub y: Fixed,
    pub dx: Fixed,
    pub dy: Fixed,
}

impl Divline {
    /// 0 = front, 1 = back, with the same shortcuts as the node test.
    pub fn point_on_side(&self, x: Fixed, y: Fixed) -> usize {
        if self.dx == 0 {
            if x <= self.x {
                return (self.dy > 0) as usize;
            }
            return (self.dy < 0) as usize;
        }
        if self.dy == 0 {
            if y <= self.y {
                return (self.dx < 0) as usize;
            }
            return (self.dx > 0) as usize;
        }

        let dx = x.wrapping_sub(self.x);
        let dy = y.wrapping_sub(self.y);
        let left = fixed_mul(self.dy >> FRACBITS, dx);
        let right = fixed_mul(dy, self.dx >> FRACBITS);
        if right < left { 0 } else { 1 }
    }
}

/// Fraction along `trace` where it crosses `other`; negative when parallel
/// or behind.
fn intercept_vector(trace: &Divline, other: &Divline) -> Fixed {
    let den = fixed_mul(trace.dy >> 8, other.dx) - fixed_mul(trace.dx >> 8, other.dy);
    if den == 0 {
        return 0;
    }
    let num = fixed_mul((trace.x - other.x) >> 8, trace.dy)
        + fixed_mul((other.y - trace.y) >> 8, trace.dx);
    fixed_div(num, den)
}

#[derive(Clone, Copy, Debug)]
pub enum InterceptTarget {
    Line(LinedefId),
    Thing(Entity),
}

#[derive(Clone, Copy, Debug)]
pub struct Intercept {
    pub frac: Fixed,
    pub target: InterceptTarget,
}

/* ─────────────────────────── path traversal ──────────────────────────── */

/// Walk `(x1,y1)`-`(x2,y2)`, visiting crossings nearest-first until the
/// visitor returns `false`.  Returns `true` when the walk ran to the end.
pub(crate) fn path_traverse<F>(
    sim: &mut Sim,
    level: &Level,
    mut x1: Fixed,
    mut y1: Fixed,
    x2: Fixed,
    y2: Fixed,
    add_lines: bool,
    add_things: bool,
    mut visit: F,
) -> bool
where
    F: FnMut(&mut Sim, &Level, &Intercept) -> bool,
{
    let bm = &level.blockmap;

    // never sit exactly on a block boundary
    if ((x1 - bm.origin_x) & (MAPBLOCKSIZE - 1)) == 0 {
        x1 += FRACUNIT;
    }
    if ((y1 - bm.origin_y) & (MAPBLOCKSIZE - 1)) == 0 {
        y1 += FRACUNIT;
    }

    let trace = Divline {
        x: x1,
        y: y1,
        dx: x2 - x1,
        dy: y2 - y1,
    };

    let mut intercepts: Vec<Intercept> = Vec::with_capacity(32);

    /* gather lines */
    if add_lines {
        sim.stamp += 1;
        let stamp = sim.stamp;

        // map-relative coordinates; >> 7 turns fixed units into 16.16 blocks
        let rx1 = x1 - bm.origin_x;
        let ry1 = y1 - bm.origin_y;
        let rx2 = x2 - bm.origin_x;
        let ry2 = y2 - bm.origin_y;
        const BTOFRAC: u32 = MAPBLOCKSHIFT - FRACBITS;

        let xt1 = (rx1 as i64) >> MAPBLOCKSHIFT;
        let yt1 = (ry1 as i64) >> MAPBLOCKSHIFT;
        let xt2 = (rx2 as i64) >> MAPBLOCKSHIFT;
        let yt2 = (ry2 as i64) >> MAPBLOCKSHIFT;

        let (mapxstep, partial, ystep);
        if xt2 > xt1 {
            mapxstep = 1i64;
            partial = FRACUNIT - ((rx1 >> BTOFRAC) & (FRACUNIT - 1));
            ystep = fixed_div(y2 - y1, (x2 - x1).abs());
        } else if xt2 < xt1 {
            mapxstep = -1;
            partial = (rx1 >> BTOFRAC) & (FRACUNIT - 1);
            ystep = fixed_div(y2 - y1, (x2 - x1).abs());
        } else {
            mapxstep = 0;
            partial = FRACUNIT;
            ystep = 256 * FRACUNIT;
        }
        let mut yintercept = (ry1 >> BTOFRAC) + fixed_mul(partial, ystep);

        let (mapystep, partial, xstep);
        if yt2 > yt1 {
            mapystep = 1i64;
            partial = FRACUNIT - ((ry1 >> BTOFRAC) & (FRACUNIT - 1));
            xstep = fixed_div(x2 - x1, (y2 - y1).abs());
        } else if yt2 < yt1 {
            mapystep = -1;
            partial = (ry1 >> BTOFRAC) & (FRACUNIT - 1);
            xstep = fixed_div(x2 - x1, (y2 - y1).abs());
        } else {
            mapystep = 0;
            partial = FRACUNIT;
            xstep = 256 * FRACUNIT;
        }
        let mut xintercept = (rx1 >> BTOFRAC) + fixed_mul(partial, xstep);

        let mut mapx = xt1;
        let mut mapy = yt1;

        for _ in 0..64 {
            for &li in bm.lines_in(mapx as i32, mapy as i32) {
                if sim.line_stamp[li as usize] == stamp {
                    continue;
                }
                sim.line_stamp[li as usize] = stamp;

                let ld = &level.linedefs[li as usize];
                let v1 = &level.vertices[ld.v1 as usize];
                let s1 = trace.point_on_side(v1.x, v1.y);
                let v2 = &level.vertices[ld.v2 as usize];
                let s2 = trace.point_on_side(v2.x, v2.y);
                if s1 == s2 {
                    continue; // does not cross the trace
                }

                let dl = Divline {
                    x: v1.x,
                    y: v1.y,
                    dx: ld.dx,
                    dy: ld.dy,
                };
                let frac = intercept_vector(&trace, &dl);
                if frac < 0 {
                    continue;
                }
                intercepts.push(Intercept {
                    frac,
                    target: InterceptTarget::Line(li),
                });
            }

            if mapx == xt2 && mapy == yt2 {
                break;
            }
            if (yintercept >> FRACBITS) as i64 == mapy {
                yintercept += ystep;
                mapx += mapxstep;
            } else if (xintercept >> FRACBITS) as i64 == mapx {
                xintercept += xstep;
                mapy += mapystep;
            } else {
                // ambiguous corner: step both, matching the original
                yintercept += ystep;
                mapx += mapxstep;
                xintercept += xstep;
                mapy += mapystep;
            }
        }
    }

    /* gather things */
    if add_things {
        let tracepositive = (trace.dx ^ trace.dy) > 0;
        let min_x = x1.min(x2);
        let max_x = x1.max(x2);
        let min_y = y1.min(y2);
        let max_y = y1.max(y2);

        let mut stubs: SmallVec<[ThingStub; 16]> = SmallVec::new();
        sim.grid.for_each_in_bbox(
            min_x - MAPBLOCKSIZE,
            min_y - MAPBLOCKSIZE,
            max_x + MAPBLOCKSIZE,
            max_y + MAPBLOCKSIZE,
            |stub| {
                stubs.push(*stub);
                true
            },
        );

        for stub in stubs {
            // check a diagonal of the thing's box against the trace
            let (tx1, ty1, tx2, ty2) = if tracepositive {
                (
                    stub.x - stub.radius,
                    stub.y + stub.radius,
                    stub.x + stub.radius,
                    stub.y - stub.radius,
                )
            } else {
                (
                    stub.x - stub.radius,
                    stub.y - stub.radius,
                    stub.x + stub.radius,
                    stub.y + stub.radius,
                )
            };
            let s1 = trace.point_on_side(tx1, ty1);
            let s2 = trace.point_on_side(tx2, ty2);
            if s1 == s2 {
                continue;
            }

            let dl = Divline {
                x: tx1,
                y: ty1,
                dx: tx2 - tx1,
                dy: ty2 - ty1,
            };
            let frac = intercept_vector(&trace, &dl);
            if frac < 0 {
                continue;
            }
            intercepts.push(Intercept {
                frac,
                target: InterceptTarget::Thing(stub.ent),
            });
        }
    }

    /* visit nearest-first */
    intercepts.sort_by_key(|ic| ic.frac);
    for ic in &intercepts {
        if ic.frac > FRACUNIT {
            continue;
        }
        if !visit(sim, level, ic) {
            return false;
        }
    }
    true
}

/* ───────────────────────────── aiming ────────────────────────────────── */

#[derive(Clone, Copy, Debug, Default)]
pub struct AimResult {
    pub target: Option<Entity>,
    pub slope: Fixed,
}

/// Autoaim: scan along `angle` for the first shootable thing within the
/// vertical aim window.
pub fn aim_line_attack(
    sim: &mut Sim,
    level: &Level,
    shooter: Entity,
    angle: Angle,
    distance: Fixed,
) -> AimResult {
    let Some(sh) = sim.mobj(shooter) else {
        return AimResult::default();
    };
    let fine = to_fine(angle);
    let x2 = sh.x + (distance >> FRACBITS) * fine_cosine(fine);
    let y2 = sh.y + (distance >> FRACBITS) * fine_sine(fine);
    let shootz = sh.z + (sh.height >> 1) + 8 * FRACUNIT;

    // can't shoot outside the 45 degree view pitch
    let mut topslope = 100 * FRACUNIT / 160;
    let mut bottomslope = -100 * FRACUNIT / 160;

    let mut result = AimResult::default();

    path_traverse(sim, level, sh.x, sh.y, x2, y2, true, true, |sim, level, ic| {
        match ic.target {
            InterceptTarget::Line(li) => {
                let ld = &level.linedefs[li as usize];
                if ld.back_sector.is_none() {
                    return false; // stop at a solid wall
                }
                let (opentop, openbottom, openrange, _low) = line_opening(level, ld);
                if openrange <= 0 {
                    return false;
                }
                let dist = fixed_mul(distance, ic.frac);
                let front = &level.sectors[ld.front_sector as usize];
                let back = &level.sectors[ld.back_sector.unwrap() as usize];
                if front.floorh != back.floorh {
                    let slope = fixed_div(openbottom - shootz, dist);
                    if slope > bottomslope {
                        bottomslope = slope;
                    }
                }
                if front.ceilh != back.ceilh {
                    let slope = fixed_div(opentop - shootz, dist);
                    if slope < topslope {
                        topslope = slope;
                    }
                }
                topslope > bottomslope
            }
            InterceptTarget::Thing(ent) => {
                if ent == shooter {
                    return true;
                }
                let Some(t) = sim.mobj(ent) else { return true };
                if !t.flags.contains(MobjFlags::SHOOTABLE) {
                    return true;
                }
                let dist = fixed_mul(distance, ic.frac);
                if dist == 0 {
                    return true;
                }
                let thingtop = fixed_div(t.z + t.height - shootz, dist);
                if thingtop < bottomslope {
                    return true; // shot over
                }
                let thingbottom = fixed_div(t.z - shootz, dist);
                if thingbottom > topslope {
                    return true; // shot under
                }
                let thingtop = thingtop.min(topslope);
                let thingbottom = thingbottom.max(bottomslope);
                result.target = Some(ent);
                result.slope = (thingtop + thingbottom) / 2;
                false
            }
        }
    });

    result
}

/* ─────────────────────────── shooting ────────────────────────────────── */

/// Instant-hit attack along `angle`/`slope`; puffs on walls, blood and
/// damage on things.
pub fn line_attack(
    sim: &mut Sim,
    level: &Level,
    shooter: Entity,
    angle: Angle,
    distance: Fixed,
    slope: Fixed,
    damage: i32,
) -> Option<Entity> {
    let Some(sh) = sim.mobj(shooter) else {
        return None;
    };
    let fine = to_fine(angle);
    let x2 = sh.x + (distance >> FRACBITS) * fine_cosine(fine);
    let y2 = sh.y + (distance >> FRACBITS) * fine_sine(fine);
    let shootz = sh.z + (sh.height >> 1) + 8 * FRACUNIT;

    let trace = Divline {
        x: sh.x,
        y: sh.y,
        dx: x2 - sh.x,
        dy: y2 - sh.y,
    };

    let mut hit: Option<Entity> = None;
    let mut puff_at: Option<(Fixed, Fixed, Fixed)> = None;
    let mut blood_at: Option<(Fixed, Fixed, Fixed)> = None;
    let mut fx = MobjActions::new();

    path_traverse(sim, level, sh.x, sh.y, x2, y2, true, true, |sim, level, ic| {
        match ic.target {
            InterceptTarget::Line(li) => {
                let ld = &level.linedefs[li as usize];

                let mut solid = ld.back_sector.is_none();
                if !solid {
                    let (opentop, openbottom, openrange, _low) = line_opening(level, ld);
                    if openrange <= 0 {
                        solid = true;
                    } else {
                        let dist = fixed_mul(distance, ic.frac);
                        let front = &level.sectors[ld.front_sector as usize];
                        let back = &level.sectors[ld.back_sector.unwrap() as usize];
                        if front.floorh != back.floorh
                            && fixed_div(openbottom - shootz, dist) > slope
                        {
                            solid = true;
                        }
                        if front.ceilh != back.ceilh
                            && fixed_div(opentop - shootz, dist) < slope
                        {
                            solid = true;
                        }
                    }
                }
                if !solid {
                    return true; // shot continues past this line
                }

                /* impact: back off along the trace and place a puff */
                let frac = ic.frac - fixed_div(4 * FRACUNIT, distance);
                let x = trace.x + fixed_mul(trace.dx, frac);
                let y = trace.y + fixed_mul(trace.dy, frac);
                let z = shootz + fixed_mul(slope, fixed_mul(frac, distance));

                let front = &level.sectors[ld.front_sector as usize];
                if front.ceilpic == level.sky_flat {
                    // never puff against the sky
                    if z > front.ceilh {
                        return false;
                    }
                    if let Some(back) = ld.back_sector {
                        if level.sectors[back as usize].ceilpic == level.sky_flat {
                            return false;
                        }
                    }
                }
                puff_at = Some((x, y, z));
                false
            }
            InterceptTarget::Thing(ent) => {
                if ent == shooter {
                    return true;
                }
                let Some(t) = sim.mobj(ent) else { return true };
                if !t.flags.contains(MobjFlags::SHOOTABLE) {
                    return true;
                }

                let dist = fixed_mul(distance, ic.frac);
                if dist == 0 {
                    return true;
                }
                if fixed_div(t.z + t.height - shootz, dist) < slope {
                    return true;
                }
                if fixed_div(t.z - shootz, dist) > slope {
                    return true;
                }

                /* hit: spawn gore and queue the damage */
                let frac = ic.frac - fixed_div(10 * FRACUNIT, distance);
                let x = trace.x + fixed_mul(trace.dx, frac);
                let y = trace.y + fixed_mul(trace.dy, frac);
                let z = shootz + fixed_mul(slope, fixed_mul(frac, distance));

                if t.flags.contains(MobjFlags::NOBLOOD) {
                    puff_at = Some((x, y, z));
                } else {
                    blood_at = Some((x, y, z));
                }
                fx.push(Effect::Damage {
                    target: ent,
                    inflictor: Some(shooter),
                    source: Some(shooter),
                    damage,
                });
                hit = Some(ent);
                false
            }
        }
    });

    if let Some((x, y, z)) = puff_at {
        mobj::spawn_puff(sim, level, x, y, z, distance);
    }
    if let Some((x, y, z)) = blood_at {
        mobj::spawn_blood(sim, level, x, y, z, damage);
    }
    mobj::run_effects(sim, level, fx);
    hit
}

/* ─────────────────────── splash-damage sight ─────────────────────────── */

/// Cheap line-of-sight: the straight path crosses no solid or closed line.
pub(crate) fn sight_clear(sim: &mut Sim, level: &Level, from: &Mobj, to: &ThingStub) -> bool {
    let midz = to.z + (to.height >> 1);
    path_traverse(
        sim,
        level,
        from.x,
        from.y,
        to.x,
        to.y,
        true,
        false,
        |_sim, level, ic| {
            let InterceptTarget::Line(li) = ic.target else {
                return true;
            };
            let ld = &level.linedefs[li as usize];
            if ld.back_sector.is_none() {
                return false;
            }
            let (opentop, openbottom, openrange, _low) = line_opening(level, ld);
            if openrange <= 0 {
                return false;
            }
            midz >= openbottom && midz <= opentop
        },
    )
}

/// A melee-range autoaim plus strike, shared by fist and chainsaw.
pub fn melee_attack(
    sim: &mut Sim,
    level: &Level,
    shooter: Entity,
    angle: Angle,
    range: Fixed,
    damage: i32,
) -> Option<Entity> {
    debug_assert!(range <= MELEERANGE + FRACUNIT);
    let aim = aim_line_attack(sim, level, shooter, angle, range);
    line_attack(sim, level, shooter, angle, range, aim.slope, damage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::mobjinfo::MobjType;
    use crate::level::setup::fixture::load_square;
    use crate::sim::mobj::spawn_mobj;
    use crate::sim::tic::{Sim, SimOptions};
    use crate::sim::ONFLOORZ;

    #[test]
    fn divline_sides() {
        let north = Divline {
            x: 0,
            y: 0,
            dx: 0,
            dy: FRACUNIT,
        };
        assert_eq!(north.point_on_side(FRACUNIT, 0), 0);
        assert_eq!(north.point_on_side(-FRACUNIT, 0), 1);
    }

    #[test]
    fn trace_hits_the_far_wall() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let mut lines = Vec::new();
        path_traverse(
            &mut sim,
            &level,
            128 * FRACUNIT,
            128 * FRACUNIT,
            400 * FRACUNIT,
            128 * FRACUNIT,
            true,
            false,
            |_s, _l, ic| {
                if let InterceptTarget::Line(li) = ic.target {
                    lines.push(li);
                }
                true
            },
        );
        assert!(!lines.is_empty(), "east wall must intercept the trace");
    }

    #[test]
    fn aim_finds_a_monster_ahead() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let shooter = spawn_mobj(
            &mut sim,
            &level,
            MobjType::PLAYER,
            64 * FRACUNIT,
            128 * FRACUNIT,
            ONFLOORZ,
        );
        let victim = spawn_mobj(
            &mut sim,
            &level,
            MobjType::POSSESSED,
            192 * FRACUNIT,
            128 * FRACUNIT,
            ONFLOORZ,
        );
        let aim = aim_line_attack(&mut sim, &level, shooter, 0, 32 * 64 * FRACUNIT);
        assert_eq!(aim.target, Some(victim));
    }

    #[test]
    fn line_attack_damages_the_target() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let shooter = spawn_mobj(
            &mut sim,
            &level,
            MobjType::PLAYER,
            64 * FRACUNIT,
            128 * FRACUNIT,
            ONFLOORZ,
        );
        let victim = spawn_mobj(
            &mut sim,
            &level,
            MobjType::POSSESSED,
            192 * FRACUNIT,
            128 * FRACUNIT,
            ONFLOORZ,
        );
        let before = sim.mobj(victim).unwrap().health;
        let hit = line_attack(&mut sim, &level, shooter, 0, 32 * 64 * FRACUNIT, 0, 7);
        assert_eq!(hit, Some(victim));
        assert!(sim.mobj(victim).unwrap().health < before);
    }

    #[test]
    fn shot_at_empty_wall_spawns_a_puff() {
        let level = load_square();
        let mut sim = Sim::new(&level, SimOptions::default());
        let shooter = spawn_mobj(
            &mut sim,
            &level,
            MobjType::PLAYER,
            128 * FRACUNIT,
            128 * FRACUNIT,
            ONFLOORZ,
        );
        let before = sim.thinkers.len();
        let hit = line_attack(&mut sim, &level, shooter, 0, 32 * 64 * FRACUNIT, 0, 7);
        assert_eq!(hit, None);
        assert_eq!(sim.thinkers.len(), before + 1, "one puff spawned");
    }
}
