//! Binary angles and the classic fine-angle trig tables.
//!
//! * Angles are unsigned 32-bit "binary angle measurement": the full circle
//!   is the whole `u32` range, so wrap-around is plain wrapping arithmetic.
//! * The high bits index 8192-entry sine/tangent tables
//!   (`ANGLETOFINESHIFT = 19`).
//! * Tables are generated once at startup.  Generation only uses IEEE
//!   add/mul/div on fixed polynomial coefficients - no `libm` calls - so the
//!   tables are bit-identical on every platform.

use crate::fixed::Fixed;
use once_cell::sync::Lazy;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
pub const ANGLETOFINESHIFT: u32 = 19;
pub const ANGLETOSKYSHIFT: u32 = 22;

/// Binary angle.  0 = east, counter-clockwise positive.
pub type Angle = u32;

pub const ANG45: Angle = 0x2000_0000;
pub const ANG90: Angle = 0x4000_0000;
pub const ANG180: Angle = 0x8000_0000;
pub const ANG270: Angle = 0xC000_0000;
pub const ANG1: Angle = ANG45 / 45;
pub const ANG5: Angle = ANG90 / 18;
pub const ANG60: Angle = ANG180 / 3;

/// Arctangent lookup resolution used by [`point_to_angle2`].
pub const SLOPERANGE: usize = 2048;

/* ─────────────────────── deterministic generators ─────────────────────── */

/// Taylor sine on `[-PI/2, PI/2]`; max error well under one table ULP.
fn poly_sin(x: f64) -> f64 {
    let x2 = x * x;
    let c = [
        -1.0 / 6.0,
        1.0 / 120.0,
        -1.0 / 5040.0,
        1.0 / 362880.0,
        -1.0 / 39916800.0,
        1.0 / 6227020800.0,
        -1.0 / 1307674368000.0,
        1.0 / 355687428096000.0,
        -1.0 / 121645100408832000.0,
    ];
    let mut acc = 0.0;
    for &k in c.iter().rev() {
        acc = (acc + k) * x2;
    }
    x * (1.0 + acc)
}

/// Sine for any non-negative argument, by quadrant folding.
fn det_sin(x: f64) -> f64 {
    let x = x % (2.0 * PI);
    let q = (x / FRAC_PI_2) as u32;
    let r = x - q as f64 * FRAC_PI_2;
    match q & 3 {
        0 => poly_sin(r),
        1 => poly_sin(FRAC_PI_2 - r),
        2 => -poly_sin(r),
        _ => -poly_sin(FRAC_PI_2 - r),
    }
}

fn det_cos(x: f64) -> f64 {
    det_sin(x + FRAC_PI_2)
}

/// Arctangent on `[0, 1]`, reduced so the series always converges fast.
fn det_atan(t: f64) -> f64 {
    const REDUCE: f64 = 0.414_213_562_373_095_1; // tan(PI/8)
    fn core(z: f64) -> f64 {
        let z2 = z * z;
        let mut acc = 0.0;
        let mut n = 25i32;
        while n >= 3 {
            let sign = if (n / 2) % 2 == 1 { -1.0 } else { 1.0 };
            acc = (acc + sign / n as f64) * z2;
            n -= 2;
        }
        z * (1.0 + acc)
    }
    if t > REDUCE {
        FRAC_PI_4 + core((t - 1.0) / (t + 1.0))
    } else {
        core(t)
    }
}

/* ───────────────────────────── the tables ─────────────────────────────── */

/// Sine table with the extra quarter turn so cosine reads the same array.
static FINESINE: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES + FINEANGLES / 4)
        .map(|i| {
            let a = (i as f64 + 0.5) * 2.0 * PI / FINEANGLES as f64;
            (det_sin(a) * 65536.0) as Fixed
        })
        .collect()
});

/// Tangents for the half-circle `-90°..90°`, clamped at the poles.
static FINETANGENT: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES / 2)
        .map(|i| {
            let a = (i as f64 - 2048.0 + 0.5) * PI / 4096.0;
            let t = det_sin(a + 2.0 * PI) / det_cos(a + 2.0 * PI);
            let t = t * 65536.0;
            if t >= i32::MAX as f64 {
                i32::MAX
            } else if t <= i32::MIN as f64 {
                i32::MIN
            } else {
                t as Fixed
            }
        })
        .collect()
});

/// `tantoangle[i] = atan(i / 2048)` as a binary angle, 2049 entries.
static TANTOANGLE: Lazy<Vec<Angle>> = Lazy::new(|| {
    (0..=SLOPERANGE)
        .map(|i| {
            let a = det_atan(i as f64 / SLOPERANGE as f64);
            (a / (2.0 * PI) * 4294967296.0).round() as i64 as Angle
        })
        .collect()
});

#[inline(always)]
pub fn fine_sine(i: usize) -> Fixed {
    FINESINE[i]
}

#[inline(always)]
pub fn fine_cosine(i: usize) -> Fixed {
    FINESINE[i + FINEANGLES / 4]
}

#[inline(always)]
pub fn fine_tangent(i: usize) -> Fixed {
    FINETANGENT[i]
}

#[inline(always)]
pub fn tan_to_angle(i: usize) -> Angle {
    TANTOANGLE[i]
}

/// Fine-table index for an angle.
#[inline(always)]
pub fn to_fine(a: Angle) -> usize {
    (a >> ANGLETOFINESHIFT) as usize
}

/* ─────────────────────────── angle functions ──────────────────────────── */

/// Tangent slope quantised into `0..=SLOPERANGE` for the atan table.
#[inline]
pub fn slope_div(num: u32, den: u32) -> usize {
    if den < 512 {
        SLOPERANGE
    } else {
        let ans = (((num as u64) << 3) / ((den as u64) >> 8)) as usize;
        ans.min(SLOPERANGE)
    }
}

/// Angle of `(x2, y2)` as seen from `(x1, y1)`: classic eight-octant
/// table lookup.
pub fn point_to_angle2(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Angle {
    let mut x = x2.wrapping_sub(x1);
    let mut y = y2.wrapping_sub(y1);

    if x == 0 && y == 0 {
        return 0;
    }

    if x >= 0 {
        if y >= 0 {
            if x > y {
                tan_to_angle(slope_div(y as u32, x as u32))
            } else {
                ANG90.wrapping_sub(1) - tan_to_angle(slope_div(x as u32, y as u32))
            }
        } else {
            y = -y;
            if x > y {
                tan_to_angle(slope_div(y as u32, x as u32)).wrapping_neg()
            } else {
                ANG270.wrapping_add(tan_to_angle(slope_div(x as u32, y as u32)))
            }
        }
    } else {
        x = -x;
        if y >= 0 {
            if x > y {
                ANG180.wrapping_sub(1) - tan_to_angle(slope_div(y as u32, x as u32))
            } else {
                ANG90.wrapping_add(tan_to_angle(slope_div(x as u32, y as u32)))
            }
        } else {
            y = -y;
            if x > y {
                ANG180.wrapping_add(tan_to_angle(slope_div(y as u32, x as u32)))
            } else {
                ANG270.wrapping_sub(1) - tan_to_angle(slope_div(x as u32, y as u32))
            }
        }
    }
}

/// Overflow-safe variant: if either view-relative delta leaves `i32` range
/// the point is pulled halfway in, preserving the angle.  The only variant
/// used during BSP traversal and seg-angle recomputation.
pub fn point_to_angle2_safe(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Angle {
    let dx = x2 as i64 - x1 as i64;
    let dy = y2 as i64 - y1 as i64;

    if dx < i32::MIN as i64 || dx > i32::MAX as i64 || dy < i32::MIN as i64 || dy > i32::MAX as i64
    {
        let x = (dx / 2 + x1 as i64) as Fixed;
        let y = (dy / 2 + y1 as i64) as Fixed;
        point_to_angle2(x1, y1, x, y)
    } else {
        point_to_angle2(x1, y1, x2, y2)
    }
}

/// Absolute difference between two angles, accounting for wrap-around.
pub fn angle_diff(a: Angle, b: Angle) -> Angle {
    let (a, b) = if b > a { (b, a) } else { (a, b) };
    if a.wrapping_sub(b) < ANG180 {
        a.wrapping_sub(b)
    } else {
        b.wrapping_sub(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_table_head_matches_reference() {
        // first entries of the classic table
        assert_eq!(fine_sine(0), 25);
        assert_eq!(fine_sine(1), 75);
        assert_eq!(fine_sine(2), 125);
    }

    #[test]
    fn sine_peak_and_sign() {
        assert_eq!(fine_sine(2047), 65535);
        assert!(fine_sine(4096) < 0);
        assert_eq!(fine_cosine(0), 65535);
    }

    #[test]
    fn atan_table_endpoints() {
        assert_eq!(tan_to_angle(0), 0);
        assert_eq!(tan_to_angle(SLOPERANGE), ANG45);
        assert_eq!(tan_to_angle(1), 333772);
    }

    #[test]
    fn cardinal_directions() {
        assert_eq!(point_to_angle2(0, 0, 1000, 1000), ANG45 - 1);
        assert_eq!(point_to_angle2(0, 0, 0, 1000), ANG90 - 1);
        // due west lands one ulp short of ANG180, same as the original
        let w = point_to_angle2(0, 0, -1000, 0);
        assert!(w == ANG180 || w == ANG180 - 1);
    }

    #[test]
    fn safe_variant_agrees_in_range() {
        for &(x, y) in &[(1234, 5678), (-400, 9), (777, -777)] {
            assert_eq!(
                point_to_angle2(10, 20, x, y),
                point_to_angle2_safe(10, 20, x, y)
            );
        }
    }

    #[test]
    fn safe_variant_survives_huge_deltas() {
        // would overflow the i32 subtraction in the plain variant
        let a = point_to_angle2_safe(i32::MIN / 2, 0, i32::MAX / 2 + 10, 10);
        // roughly due east
        assert!(a < ANG45 || a > ANG270);
    }

    #[test]
    fn angle_diff_wraps() {
        assert_eq!(angle_diff(ANG45, ANG90), ANG45);
        assert_eq!(angle_diff(ANG90, ANG45), ANG45);
        assert_eq!(angle_diff(0x1000_0000, 0xF000_0000), 0x2000_0000);
    }
}
