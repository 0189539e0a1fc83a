/// `B_{2j} / (2j)!` for j = 1..=8, the Euler-Maclaurin correction weights.
const EULER_MACLAURIN: [f64; 8] = [
    1. / 12.,
    -1. / 720.,
    1. / 30240.,
    -1. / 1209600.,
    1. / 47900160.,
    -691. / 1307674368000.,
    1. / 74724249600.,
    -3617. / 10670622842880000.,
];

/// The Euler-Maclaurin tail starts at `q + N >= max(MIN_SHIFT, 2 s)`.
const MIN_SHIFT: f64 = 10.;

/// Compute `ln(1 - exp(x))` for `x <= 0` without cancellation.
#[inline]
pub(crate) fn log1mexp(x: f64) -> f64 {
    if x > 0. {
        f64::NAN
    } else if x > -std::f64::consts::LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

/// Natural log of the Hurwitz zeta function `sum_{k >= 0} (q + k)^(-s)`.
///
/// The leading factor `q^(-s)` is pulled out of every term, so the
/// remaining sum is at least one and neither large exponents nor large
/// offsets under- or overflow. A direct sum over the first terms is followed
/// by an Euler-Maclaurin tail.
///
/// Returns NaN unless `s > 1` and `q > 0` are both finite.
pub(crate) fn ln_hurwitz_zeta(s: f64, q: f64) -> f64 {
    if !(s > 1. && q > 0. && s.is_finite() && q.is_finite()) {
        return f64::NAN;
    }
    let ln_q = q.ln();
    let shift = (MIN_SHIFT.max(2. * s) - q).ceil().max(0.);

    let mut sum = 0f64;
    let mut k = 0f64;
    while k < shift {
        let term = (-s * (k / q).ln_1p()).exp();
        sum += term;
        // With large exponents the series is exhausted long before the
        // shifted tail starts.
        if term <= sum * f64::EPSILON * 1e-3 {
            return sum.ln() - s * ln_q;
        }
        k += 1.;
    }

    let a = q + shift;
    let lead = (-s * (shift / q).ln_1p()).exp();
    let inv_a2 = (a * a).recip();
    let mut poch = s / a;
    let mut correction = 0f64;
    for (j, weight) in EULER_MACLAURIN.iter().enumerate() {
        correction += weight * poch;
        let m = 2. * j as f64 + 1.;
        poch *= (s + m) * (s + m + 1.) * inv_a2;
    }
    sum += lead * (a / (s - 1.) + 0.5 + correction);
    sum.ln() - s * ln_q
}
