use num_traits::ToPrimitive;

/// Error function approximation using Abramowitz and Stegun method
///
/// Absolute error stays below 1.5e-7, which is ample for significance
/// thresholds while avoiding a special-functions dependency.
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254_829_592_f64;
    let a2 = -0.284_496_736_f64;
    let a3 = 1.421_413_741_f64;
    let a4 = -1.453_152_027_f64;
    let a5 = 1.061_405_429_f64;
    let p = 0.327_591_1_f64;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / p.mul_add(x, 1.0);
    let y = (((((a5.mul_add(t, a4)).mul_add(t, a3)).mul_add(t, a2)).mul_add(t, a1)) * t)
        .mul_add(-(-x * x).exp(), 1.0);

    sign * y
}

/// Complementary error function, clamped to [0, 2]
pub fn erfc(x: f64) -> f64 {
    (1.0 - erf(x)).clamp(0.0, 2.0)
}

/// Upper tail of the standard normal distribution: P(Z > z)
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Upper tail of the chi-square distribution with one degree of freedom
pub fn chi_square_sf_1df(statistic: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    erfc((statistic / 2.0).sqrt())
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function for positive arguments (Lanczos)
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection keeps the series in its accurate range
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = LANCZOS_COEFFICIENTS.first().copied().unwrap_or(1.0);
    for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        sum += coefficient / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Natural log of the binomial coefficient C(n, k)
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Log probability of drawing `k` successes in `draws` draws without
/// replacement from a population of `population` items with `successes`
/// successes
pub fn hypergeometric_ln_pmf(k: u64, population: u64, successes: u64, draws: u64) -> f64 {
    if successes > population || draws > population {
        return f64::NEG_INFINITY;
    }
    if k > successes || k > draws || draws - k > population - successes {
        return f64::NEG_INFINITY;
    }
    ln_choose(successes, k) + ln_choose(population - successes, draws - k)
        - ln_choose(population, draws)
}

/// Arithmetic mean of any numeric slice, `None` when empty
pub fn mean<T: ToPrimitive>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().filter_map(ToPrimitive::to_f64).sum();
    Some(sum / values.len() as f64)
}
