//! Transformation between Cartesian and pure (real solid-harmonic) Gaussians.
//!
//! The pure functions used throughout this crate are Racah-normalised real solid harmonics
//! $`S_{lm}`$, *i.e.* $`\sqrt{4\pi/(2l+1)}\ Y_{lm} r^l`$ expanded in raw Cartesian monomials
//! $`x^{l_x} y^{l_y} z^{l_z}`$. With this convention the transformation is the identity for
//! $`l \leq 1`$, and the residual $`s`$/$`p`$ spherical-harmonic normalisation is carried by
//! [`crate::angmom::common_fac_sp`].

use std::collections::HashMap;

use factorial::Factorial;
use lazy_static::lazy_static;
use ndarray::Array2;
use num::{BigUint, Complex};
use num_traits::{cast::ToPrimitive, Zero};

use crate::angmom::{lex_cart_tuples, n_cart, n_pure};

#[cfg(test)]
#[path = "sh_conversion_tests.rs"]
mod sh_conversion_tests;

/// The largest angular momentum for which pure-transformation matrices are tabulated.
pub const MAX_PURE_L: u32 = 15;

/// Calculates the number of combinations of `n` things taken `r` at a time.
///
/// If $`r > n`$, `0` is returned.
fn combu(nu: u32, ru: u32) -> BigUint {
    if ru > nu {
        BigUint::zero()
    } else {
        (nu - ru + 1..=nu).product::<BigUint>()
            / BigUint::from(ru)
                .checked_factorial()
                .unwrap_or_else(|| panic!("Unable to compute the factorial of {ru}."))
    }
}

/// Calculates the factorial of `n` as an `f64`.
fn factu(n: u32) -> f64 {
    BigUint::from(n)
        .checked_factorial()
        .unwrap_or_else(|| panic!("Unable to compute the factorial of {n}."))
        .to_f64()
        .unwrap_or_else(|| panic!("Unable to convert {n}! to `f64`."))
}

/// Obtains the coefficients expanding the real solid harmonic $`S_{lm}`$ in raw Cartesian
/// monomials $`x^{l_x} y^{l_y} z^{l_z}`$ with $`l_x + l_y + l_z = l`$.
///
/// The expansion starts from the complex Racah-normalised solid harmonic
///
/// ```math
/// R_l^m = \sqrt{(l+m)!\ (l-m)!}
///     \sum_{p} \frac{\left(-\frac{x+\mathbb{i}y}{2}\right)^{p+m}
///                    \left(\frac{x-\mathbb{i}y}{2}\right)^{p} z^{l-m-2p}}
///                   {(p+m)!\ p!\ (l-m-2p)!},
/// ```
///
/// whose binomial expansion is accumulated with exact combinatorial factors, followed by the
/// real combination $`S_{l0} = R_l^0`$,
/// $`S_{lm} = \sqrt{2}\ (-1)^m\ \mathrm{Re}\ R_l^m`$ and
/// $`S_{l,-m} = \sqrt{2}\ (-1)^m\ \mathrm{Im}\ R_l^m`$ for $`m > 0`$, which incorporates the
/// Condon--Shortley phase.
///
/// # Arguments
///
/// * `l` - The angular momentum of the harmonic.
/// * `m` - The order of the harmonic, $`-l \leq m \leq l`$.
///
/// # Returns
///
/// A vector of $`((l_x, l_y, l_z), c)`$ pairs with non-negligible coefficients $`c`$.
pub fn real_solid_harmonic_coeffs(l: u32, m: i32) -> Vec<((u32, u32, u32), f64)> {
    assert!(
        m.unsigned_abs() <= l,
        "m must be between -l and l (inclusive)."
    );
    let mabs = m.unsigned_abs();
    let prefactor = (factu(l + mabs) * factu(l - mabs)).sqrt();

    let mut acc: HashMap<(u32, u32, u32), Complex<f64>> = HashMap::new();
    for p in 0..=((l - mabs) / 2) {
        let pm = p + mabs;
        let lz = l - mabs - 2 * p;
        let denom = factu(pm) * factu(p) * factu(lz);
        // (-(x + iy)/2)^(p+m) expands over a, ((x - iy)/2)^p over b.
        let sign_pm = if pm % 2 == 0 { 1.0 } else { -1.0 };
        let outer = sign_pm / 2f64.powi((pm + p) as i32) / denom;
        for a in 0..=pm {
            let ca = combu(pm, a)
                .to_f64()
                .expect("Unable to convert a binomial coefficient to `f64`.");
            for b in 0..=p {
                let cb = combu(p, b)
                    .to_f64()
                    .expect("Unable to convert a binomial coefficient to `f64`.");
                let lx = a + b;
                let ly = (pm - a) + (p - b);
                let phase = Complex::<f64>::i().powu(pm - a)
                    * (-Complex::<f64>::i()).powu(p - b);
                *acc.entry((lx, ly, lz)).or_insert_with(Complex::<f64>::zero) +=
                    phase * (prefactor * outer * ca * cb);
            }
        }
    }

    let sign = if mabs % 2 == 0 { 1.0 } else { -1.0 };
    let mut coeffs = acc
        .into_iter()
        .filter_map(|(lxyz, c)| {
            let v = if m == 0 {
                c.re
            } else if m > 0 {
                std::f64::consts::SQRT_2 * sign * c.re
            } else {
                std::f64::consts::SQRT_2 * sign * c.im
            };
            (v.abs() > 1e-14).then_some((lxyz, v))
        })
        .collect::<Vec<_>>();
    coeffs.sort_by(|a, b| a.0.cmp(&b.0));
    coeffs
}

/// Constructs the matrix transforming the Cartesian components of angular momentum `l` in
/// lexicographic order into pure components in increasing-$`m`$ order.
///
/// The returned matrix has shape $`(n_{\mathrm{cart}}, 2l+1)`$, so a row vector of Cartesian
/// integrals right-multiplied by it yields the corresponding pure integrals.
#[must_use]
pub fn cart2pure_mat(l: u32) -> Array2<f64> {
    let tuples = lex_cart_tuples(l);
    let index: HashMap<(u32, u32, u32), usize> = tuples
        .iter()
        .enumerate()
        .map(|(i, &t)| (t, i))
        .collect();
    let mut mat = Array2::<f64>::zeros((n_cart(l), n_pure(l)));
    for (col, m) in (-(l as i32)..=(l as i32)).enumerate() {
        for (lxyz, c) in real_solid_harmonic_coeffs(l, m) {
            mat[[index[&lxyz], col]] = c;
        }
    }
    mat
}

lazy_static! {
    static ref CART2PURE_MATS: Vec<Array2<f64>> =
        (0..=MAX_PURE_L).map(cart2pure_mat).collect();
}

/// Returns the cached Cartesian-to-pure transformation matrix of angular momentum `l`.
///
/// # Panics
///
/// Panics if `l` exceeds [`MAX_PURE_L`].
#[must_use]
pub fn cart2pure(l: u32) -> &'static Array2<f64> {
    &CART2PURE_MATS[l as usize]
}
