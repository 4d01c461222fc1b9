//! Angular momentum counting, ordering, and transformation.

pub mod sh_conversion;

/// Alphabetical labels of angular momenta.
pub static ANGMOM_LABELS: [&str; 7] = ["S", "P", "D", "F", "G", "H", "I"];

/// Numbers of Cartesian components $`\frac{(l+1)(l+2)}{2}`$ for angular momenta $`0 \leq l \leq 15`$.
pub static LEN_CART: [usize; 16] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 66, 78, 91, 105, 120, 136,
];

/// Cumulative numbers of Cartesian components over all angular momenta up to and including $`l`$,
/// for $`0 \leq l \leq 15`$.
pub static CUM_LEN_CART: [usize; 16] = [
    1, 4, 10, 20, 35, 56, 84, 120, 165, 220, 286, 364, 455, 560, 680, 816,
];

/// Returns the number of Cartesian components of angular momentum `l`.
#[must_use]
pub fn n_cart(l: u32) -> usize {
    LEN_CART[l as usize]
}

/// Returns the number of pure (real solid-harmonic) components of angular momentum `l`.
#[must_use]
pub fn n_pure(l: u32) -> usize {
    2 * l as usize + 1
}

/// Returns the total number of Cartesian components over all angular momenta in the inclusive
/// range `floorl..=topl`.
#[must_use]
pub fn n_cart_range(floorl: u32, topl: u32) -> usize {
    let below = if floorl > 0 {
        CUM_LEN_CART[(floorl - 1) as usize]
    } else {
        0
    };
    CUM_LEN_CART[topl as usize] - below
}

/// Constructs the sequence of $`(l_x, l_y, l_z)`$ exponent tuples of angular momentum `lcart` in
/// lexicographic order: $`l_x`$ descending, then $`l_y`$ descending.
#[must_use]
pub fn lex_cart_tuples(lcart: u32) -> Vec<(u32, u32, u32)> {
    let mut cart_tuples = Vec::with_capacity(n_cart(lcart));
    for lx in (0..=lcart).rev() {
        for ly in (0..=(lcart - lx)).rev() {
            cart_tuples.push((lx, ly, lcart - lx - ly));
        }
    }
    cart_tuples
}

/// Returns the position of the component $`(l_x, l_y, l_z)`$ within the lexicographic ordering of
/// the Cartesian components of total angular momentum `l`. The $`l_z`$ exponent is implied.
#[must_use]
pub fn cart_index(l: u32, lx: u32, ly: u32) -> usize {
    let d = (l - lx) as usize;
    d * (d + 1) / 2 + (d - ly as usize)
}

/// Returns the common normalisation prefactor of `s` and `p` shells.
///
/// The pure-transformation matrices of [`sh_conversion`] are trivial for $`l \leq 1`$, so the
/// spherical-harmonic normalisation of these shells is carried as an overall factor instead:
/// $`Y_{00} = (4\pi)^{-1/2}`$ for `s` and $`\sqrt{3/(4\pi)}`$ for `p`. Shells with $`l \geq 2`$
/// carry their normalisation inside the transformation matrices and receive a factor of one.
#[must_use]
pub fn common_fac_sp(l: u32) -> f64 {
    match l {
        0 => 0.282_094_791_773_878_14,
        1 => 0.488_602_511_902_919_92,
        _ => 1.0,
    }
}
