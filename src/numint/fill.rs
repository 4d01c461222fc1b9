//! Parallel two-centre matrix filling over shell-pair ranges.

use std::fmt;

use anyhow::{ensure, Context};
use itertools::{iproduct, Itertools};
use ndarray::{s, Array2, ArrayView3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::basis::ao::{ShellBasis, ShellKind};
use crate::grid::{LatticeForm, UniformGrid};
use crate::numint::shell_pair::{eval_shell_pair, required_cache_len, PairScratch};

#[cfg(test)]
#[path = "fill_tests.rs"]
mod fill_tests;

// --------
// FillMode
// --------

/// The closed set of fill policies for two-centre matrices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillMode {
    /// Every shell pair is computed.
    Plain,

    /// Only the upper triangle is computed; the lower triangle is mirrored by copy.
    Hermitian,

    /// Only the upper triangle is computed; the lower triangle is mirrored by negation.
    AntiHermitian,

    /// Only the upper triangle is computed; the lower triangle is mirrored by copy.
    Symmetric,
}

impl FillMode {
    /// Indicates whether this mode computes only the relative upper triangle of the shell-pair
    /// index space.
    fn triangular(self) -> bool {
        !matches!(self, FillMode::Plain)
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillMode::Plain => write!(f, "plain"),
            FillMode::Hermitian => write!(f, "hermitian"),
            FillMode::AntiHermitian => write!(f, "anti-hermitian"),
            FillMode::Symmetric => write!(f, "symmetric"),
        }
    }
}

// ----------------------
// Two-centre fill driver
// ----------------------

/// Populates a dense two-centre integral matrix over rectangular shell ranges.
///
/// The `nish × njsh` shell-pair index space is distributed over `rayon` workers, each owning a
/// private scratch arena sized once for the whole range. Every worker produces independent
/// shell-pair blocks; the blocks are assembled into the output matrix after the parallel loop
/// has completed, and for the triangular fill modes the lower triangle is mirrored only after
/// that assembly, since it reads values the pair loop produced. Shell pairs whose primitives
/// were all screened out leave their zero-initialised block untouched.
///
/// # Arguments
///
/// * `basis` - The shell basis.
/// * `ish` - The bra shell range `[ish.0, ish.1)`.
/// * `jsh` - The ket shell range `[jsh.0, jsh.1)`; must equal `ish` for triangular fill modes.
/// * `kind` - The function kind of the output matrix.
/// * `fill` - The fill policy.
/// * `grid` - The mesh and lattice description.
/// * `weights` - The weight field, shaped like the mesh.
/// * `log_prec` - The natural logarithm of the target absolute precision.
///
/// # Returns
///
/// The dense (bra functions $`\times`$ ket functions) matrix of the shell ranges.
///
/// # Errors
///
/// Errors on out-of-range shell indices, mismatched weight-field shape, triangular fill over
/// unequal ranges, or a non-orthorhombic lattice.
#[allow(clippy::too_many_arguments)]
pub fn fill_two_center(
    basis: &ShellBasis,
    ish: (usize, usize),
    jsh: (usize, usize),
    kind: ShellKind,
    fill: FillMode,
    grid: &UniformGrid,
    weights: ArrayView3<'_, f64>,
    log_prec: f64,
) -> Result<Array2<f64>, anyhow::Error> {
    let (ish0, ish1) = ish;
    let (jsh0, jsh1) = jsh;
    ensure!(
        ish0 <= ish1 && ish1 <= basis.n_shells() && jsh0 <= jsh1 && jsh1 <= basis.n_shells(),
        "Shell ranges [{ish0}, {ish1}) and [{jsh0}, {jsh1}) exceed the {} shells of the basis.",
        basis.n_shells()
    );
    ensure!(
        weights.dim() == (grid.mesh[0], grid.mesh[1], grid.mesh[2]),
        "The weight field has shape {:?} but the mesh is {:?}.",
        weights.dim(),
        grid.mesh
    );
    ensure!(
        grid.form() == LatticeForm::Orthorhombic,
        "Integral evaluation over general (non-orthorhombic) lattices is not implemented."
    );
    if fill.triangular() {
        ensure!(
            ish == jsh,
            "The {fill} fill mode requires identical bra and ket shell ranges."
        );
    }

    let bounds = basis.function_boundaries(kind);
    let i_off = bounds.get(ish0).map_or(0, |b| b.0);
    let j_off = bounds.get(jsh0).map_or(0, |b| b.0);
    let naoi = if ish1 > ish0 {
        bounds[ish1 - 1].1 - i_off
    } else {
        0
    };
    let naoj = if jsh1 > jsh0 {
        bounds[jsh1 - 1].1 - j_off
    } else {
        0
    };

    // One generous scratch per worker, sized for the largest pair of the whole range so that it
    // can be reused without reallocation.
    let cache_len = iproduct!(ish0..ish1, jsh0..jsh1)
        .map(|(i, j)| required_cache_len(&basis[i], &basis[j], &grid.mesh))
        .max()
        .unwrap_or(0);

    let pairs = iproduct!(ish0..ish1, jsh0..jsh1)
        .filter(|&(i, j)| !fill.triangular() || i - ish0 <= j - jsh0)
        .collect_vec();

    let blocks = pairs
        .into_par_iter()
        .map_init(
            || PairScratch::with_len(cache_len),
            |scratch, (i, j)| {
                log::debug!("Working on shell pair ({i}, {j}).");
                eval_shell_pair(
                    &basis[i],
                    &basis[j],
                    kind,
                    grid,
                    weights.view(),
                    1.0,
                    log_prec,
                    scratch,
                )
                .map(|block| (i, j, block))
                .with_context(|| format!("Shell pair ({i}, {j}) could not be evaluated."))
            },
        )
        .collect::<Result<Vec<_>, _>>()?;

    let mut mat = Array2::<f64>::zeros((naoi, naoj));
    for (i, j, block) in blocks {
        if let Some(block) = block {
            let (r0, r1) = (bounds[i].0 - i_off, bounds[i].1 - i_off);
            let (c0, c1) = (bounds[j].0 - j_off, bounds[j].1 - j_off);
            mat.slice_mut(s![r0..r1, c0..c1]).assign(&block);
        }
    }

    match fill {
        FillMode::Plain => {}
        FillMode::Hermitian | FillMode::Symmetric => symmetrise(&mut mat, false),
        FillMode::AntiHermitian => symmetrise(&mut mat, true),
    }
    Ok(mat)
}

/// Convenience wrapper computing the overlap-type matrix of the whole basis against the weight
/// field.
pub fn overlap_matrix(
    basis: &ShellBasis,
    kind: ShellKind,
    fill: FillMode,
    grid: &UniformGrid,
    weights: ArrayView3<'_, f64>,
    log_prec: f64,
) -> Result<Array2<f64>, anyhow::Error> {
    let n = basis.n_shells();
    fill_two_center(basis, (0, n), (0, n), kind, fill, grid, weights, log_prec)
}

/// Mirrors the strict upper triangle into the lower triangle, copying or negating. The mirrored
/// values are bit-for-bit images of the computed ones.
fn symmetrise(mat: &mut Array2<f64>, negate: bool) {
    let n = mat.nrows();
    debug_assert_eq!(n, mat.ncols());
    for i in 0..n {
        for j in (i + 1)..n {
            let v = mat[[i, j]];
            mat[[j, i]] = if negate { -v } else { v };
        }
    }
}
