//! Separable 3D contraction of gridded weight fields against Gaussian-pair power tables.

use anyhow::{bail, format_err};
use nalgebra::Point3;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, ArrayView2, ArrayViewMut2};

use crate::grid::{LatticeForm, UniformGrid};
use crate::numint::recursion::{expand_axis, gto_cutoff_radius, AxisRange};

#[cfg(test)]
#[path = "contract_tests.rs"]
mod contract_tests;

/// Per-pair scratch views for one primitive-pair contraction, carved from the evaluation arena.
///
/// `xs`, `ys` and `zs` hold the per-axis exponential-power tables, shaped
/// (powers, mesh points); `wyz` holds the x-contracted intermediate, shaped
/// (powers, $`n_y n_z`$); `wz` holds the xy-contracted intermediate, shaped
/// (powers$`^2`$, $`n_z`$). `images` is the growable per-image workspace of the axis recursion.
pub(crate) struct ContractionScratch<'a> {
    pub xs: ArrayViewMut2<'a, f64>,
    pub ys: ArrayViewMut2<'a, f64>,
    pub zs: ArrayViewMut2<'a, f64>,
    pub wyz: ArrayViewMut2<'a, f64>,
    pub wz: ArrayViewMut2<'a, f64>,
    pub images: &'a mut Vec<f64>,
}

/// Indicates whether the two pieces of a wrapped two-image grid slice overlap, in which case the
/// whole cell is populated and the partial-range fast path cannot be used.
fn has_overlap(n0: usize, n1: usize) -> bool {
    n0 < n1
}

/// Evaluates the integrals of one primitive Gaussian pair against the weight field, producing
/// one value per Cartesian component $`(l_x, l_y, l_z)`$ with
/// $`l_{\mathrm{floor}} \leq l_x + l_y + l_z \leq l_{\mathrm{top}}`$, ordered lexicographically
/// by total angular momentum, then $`l_x`$ descending, then $`l_y`$ descending.
///
/// The polynomial factors are referred to the first shell's centre `ri`; the Gaussian factor is
/// centred on the exponent-weighted pair centre. The contraction proceeds axis by axis: the
/// weight field, viewed as an $`(n_x, n_y n_z)`$ matrix, is contracted against the x-power
/// table, the result against the y-power table once per x-power, and finally dotted against the
/// z-power rows. Each axis restricts work to its populated grid slice where the image structure
/// permits: one image uses the slice directly, two non-overlapping wrapped pieces are handled as
/// two partial-range products accumulated together, and anything else falls back to the full
/// mesh.
///
/// # Errors
///
/// Fails with an unsupported-feature error for grids whose lattice is not orthorhombic.
#[allow(clippy::too_many_arguments)]
pub(crate) fn eval_primitive_pair(
    out: &mut [f64],
    floorl: u32,
    topl: u32,
    ai: f64,
    aj: f64,
    ri: &Point3<f64>,
    rj: &Point3<f64>,
    fac: f64,
    log_prec: f64,
    grid: &UniformGrid,
    weights: &ArrayView2<'_, f64>,
    scratch: &mut ContractionScratch<'_>,
) -> Result<(), anyhow::Error> {
    match grid.form() {
        LatticeForm::Orthorhombic => eval_primitive_pair_orth(
            out, floorl, topl, ai, aj, ri, rj, fac, log_prec, grid, weights, scratch,
        ),
        LatticeForm::General => bail!(
            "Integral evaluation over general (non-orthorhombic) lattices is not implemented."
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_primitive_pair_orth(
    out: &mut [f64],
    floorl: u32,
    topl: u32,
    ai: f64,
    aj: f64,
    ri: &Point3<f64>,
    rj: &Point3<f64>,
    fac: f64,
    log_prec: f64,
    grid: &UniformGrid,
    weights: &ArrayView2<'_, f64>,
    scratch: &mut ContractionScratch<'_>,
) -> Result<(), anyhow::Error> {
    let [mx, my, mz] = grid.mesh;
    let l1 = topl as usize + 1;
    let aij = ai + aj;
    let rij = Point3::from((ai * ri.coords + aj * rj.coords) / aij);

    let cutoff = gto_cutoff_radius(aij, topl, fac, log_prec);
    let scale = grid.fractional_scale();

    let tables = [&mut scratch.xs, &mut scratch.ys, &mut scratch.zs];
    let mut ranges = [AxisRange {
        img0: 0,
        img1: 0,
        grid0: 0,
        grid1: 0,
    }; 3];
    for (axis, table) in tables.into_iter().enumerate() {
        ranges[axis] = expand_axis(
            table,
            grid.lattice[(axis, axis)],
            ri[axis],
            rij[axis],
            aij,
            grid.periodic(axis),
            topl,
            rij[axis] * scale[axis],
            cutoff,
            scale[axis],
            scratch.images,
        );
    }

    // An axis with no populated grid points forces the whole contribution to zero.
    if ranges
        .iter()
        .zip(grid.mesh)
        .any(|(range, n)| range.populated_width(n) == 0)
    {
        out.fill(0.0);
        return Ok(());
    }

    // x axis: weights (nx, ny*nz) against the x-power table.
    let (x0, x1) = (ranges[0].grid0, ranges[0].grid1);
    match ranges[0].img_count() {
        1 => general_mat_mul(
            fac,
            &scratch.xs.slice(s![.., x0..x1]),
            &weights.slice(s![x0..x1, ..]),
            0.0,
            &mut scratch.wyz,
        ),
        2 if !has_overlap(x0, x1) => {
            general_mat_mul(
                fac,
                &scratch.xs.slice(s![.., ..x1]),
                &weights.slice(s![..x1, ..]),
                0.0,
                &mut scratch.wyz,
            );
            general_mat_mul(
                fac,
                &scratch.xs.slice(s![.., x0..]),
                &weights.slice(s![x0.., ..]),
                1.0,
                &mut scratch.wyz,
            );
        }
        _ => general_mat_mul(fac, &scratch.xs, weights, 0.0, &mut scratch.wyz),
    }

    // y axis: one contraction of the (ny, nz) intermediate per x power.
    let (y0, y1) = (ranges[1].grid0, ranges[1].grid1);
    for lx in 0..l1 {
        let wyz_lx = scratch
            .wyz
            .row(lx)
            .into_shape((my, mz))
            .map_err(|err| format_err!(err))?;
        let mut wz_lx = scratch.wz.slice_mut(s![lx * l1..(lx + 1) * l1, ..]);
        match ranges[1].img_count() {
            1 => general_mat_mul(
                1.0,
                &scratch.ys.slice(s![.., y0..y1]),
                &wyz_lx.slice(s![y0..y1, ..]),
                0.0,
                &mut wz_lx,
            ),
            2 if !has_overlap(y0, y1) => {
                general_mat_mul(
                    1.0,
                    &scratch.ys.slice(s![.., ..y1]),
                    &wyz_lx.slice(s![..y1, ..]),
                    0.0,
                    &mut wz_lx,
                );
                general_mat_mul(
                    1.0,
                    &scratch.ys.slice(s![.., y0..]),
                    &wyz_lx.slice(s![y0.., ..]),
                    1.0,
                    &mut wz_lx,
                );
            }
            _ => general_mat_mul(1.0, &scratch.ys, &wyz_lx, 0.0, &mut wz_lx),
        }
    }

    // z axis: dot products over the populated or full range, one per angular component.
    let (z0, z1) = (ranges[2].grid0, ranges[2].grid1);
    let restrict_z = ranges[2].img_count() == 1;
    let mut n = 0;
    for l in floorl..=topl {
        for lx in (0..=l).rev() {
            for ly in (0..=(l - lx)).rev() {
                let lz = l - lx - ly;
                let w_row = scratch.wz.row(lx as usize * l1 + ly as usize);
                let z_row = scratch.zs.row(lz as usize);
                out[n] = if restrict_z {
                    w_row.slice(s![z0..z1]).dot(&z_row.slice(s![z0..z1]))
                } else {
                    w_row.dot(&z_row)
                };
                n += 1;
            }
        }
    }
    debug_assert_eq!(n, out.len());
    Ok(())
}
