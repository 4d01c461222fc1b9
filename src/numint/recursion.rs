//! Per-axis exponential-power tables for separable Gaussian-product integration.

use ndarray::ArrayViewMut2;

#[cfg(test)]
#[path = "recursion_tests.rs"]
mod recursion_tests;

/// Estimates the radius beyond which the tail of a Gaussian of exponent `alpha` scaled by a
/// coefficient of magnitude `c` integrates to less than the requested precision.
///
/// `log_prec` is the natural logarithm of the target absolute error; an 8-unit (roughly three
/// decimal digits) safety margin is applied to it to cover integral prefactors and the
/// polynomial growth of components with angular momentum `_l`. When even the margin-adjusted
/// peak magnitude lies below the precision target, `0` is returned: the pair has no meaningful
/// support anywhere.
#[must_use]
pub fn gto_cutoff_radius(alpha: f64, _l: u32, c: f64, log_prec: f64) -> f64 {
    let log_prec = log_prec - 8.0;
    let prod = c.abs().ln() - log_prec;
    if prod > 0.0 {
        (prod / alpha).sqrt()
    } else {
        0.0
    }
}

// ---------
// AxisRange
// ---------

/// The periodic image range and populated grid-point slice of one axis of a primitive-pair
/// evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AxisRange {
    /// The first (inclusive) periodic image index whose cutoff ball overlaps the cell.
    pub img0: i64,

    /// The last (exclusive) periodic image index whose cutoff ball overlaps the cell.
    pub img1: i64,

    /// The start of the populated grid-point slice within one cell.
    pub grid0: usize,

    /// The end of the populated grid-point slice. For a single image this is an exclusive bound
    /// with `grid0 <= grid1`; for two or more images the populated region may wrap around the
    /// cell boundary, in which case it runs over `[grid0, n)` and `[0, grid1)`.
    pub grid1: usize,
}

impl AxisRange {
    /// The number of periodic images overlapping the cutoff ball. This is zero only when the
    /// cutoff radius is non-positive.
    pub(crate) fn img_count(&self) -> usize {
        usize::try_from(self.img1 - self.img0).unwrap_or(0)
    }

    /// The number of grid points carrying non-negligible values along this axis.
    pub(crate) fn populated_width(&self, n_mesh: usize) -> usize {
        match self.img_count() {
            0 => 0,
            1 => self.grid1 - self.grid0,
            _ => n_mesh,
        }
    }
}

/// Fills `out` with the table of $`\exp[-a_{ij}(x - x_{ij})^2] (x - x_i)^p`$ values over one
/// cell's grid points along one axis, for powers $`0 \leq p \leq l_{\mathrm{top}}`$.
///
/// For a periodic axis the values of every image within the cutoff interval are folded (summed)
/// back into the single-cell table; for an open axis the raw values over the mesh are produced
/// and the populated slice is clamped to the mesh bounds. The zeroth power is generated by a
/// stable two-directional recurrence outward from the grid point nearest the pair centre, using
/// $`\exp[-a(x+\Delta)^2] = \exp[-ax^2] \exp[-2ax\Delta] \exp[-a\Delta^2]`$ so that only three
/// exponential evaluations are needed per axis; higher powers multiply in one factor of
/// $`(x - x_i)`$ at a time.
///
/// # Arguments
///
/// * `out` - The output table, shaped (powers, grid points per cell).
/// * `length` - The cell edge length along this axis.
/// * `xi` - The component of the first shell's centre, the origin of the polynomial factors.
/// * `xij` - The component of the exponent-weighted pair centre.
/// * `aij` - The combined Gaussian exponent.
/// * `periodic` - Whether this axis is periodic.
/// * `topl` - The maximum polynomial power.
/// * `x_frac` - The fractional coordinate of the pair centre along this axis.
/// * `cutoff` - The cutoff radius.
/// * `heights_inv` - The factor converting the cutoff radius into a fractional interval.
/// * `images` - A reusable workspace for the per-image tables; grown on demand.
///
/// # Returns
///
/// The image range and populated grid slice of this axis. When the image count is zero, `out`
/// is cleared and the slice is empty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn expand_axis(
    out: &mut ArrayViewMut2<'_, f64>,
    length: f64,
    xi: f64,
    xij: f64,
    aij: f64,
    periodic: bool,
    topl: u32,
    x_frac: f64,
    cutoff: f64,
    heights_inv: f64,
    images: &mut Vec<f64>,
) -> AxisRange {
    let nx = out.ncols();
    let nxf = nx as f64;
    let l1 = topl as usize + 1;
    debug_assert_eq!(out.nrows(), l1);

    let edge0 = x_frac - cutoff * heights_inv;
    let edge1 = x_frac + cutoff * heights_inv;
    let (img0, img1) = if periodic {
        (edge0.floor() as i64, edge1.ceil() as i64)
    } else {
        (0, 1)
    };
    let nimg = usize::try_from(img1 - img0).unwrap_or(0);

    let raw0 = (edge0 * nxf).floor() as i64;
    let raw1 = (edge1 * nxf).ceil() as i64;
    let (grid0, grid1) = if !periodic {
        (
            raw0.clamp(0, nx as i64) as usize,
            raw1.clamp(0, nx as i64) as usize,
        )
    } else if nimg == 1 {
        // A single populated image cannot wrap, so the slice is exact relative to that image.
        (
            (raw0 - img0 * nx as i64).clamp(0, nx as i64) as usize,
            (raw1 - img0 * nx as i64).clamp(0, nx as i64) as usize,
        )
    } else {
        (
            raw0.rem_euclid(nx as i64) as usize,
            raw1.rem_euclid(nx as i64) as usize,
        )
    };
    let range = AxisRange {
        img0,
        img1,
        grid0,
        grid1,
    };

    if nimg == 0 {
        out.fill(0.0);
        return range;
    }
    let nmx = nimg * nx;

    let dx = length / nxf;
    let grid_close = ((x_frac * nxf) as i64).clamp(0, nx as i64 - 1) as usize;
    let img0_x = length * img0 as f64;
    let x0xij = img0_x + dx * grid_close as f64 - xij;
    let x0xi = img0_x - xi;

    if periodic {
        images.clear();
        images.resize((l1 + 1) * nmx, 0.0);
        let (values, gridx) = images.split_at_mut(l1 * nmx);
        generate_powers(values, gridx, nmx, grid_close, aij, dx, x0xij, x0xi, l1);

        // Fold the images back into the single-cell table, one power at a time.
        for p in 0..l1 {
            let src = &values[p * nmx..(p + 1) * nmx];
            let mut row = out.row_mut(p);
            for (o, &v) in row.iter_mut().zip(&src[..nx]) {
                *o = v;
            }
            for m in 1..nimg {
                for (o, &v) in row.iter_mut().zip(&src[m * nx..(m + 1) * nx]) {
                    *o += v;
                }
            }
        }
    } else {
        images.clear();
        images.resize(nx, 0.0);
        let values = out
            .as_slice_mut()
            .expect("The axis table is not contiguous.");
        generate_powers(values, images, nmx, grid_close, aij, dx, x0xij, x0xi, l1);
    }
    range
}

/// Generates the zeroth-power exponential values over all `nmx` image grid points by the
/// two-directional recurrence, then builds powers `1..l1` by repeated multiplication with the
/// grid-point displacements from the shell centre.
#[allow(clippy::too_many_arguments)]
fn generate_powers(
    values: &mut [f64],
    gridx: &mut [f64],
    nmx: usize,
    grid_close: usize,
    aij: f64,
    dx: f64,
    x0xij: f64,
    x0xi: f64,
    l1: usize,
) {
    let exp_dxdx = (-aij * dx * dx).exp();
    let exp_2dxdx = exp_dxdx * exp_dxdx;

    values[grid_close] = (-aij * x0xij * x0xij).exp();
    let mut exp_x0 = (-2.0 * aij * x0xij * dx).exp() * exp_dxdx;
    for i in grid_close + 1..nmx {
        values[i] = values[i - 1] * exp_x0;
        exp_x0 *= exp_2dxdx;
    }
    let mut exp_x0 = (2.0 * aij * x0xij * dx).exp() * exp_dxdx;
    for i in (0..grid_close).rev() {
        values[i] = values[i + 1] * exp_x0;
        exp_x0 *= exp_2dxdx;
    }

    if l1 > 1 {
        for (i, g) in gridx.iter_mut().enumerate() {
            *g = x0xi + i as f64 * dx;
        }
        for p in 1..l1 {
            let (lower, upper) = values.split_at_mut(p * nmx);
            let prev = &lower[(p - 1) * nmx..];
            for i in 0..nmx {
                upper[i] = prev[i] * gridx[i];
            }
        }
    }
}
