//! Shell-pair evaluation: primitive contraction, pair-component assembly and transforms.

use anyhow::format_err;
use nalgebra::Vector3;
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut2};

use crate::angmom::sh_conversion::cart2pure;
use crate::angmom::{cart_index, common_fac_sp, lex_cart_tuples, n_cart, n_cart_range};
use crate::basis::ao::{ContractedShell, ShellKind};
use crate::grid::UniformGrid;
use crate::numint::contract::{eval_primitive_pair, ContractionScratch};
use crate::numint::PRIM_SCREEN_CUTOFF;

#[cfg(test)]
#[path = "shell_pair_tests.rs"]
mod shell_pair_tests;

// -----------
// CacheLayout
// -----------

/// The sizes, in `f64` elements, of every scratch region a shell-pair evaluation carves from its
/// arena.
///
/// This layout is the single source of truth shared by the sizing query
/// ([`required_cache_len`]) and the execution path ([`eval_shell_pair`]): both read the same
/// region sizes, so they cannot disagree on offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLayout {
    /// Combined-angular-momentum Cartesian buffer of one primitive pair.
    pub g1d: usize,

    /// Accumulator over the first shell's primitives, one block per contraction.
    pub gctri: usize,

    /// Accumulator over both shells' primitives.
    pub gctrj: usize,

    /// Per-axis exponential-power tables.
    pub xs: usize,
    pub ys: usize,
    pub zs: usize,

    /// The x-contracted and xy-contracted intermediates.
    pub wyz: usize,
    pub wz: usize,
}

impl CacheLayout {
    /// Computes the scratch layout of one shell pair over a given mesh.
    pub fn for_pair(
        shell_i: &ContractedShell,
        shell_j: &ContractedShell,
        mesh: &[usize; 3],
    ) -> Self {
        let topl = shell_i.l + shell_j.l;
        let l1 = topl as usize + 1;
        let len_g1d = n_cart_range(shell_i.l, topl);
        let i_ctr = shell_i.n_contractions();
        let j_ctr = shell_j.n_contractions();
        Self {
            g1d: len_g1d,
            gctri: len_g1d * i_ctr,
            gctrj: len_g1d * i_ctr * j_ctr,
            xs: l1 * mesh[0],
            ys: l1 * mesh[1],
            zs: l1 * mesh[2],
            wyz: l1 * mesh[1] * mesh[2],
            wz: l1 * l1 * mesh[2],
        }
    }

    /// The total arena length required by this layout.
    pub fn total(&self) -> usize {
        self.g1d + self.gctri + self.gctrj + self.xs + self.ys + self.zs + self.wyz + self.wz
    }
}

/// Returns the scratch-arena length, in `f64` elements, required to evaluate one shell pair over
/// a given mesh. This is the pure sizing query of the shell-pair driver: it has no side effects.
#[must_use]
pub fn required_cache_len(
    shell_i: &ContractedShell,
    shell_j: &ContractedShell,
    mesh: &[usize; 3],
) -> usize {
    CacheLayout::for_pair(shell_i, shell_j, mesh).total()
}

// -----------
// PairScratch
// -----------

/// Reusable per-worker scratch memory for shell-pair evaluations.
///
/// The arena backs the fixed regions of a [`CacheLayout`]; the image workspace of the axis
/// recursion grows on demand since the periodic image count is data-dependent.
#[derive(Clone, Debug, Default)]
pub struct PairScratch {
    arena: Vec<f64>,
    images: Vec<f64>,
}

impl PairScratch {
    /// Creates a scratch with an arena of `len` elements.
    pub fn with_len(len: usize) -> Self {
        Self {
            arena: vec![0.0; len],
            images: Vec::new(),
        }
    }

    /// Creates a scratch sized for one specific shell pair.
    pub fn for_pair(
        shell_i: &ContractedShell,
        shell_j: &ContractedShell,
        mesh: &[usize; 3],
    ) -> Self {
        Self::with_len(required_cache_len(shell_i, shell_j, mesh))
    }

    /// The current arena length.
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    fn ensure(&mut self, len: usize) {
        if self.arena.len() < len {
            self.arena.resize(len, 0.0);
        }
    }
}

// -----------------------
// Contraction accumulator
// -----------------------

/// An accumulator over primitives with an explicit empty/accumulated state.
///
/// The buffer holds one block per contracted function. The first contribution overwrites every
/// block, so no separate zeroing pass is needed; subsequent contributions add, skipping blocks
/// whose coefficient vanishes.
struct Accumulator<'a> {
    buf: &'a mut [f64],
    empty: bool,
}

impl<'a> Accumulator<'a> {
    fn new(buf: &'a mut [f64]) -> Self {
        Self { buf, empty: true }
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn data(&self) -> &[f64] {
        self.buf
    }

    /// Adds `src` scaled by each contraction coefficient into the corresponding block.
    fn accumulate(&mut self, coeffs: ArrayView1<'_, f64>, src: &[f64]) {
        let nf = src.len();
        debug_assert_eq!(self.buf.len(), coeffs.len() * nf);
        if self.empty {
            for (n, &c) in coeffs.iter().enumerate() {
                for (dst, &v) in self.buf[n * nf..(n + 1) * nf].iter_mut().zip(src) {
                    *dst = v * c;
                }
            }
            self.empty = false;
        } else {
            for (n, &c) in coeffs.iter().enumerate() {
                if c != 0.0 {
                    for (dst, &v) in self.buf[n * nf..(n + 1) * nf].iter_mut().zip(src) {
                        *dst += v * c;
                    }
                }
            }
        }
    }
}

// --------------------------
// Pair-component assembly
// --------------------------

/// Expands a combined-angular-momentum Cartesian buffer into shell-pair components by the
/// two-centre horizontal recurrence.
///
/// The input holds integrals of $`(x-R_i)^{l_x}(y-R_i)^{l_y}(z-R_i)^{l_z}`$ for all components
/// with total angular momentum `li..=li+lj`; each recurrence step transfers one power onto the
/// second centre via
/// $`g(i, j + 1_a) = g(i + 1_a, j) + (R_i - R_j)_a\, g(i, j)`$,
/// which only involves the inter-centre displacement and is therefore applied after primitive
/// contraction. The result is the (first-shell components $`\times`$ second-shell components)
/// matrix in lexicographic Cartesian order on both indices.
fn cart_pair_block(g: &[f64], li: u32, lj: u32, rirj: &Vector3<f64>) -> Array2<f64> {
    let nfi = n_cart(li);
    if lj == 0 {
        return ArrayView2::from_shape((nfi, 1), &g[..nfi])
            .expect("The Cartesian buffer is too short for the bra shell.")
            .to_owned();
    }

    // Seed one single-column block per total angular momentum.
    let mut bufs = Vec::with_capacity((lj + 1) as usize);
    let mut offset = 0;
    for l in li..=(li + lj) {
        let nf = n_cart(l);
        bufs.push(
            ArrayView2::from_shape((nf, 1), &g[offset..offset + nf])
                .expect("The Cartesian buffer is too short for a ket step.")
                .to_owned(),
        );
        offset += nf;
    }

    for j in 1..=lj {
        let lmax = li + lj - j;
        let mut next = (li..=lmax)
            .map(|l| Array2::<f64>::zeros((n_cart(l), n_cart(j))))
            .collect::<Vec<_>>();
        for (jdx, &(jx, jy, _)) in lex_cart_tuples(j).iter().enumerate() {
            let (axis, prev) = if jx > 0 {
                (0, (jx - 1, jy))
            } else if jy > 0 {
                (1, (jx, jy - 1))
            } else {
                (2, (jx, jy))
            };
            let pj = cart_index(j - 1, prev.0, prev.1);
            let shift = rirj[axis];
            for l in li..=lmax {
                let bi = (l - li) as usize;
                for (idx, &(ix, iy, _)) in lex_cart_tuples(l).iter().enumerate() {
                    let (ux, uy) = match axis {
                        0 => (ix + 1, iy),
                        1 => (ix, iy + 1),
                        _ => (ix, iy),
                    };
                    let up = cart_index(l + 1, ux, uy);
                    next[bi][[idx, jdx]] =
                        bufs[bi + 1][[up, pj]] + shift * bufs[bi][[idx, pj]];
                }
            }
        }
        bufs = next;
    }
    bufs.into_iter()
        .next()
        .expect("The horizontal recurrence produced no block.")
}

/// Applies the function-kind transform of both shells to a Cartesian pair block.
fn transform_pair_block(block: Array2<f64>, li: u32, lj: u32, kind: ShellKind) -> Array2<f64> {
    match kind {
        ShellKind::Cartesian => block,
        ShellKind::Pure => cart2pure(li).t().dot(&block).dot(cart2pure(lj)),
    }
}

// ---------------------
// Shell-pair evaluation
// ---------------------

/// Evaluates the integrals of one contracted shell pair against the weight field.
///
/// Every primitive pair is screened by its Gaussian-product distance penalty against the largest
/// combined coefficient magnitude; surviving pairs are evaluated by the separable 3D contraction
/// engine and accumulated over both shells' contractions. The accumulated Cartesian components
/// are then expanded into pair components and transformed according to `kind`.
///
/// # Arguments
///
/// * `shell_i`, `shell_j` - The bra and ket shells.
/// * `kind` - The function kind of the output block.
/// * `grid` - The mesh and lattice description.
/// * `weights` - The weight field, shaped like the mesh in row-major (x, y, z) order.
/// * `fac` - An overall scale factor applied to every integral.
/// * `log_prec` - The natural logarithm of the target absolute precision.
/// * `scratch` - Reusable scratch memory; grown if undersized.
///
/// # Returns
///
/// `None` when every primitive pair was screened out, in which case the caller is responsible
/// for treating the block as zero. Otherwise, the dense
/// (bra functions $`\times`$ ket functions) block, with the contraction index slower than the
/// component index on each side.
///
/// # Errors
///
/// Fails with an unsupported-feature error for grids whose lattice is not orthorhombic, and for
/// weight fields that are not in standard row-major layout.
#[allow(clippy::too_many_arguments)]
pub fn eval_shell_pair(
    shell_i: &ContractedShell,
    shell_j: &ContractedShell,
    kind: ShellKind,
    grid: &UniformGrid,
    weights: ArrayView3<'_, f64>,
    fac: f64,
    log_prec: f64,
    scratch: &mut PairScratch,
) -> Result<Option<Array2<f64>>, anyhow::Error> {
    let [mx, my, mz] = grid.mesh;
    debug_assert_eq!(weights.dim(), (mx, my, mz));
    let weights2 = weights
        .into_shape((mx, my * mz))
        .map_err(|_| format_err!("The weight field must be in standard row-major layout."))?;

    let li = shell_i.l;
    let lj = shell_j.l;
    let topl = li + lj;
    let l1 = topl as usize + 1;
    let i_ctr = shell_i.n_contractions();
    let j_ctr = shell_j.n_contractions();

    let layout = CacheLayout::for_pair(shell_i, shell_j, &grid.mesh);
    scratch.ensure(layout.total());
    let (g1d, rest) = scratch.arena.split_at_mut(layout.g1d);
    let (gctri, rest) = rest.split_at_mut(layout.gctri);
    let (gctrj, rest) = rest.split_at_mut(layout.gctrj);
    let (xs, rest) = rest.split_at_mut(layout.xs);
    let (ys, rest) = rest.split_at_mut(layout.ys);
    let (zs, rest) = rest.split_at_mut(layout.zs);
    let (wyz, rest) = rest.split_at_mut(layout.wyz);
    let (wz, _) = rest.split_at_mut(layout.wz);
    let mut engine = ContractionScratch {
        xs: ArrayViewMut2::from_shape((l1, mx), xs).map_err(|err| format_err!(err))?,
        ys: ArrayViewMut2::from_shape((l1, my), ys).map_err(|err| format_err!(err))?,
        zs: ArrayViewMut2::from_shape((l1, mz), zs).map_err(|err| format_err!(err))?,
        wyz: ArrayViewMut2::from_shape((l1, my * mz), wyz).map_err(|err| format_err!(err))?,
        wz: ArrayViewMut2::from_shape((l1 * l1, mz), wz).map_err(|err| format_err!(err))?,
        images: &mut scratch.images,
    };

    let ri = &shell_i.cart_origin;
    let rj = &shell_j.cart_origin;
    let rr = nalgebra::distance_squared(ri, rj);
    let log_imax = shell_i.log_max_coefficients();
    let log_jmax = shell_j.log_max_coefficients();
    let fac1 = fac * common_fac_sp(li) * common_fac_sp(lj);

    let mut jacc = Accumulator::new(gctrj);
    for jp in 0..shell_j.n_primitives() {
        let aj = shell_j.exponents[jp];
        let mut iacc = Accumulator::new(&mut *gctri);
        for ip in 0..shell_i.n_primitives() {
            let ai = shell_i.exponents[ip];
            let aij = ai + aj;
            let eij = ai * aj / aij * rr;
            let logcc = log_imax[ip] + log_jmax[jp];
            if eij - logcc > PRIM_SCREEN_CUTOFF {
                continue;
            }

            let fac1i = fac1 * (-eij).exp();
            eval_primitive_pair(
                g1d,
                li,
                topl,
                ai,
                aj,
                ri,
                rj,
                fac1i,
                logcc + log_prec,
                grid,
                &weights2,
                &mut engine,
            )?;
            iacc.accumulate(shell_i.coefficients.row(ip), g1d);
        }
        if !iacc.is_empty() {
            jacc.accumulate(shell_j.coefficients.row(jp), iacc.data());
        }
    }
    if jacc.is_empty() {
        return Ok(None);
    }

    // Expand the contracted combined-angular-momentum components into shell-pair blocks and
    // transform each one.
    let rirj = ri.coords - rj.coords;
    let len_g1d = layout.g1d;
    let cfi = match kind {
        ShellKind::Cartesian => shell_i.n_cart(),
        ShellKind::Pure => shell_i.n_pure(),
    };
    let cfj = match kind {
        ShellKind::Cartesian => shell_j.n_cart(),
        ShellKind::Pure => shell_j.n_pure(),
    };
    let mut out = Array2::<f64>::zeros((i_ctr * cfi, j_ctr * cfj));
    for jc in 0..j_ctr {
        for ic in 0..i_ctr {
            let offset = (jc * i_ctr + ic) * len_g1d;
            let cart = cart_pair_block(&jacc.data()[offset..offset + len_g1d], li, lj, &rirj);
            let block = transform_pair_block(cart, li, lj, kind);
            out.slice_mut(s![ic * cfi..(ic + 1) * cfi, jc * cfj..(jc + 1) * cfj])
                .assign(&block);
        }
    }
    Ok(Some(out))
}
