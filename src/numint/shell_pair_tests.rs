use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use ndarray::{array, Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::angmom::{cart_index, lex_cart_tuples, n_cart, n_cart_range};
use crate::basis::ao::{ContractedShell, ShellKind};
use crate::grid::UniformGrid;
use crate::numint::shell_pair::{
    cart_pair_block, eval_shell_pair, required_cache_len, CacheLayout, PairScratch,
};

fn binom(n: u32, k: u32) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc * f64::from(n - k + i) / f64::from(i))
}

/// Expands the ket powers explicitly through the binomial theorem,
/// $`(x - R_j)^{j_x} = \sum_t \binom{j_x}{t} (R_i - R_j)^{j_x - t} (x - R_i)^t`$, as an
/// independent reference for the horizontal recurrence.
fn binomial_pair_block(g: &[f64], li: u32, lj: u32, rirj: &Vector3<f64>) -> Array2<f64> {
    let g_at = |l: u32, lx: u32, ly: u32| {
        let offset = n_cart_range(li, l) - n_cart(l);
        g[offset + cart_index(l, lx, ly)]
    };
    let mut block = Array2::<f64>::zeros((n_cart(li), n_cart(lj)));
    for (idx, &(ix, iy, _)) in lex_cart_tuples(li).iter().enumerate() {
        for (jdx, &(jx, jy, jz)) in lex_cart_tuples(lj).iter().enumerate() {
            let mut val = 0.0;
            for tx in 0..=jx {
                for ty in 0..=jy {
                    for tz in 0..=jz {
                        let coeff = binom(jx, tx)
                            * binom(jy, ty)
                            * binom(jz, tz)
                            * rirj[0].powi((jx - tx) as i32)
                            * rirj[1].powi((jy - ty) as i32)
                            * rirj[2].powi((jz - tz) as i32);
                        val += coeff
                            * g_at(li + tx + ty + tz, ix + tx, iy + ty);
                    }
                }
            }
            block[[idx, jdx]] = val;
        }
    }
    block
}

#[test]
fn test_shell_pair_horizontal_recurrence() {
    let mut rng = StdRng::seed_from_u64(29);
    let rirj = Vector3::new(0.35, -0.8, 1.2);
    for (li, lj) in [(0, 1), (0, 3), (1, 2), (2, 1), (2, 2)] {
        let g = (0..n_cart_range(li, li + lj))
            .map(|_| rng.gen::<f64>() - 0.5)
            .collect::<Vec<_>>();
        let recurred = cart_pair_block(&g, li, lj, &rirj);
        let expanded = binomial_pair_block(&g, li, lj, &rirj);
        assert_eq!(recurred.dim(), (n_cart(li), n_cart(lj)));
        for (r, e) in recurred.iter().zip(expanded.iter()) {
            assert_relative_eq!(*r, *e, epsilon = 1e-13, max_relative = 1e-11);
        }
    }
}

fn uniform_weights(mesh: [usize; 3]) -> Array3<f64> {
    Array3::from_elem(mesh, 1.0)
}

fn s_shell(origin: Point3<f64>, alpha: f64, coeff: f64) -> ContractedShell {
    ContractedShell::new(0, origin, array![alpha], array![[coeff]]).unwrap()
}

#[test]
fn test_shell_pair_screening() {
    let grid = UniformGrid::orthorhombic([40.0, 40.0, 40.0], [20, 20, 20], 0).unwrap();
    let weights = uniform_weights(grid.mesh);
    let log_prec = (1e-12f64).ln();

    // eij = (1 * 1 / 2) * 12^2 = 72 > 40: every primitive pair is screened out.
    let far_i = s_shell(Point3::new(10.0, 20.0, 20.0), 1.0, 1.0);
    let far_j = s_shell(Point3::new(22.0, 20.0, 20.0), 1.0, 1.0);
    let mut scratch = PairScratch::for_pair(&far_i, &far_j, &grid.mesh);
    let block = eval_shell_pair(
        &far_i,
        &far_j,
        ShellKind::Cartesian,
        &grid,
        weights.view(),
        1.0,
        log_prec,
        &mut scratch,
    )
    .unwrap();
    assert!(block.is_none());

    // eij = 0.5 * 2^2 = 2 <= 40: the pair survives.
    let near_j = s_shell(Point3::new(12.0, 20.0, 20.0), 1.0, 1.0);
    let block = eval_shell_pair(
        &far_i,
        &near_j,
        ShellKind::Cartesian,
        &grid,
        weights.view(),
        1.0,
        log_prec,
        &mut scratch,
    )
    .unwrap();
    assert!(block.is_some());
}

#[test]
fn test_shell_pair_contraction_linearity() {
    let grid = UniformGrid::orthorhombic([6.0, 6.0, 6.0], [24, 24, 24], 3).unwrap();
    let weights = {
        let mut rng = StdRng::seed_from_u64(31);
        Array3::from_shape_fn(grid.mesh, |_| rng.gen::<f64>())
    };
    let log_prec = (1e-14f64).ln();
    let origin_i = Point3::new(2.9, 3.0, 3.1);
    let origin_j = Point3::new(3.2, 2.8, 3.0);
    let (c1, c2) = (1.0, 0.5);

    let contracted = ContractedShell::new(
        1,
        origin_i,
        array![1.8, 0.6],
        array![[c1], [c2]],
    )
    .unwrap();
    let prim1 = ContractedShell::new(1, origin_i, array![1.8], array![[1.0]]).unwrap();
    let prim2 = ContractedShell::new(1, origin_i, array![0.6], array![[1.0]]).unwrap();
    let ket = s_shell(origin_j, 0.9, 1.0);

    let mut scratch = PairScratch::default();
    let mut eval = |bra: &ContractedShell| {
        eval_shell_pair(
            bra,
            &ket,
            ShellKind::Cartesian,
            &grid,
            weights.view(),
            1.0,
            log_prec,
            &mut scratch,
        )
        .unwrap()
        .unwrap()
    };
    let whole = eval(&contracted);
    let part1 = eval(&prim1);
    let part2 = eval(&prim2);
    for ((w, p1), p2) in whole.iter().zip(part1.iter()).zip(part2.iter()) {
        assert_relative_eq!(*w, c1 * p1 + c2 * p2, epsilon = 1e-10, max_relative = 1e-8);
    }
}

#[test]
fn test_shell_pair_pure_transform_low_l() {
    let grid = UniformGrid::orthorhombic([6.0, 6.0, 6.0], [20, 20, 20], 3).unwrap();
    let weights = {
        let mut rng = StdRng::seed_from_u64(37);
        Array3::from_shape_fn(grid.mesh, |_| rng.gen::<f64>())
    };
    let log_prec = (1e-12f64).ln();
    let bra = ContractedShell::new(
        1,
        Point3::new(2.8, 3.1, 3.0),
        array![1.2],
        array![[1.0]],
    )
    .unwrap();
    let ket = s_shell(Point3::new(3.1, 2.9, 3.2), 0.8, 1.0);

    let mut scratch = PairScratch::default();
    let cart = eval_shell_pair(
        &bra,
        &ket,
        ShellKind::Cartesian,
        &grid,
        weights.view(),
        1.0,
        log_prec,
        &mut scratch,
    )
    .unwrap()
    .unwrap();
    let pure = eval_shell_pair(
        &bra,
        &ket,
        ShellKind::Pure,
        &grid,
        weights.view(),
        1.0,
        log_prec,
        &mut scratch,
    )
    .unwrap()
    .unwrap();

    // Pure p functions in increasing-m order are (y, z, x) relative to Cartesian (x, y, z).
    assert_eq!(pure[[0, 0]], cart[[1, 0]]);
    assert_eq!(pure[[1, 0]], cart[[2, 0]]);
    assert_eq!(pure[[2, 0]], cart[[0, 0]]);
}

#[test]
fn test_shell_pair_sizing_matches_execution() {
    let grid = UniformGrid::orthorhombic([4.5, 5.0, 5.5], [10, 12, 14], 3).unwrap();
    let weights = {
        let mut rng = StdRng::seed_from_u64(41);
        Array3::from_shape_fn(grid.mesh, |_| rng.gen::<f64>())
    };
    let log_prec = (1e-12f64).ln();
    let shells = vec![
        s_shell(Point3::new(2.0, 2.5, 2.7), 1.5, 0.8),
        ContractedShell::new(
            1,
            Point3::new(2.4, 2.1, 3.0),
            array![1.1, 0.4],
            array![[0.7, 0.2], [0.4, 0.9]],
        )
        .unwrap(),
        ContractedShell::new(
            2,
            Point3::new(1.9, 2.8, 2.2),
            array![0.9],
            array![[1.0]],
        )
        .unwrap(),
    ];

    for bra in &shells {
        for ket in &shells {
            let required = required_cache_len(bra, ket, &grid.mesh);
            assert_eq!(
                required,
                CacheLayout::for_pair(bra, ket, &grid.mesh).total()
            );
            let mut scratch = PairScratch::with_len(required);
            eval_shell_pair(
                bra,
                ket,
                ShellKind::Pure,
                &grid,
                weights.view(),
                1.0,
                log_prec,
                &mut scratch,
            )
            .unwrap();
            // The sizing query must have been sufficient: execution never grew the arena.
            assert_eq!(scratch.arena_len(), required);
        }
    }
}
