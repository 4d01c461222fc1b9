use approx::assert_relative_eq;
use nalgebra::{Matrix3, Point3};
use ndarray::{array, s, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::basis::ao::{ContractedShell, ShellBasis, ShellKind};
use crate::grid::UniformGrid;
use crate::numint::fill::{fill_two_center, overlap_matrix, FillMode};

fn test_basis() -> ShellBasis {
    ShellBasis::new(vec![
        ContractedShell::new(
            0,
            Point3::new(2.8, 3.0, 3.2),
            array![1.6, 0.5],
            array![[0.9], [0.4]],
        )
        .unwrap(),
        ContractedShell::new(
            1,
            Point3::new(3.3, 2.7, 3.0),
            array![1.2, 0.4],
            array![[0.7, 0.3], [0.5, 0.8]],
        )
        .unwrap(),
        ContractedShell::new(
            2,
            Point3::new(2.6, 3.4, 2.9),
            array![0.8],
            array![[1.0]],
        )
        .unwrap(),
    ])
}

fn test_grid() -> (UniformGrid, Array3<f64>) {
    let grid = UniformGrid::orthorhombic([6.0, 6.2, 5.8], [18, 20, 16], 3).unwrap();
    let mut rng = StdRng::seed_from_u64(43);
    let weights = Array3::from_shape_fn(grid.mesh, |_| rng.gen::<f64>());
    (grid, weights)
}

#[test]
fn test_fill_hermitian_mirror_is_exact() {
    let basis = test_basis();
    let (grid, weights) = test_grid();
    let log_prec = (1e-12f64).ln();

    for kind in [ShellKind::Cartesian, ShellKind::Pure] {
        let herm = overlap_matrix(
            &basis,
            kind,
            FillMode::Hermitian,
            &grid,
            weights.view(),
            log_prec,
        )
        .unwrap();
        let n = herm.nrows();
        assert_eq!(n, basis.n_funcs(kind));
        for i in 0..n {
            for j in 0..n {
                // Bit-for-bit equality: the lower triangle is copied, not recomputed.
                assert_eq!(herm[[i, j]], herm[[j, i]]);
            }
        }
    }
}

#[test]
fn test_fill_antihermitian_mirror_is_exact() {
    let basis = test_basis();
    let (grid, weights) = test_grid();
    let log_prec = (1e-12f64).ln();

    let anti = overlap_matrix(
        &basis,
        ShellKind::Cartesian,
        FillMode::AntiHermitian,
        &grid,
        weights.view(),
        log_prec,
    )
    .unwrap();
    let n = anti.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            assert_eq!(anti[[j, i]], -anti[[i, j]]);
        }
    }
}

#[test]
fn test_fill_symmetric_matches_plain() {
    let basis = test_basis();
    let (grid, weights) = test_grid();
    let log_prec = (1e-14f64).ln();

    let plain = overlap_matrix(
        &basis,
        ShellKind::Pure,
        FillMode::Plain,
        &grid,
        weights.view(),
        log_prec,
    )
    .unwrap();
    let symm = overlap_matrix(
        &basis,
        ShellKind::Pure,
        FillMode::Symmetric,
        &grid,
        weights.view(),
        log_prec,
    )
    .unwrap();

    // The plain matrix recomputes the lower triangle independently, so agreement is only up to
    // the precision of the screened evaluation.
    for (p, s) in plain.iter().zip(symm.iter()) {
        assert_relative_eq!(*p, *s, epsilon = 1e-10, max_relative = 1e-8);
    }
}

#[test]
fn test_fill_subrange_matches_full() {
    let basis = test_basis();
    let (grid, weights) = test_grid();
    let log_prec = (1e-12f64).ln();

    let full = overlap_matrix(
        &basis,
        ShellKind::Cartesian,
        FillMode::Plain,
        &grid,
        weights.view(),
        log_prec,
    )
    .unwrap();
    let sub = fill_two_center(
        &basis,
        (0, 1),
        (1, 3),
        ShellKind::Cartesian,
        FillMode::Plain,
        &grid,
        weights.view(),
        log_prec,
    )
    .unwrap();

    let bounds = basis.function_boundaries(ShellKind::Cartesian);
    let expected = full.slice(s![bounds[0].0..bounds[0].1, bounds[1].0..bounds[2].1]);
    assert_eq!(sub.dim(), expected.dim());
    for (a, b) in sub.iter().zip(expected.iter()) {
        assert_eq!(*a, *b);
    }
}

#[test]
fn test_fill_screened_pairs_zero_filled() {
    // Two far-separated s shells in a large open cell: the cross blocks are screened out
    // entirely and must be explicit zeros.
    let basis = ShellBasis::new(vec![
        ContractedShell::new(
            0,
            Point3::new(10.0, 20.0, 20.0),
            array![1.0],
            array![[1.0]],
        )
        .unwrap(),
        ContractedShell::new(
            0,
            Point3::new(30.0, 20.0, 20.0),
            array![1.0],
            array![[1.0]],
        )
        .unwrap(),
    ]);
    let grid = UniformGrid::orthorhombic([40.0, 40.0, 40.0], [24, 24, 24], 0).unwrap();
    let weights = Array3::from_elem(grid.mesh, 1.0);

    let mat = overlap_matrix(
        &basis,
        ShellKind::Cartesian,
        FillMode::Plain,
        &grid,
        weights.view(),
        (1e-12f64).ln(),
    )
    .unwrap();
    assert_eq!(mat[[0, 1]], 0.0);
    assert_eq!(mat[[1, 0]], 0.0);
    assert!(mat[[0, 0]] > 0.0);
    assert!(mat[[1, 1]] > 0.0);
}

#[test]
fn test_fill_argument_validation() {
    let basis = test_basis();
    let (grid, weights) = test_grid();
    let log_prec = (1e-12f64).ln();

    // Triangular fill over unequal ranges.
    assert!(fill_two_center(
        &basis,
        (0, 2),
        (0, 3),
        ShellKind::Cartesian,
        FillMode::Hermitian,
        &grid,
        weights.view(),
        log_prec,
    )
    .is_err());

    // Out-of-range shells.
    assert!(fill_two_center(
        &basis,
        (0, 4),
        (0, 4),
        ShellKind::Cartesian,
        FillMode::Plain,
        &grid,
        weights.view(),
        log_prec,
    )
    .is_err());

    // Mismatched weight-field shape.
    let bad_weights = Array3::<f64>::zeros([4, 4, 4]);
    assert!(overlap_matrix(
        &basis,
        ShellKind::Cartesian,
        FillMode::Plain,
        &grid,
        bad_weights.view(),
        log_prec,
    )
    .is_err());

    // General lattices are rejected up front.
    let sheared = UniformGrid::builder()
        .lattice(Matrix3::new(
            6.0, 0.3, 0.0, //
            0.0, 6.2, 0.0, //
            0.0, 0.0, 5.8,
        ))
        .mesh(grid.mesh)
        .dimension(3)
        .build()
        .unwrap();
    assert!(overlap_matrix(
        &basis,
        ShellKind::Cartesian,
        FillMode::Plain,
        &sheared,
        weights.view(),
        log_prec,
    )
    .is_err());
}
