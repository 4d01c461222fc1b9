use approx::assert_relative_eq;
use nalgebra::Point3;
use ndarray::{array, Array1, Array2};

use crate::basis::ao::{ContractedShell, ShellBasis, ShellKind};

fn sto2g_s(origin: Point3<f64>) -> ContractedShell {
    ContractedShell::new(
        0,
        origin,
        array![1.309_756_38, 0.233_135_97],
        array![[0.430_128_498], [0.678_913_531]],
    )
    .unwrap()
}

#[test]
fn test_ao_contracted_shell_validation() {
    // Mismatched primitive count.
    assert!(ContractedShell::new(
        1,
        Point3::origin(),
        array![1.0, 2.0, 3.0],
        array![[1.0], [1.0]],
    )
    .is_err());

    // Non-positive exponent.
    assert!(ContractedShell::new(
        0,
        Point3::origin(),
        array![1.0, -2.0],
        array![[1.0], [1.0]],
    )
    .is_err());

    // No contracted functions.
    assert!(ContractedShell::new(
        0,
        Point3::origin(),
        array![1.0],
        Array2::<f64>::zeros((1, 0)),
    )
    .is_err());

    // No primitives.
    assert!(ContractedShell::new(
        0,
        Point3::origin(),
        Array1::<f64>::zeros(0),
        Array2::<f64>::zeros((0, 1)),
    )
    .is_err());
}

#[test]
fn test_ao_contracted_shell_counts() {
    let d = ContractedShell::new(
        2,
        Point3::new(0.0, 0.0, 1.0),
        array![2.0, 0.5, 0.1],
        array![[0.3, 0.1], [0.5, 0.2], [0.4, 0.9]],
    )
    .unwrap();
    assert_eq!(d.n_primitives(), 3);
    assert_eq!(d.n_contractions(), 2);
    assert_eq!(d.n_cart(), 6);
    assert_eq!(d.n_pure(), 5);
    assert_eq!(d.n_funcs(ShellKind::Cartesian), 12);
    assert_eq!(d.n_funcs(ShellKind::Pure), 10);
}

#[test]
fn test_ao_log_max_coefficients() {
    let p = ContractedShell::new(
        1,
        Point3::origin(),
        array![4.0, 1.0, 0.25],
        array![[0.5, -2.0], [1.0, 0.25], [0.0, 0.0]],
    )
    .unwrap();
    let logs = p.log_max_coefficients();
    assert_relative_eq!(logs[0], 2f64.ln(), epsilon = 1e-14);
    assert_relative_eq!(logs[1], 0.0, epsilon = 1e-14);
    assert_eq!(logs[2], f64::NEG_INFINITY);
}

#[test]
fn test_ao_shell_basis_boundaries() {
    let basis = ShellBasis::new(vec![
        sto2g_s(Point3::origin()),
        ContractedShell::new(
            1,
            Point3::new(0.0, 0.0, 1.2),
            array![1.0, 0.4],
            array![[0.6, 0.1], [0.5, 0.8]],
        )
        .unwrap(),
        ContractedShell::new(
            2,
            Point3::new(0.0, 1.1, 0.0),
            array![0.8],
            array![[1.0]],
        )
        .unwrap(),
    ]);

    assert_eq!(basis.n_shells(), 3);
    assert_eq!(basis.n_funcs(ShellKind::Cartesian), 1 + 6 + 6);
    assert_eq!(basis.n_funcs(ShellKind::Pure), 1 + 6 + 5);
    assert_eq!(
        basis.function_boundaries(ShellKind::Cartesian),
        vec![(0, 1), (1, 7), (7, 13)]
    );
    assert_eq!(
        basis.function_boundaries(ShellKind::Pure),
        vec![(0, 1), (1, 7), (7, 12)]
    );
    assert_eq!(basis[1].l, 1);
}
