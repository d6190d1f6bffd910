//! Cross-strategy agreement checks.

use std::sync::Arc;

use approx::assert_relative_eq;
use gm_matrix::{
    approx_eq, approx_eq_within, AcceleratorHandle, AcceleratorMultiplier, BlockedMultiplier,
    HostDevice, Matrix, MatrixError, Multiplier, NaiveMultiplier, Strategy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn host_handle() -> AcceleratorHandle {
    AcceleratorHandle::with_device(Arc::new(HostDevice::new()))
}

#[test]
fn test_two_by_two_every_strategy() {
    let handle = host_handle();
    let accel = AcceleratorMultiplier::new(&handle);
    let a = Matrix::new(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
    let b = Matrix::new(2, 2, vec![5.0f32, 6.0, 7.0, 8.0]).unwrap();

    for r in [
        NaiveMultiplier::new().multiply(&a, &b).unwrap(),
        BlockedMultiplier::new().multiply(&a, &b).unwrap(),
        accel.multiply(&a, &b).unwrap(),
    ] {
        let expected = [19.0f32, 22.0, 43.0, 50.0];
        for (got, want) in r.data().iter().zip(expected) {
            assert_relative_eq!(*got, want);
        }
    }
}

#[test]
fn test_outer_and_inner_products() {
    let handle = host_handle();
    let accel = AcceleratorMultiplier::new(&handle);
    let mut rng = StdRng::seed_from_u64(1);

    // 2x1 @ 1x10
    let a = Matrix::<f32>::random_with(2, 1, &mut rng).unwrap();
    let b = Matrix::<f32>::random_with(1, 10, &mut rng).unwrap();
    let naive = NaiveMultiplier::new().multiply(&a, &b).unwrap();
    assert_eq!((naive.rows(), naive.cols()), (2, 10));
    assert!(approx_eq(&naive, &BlockedMultiplier::new().multiply(&a, &b).unwrap()));
    assert!(approx_eq(&naive, &accel.multiply(&a, &b).unwrap()));

    // 1x2 @ 2x1
    let a = Matrix::new(1, 2, vec![3i32, -4]).unwrap();
    let b = Matrix::new(2, 1, vec![5i32, 6]).unwrap();
    for r in [
        NaiveMultiplier::new().multiply(&a, &b).unwrap(),
        BlockedMultiplier::new().multiply(&a, &b).unwrap(),
        accel.multiply(&a, &b).unwrap(),
    ] {
        assert_eq!(r.data(), &[-9]);
    }
}

#[test]
fn test_random_seven_by_six_times_six_by_three() {
    let handle = host_handle();
    let accel = AcceleratorMultiplier::new(&handle);
    let mut rng = StdRng::seed_from_u64(42);
    let a = Matrix::<f32>::random_with(7, 6, &mut rng).unwrap();
    let b = Matrix::<f32>::random_with(6, 3, &mut rng).unwrap();

    let naive = NaiveMultiplier::new().multiply(&a, &b).unwrap();
    assert_eq!((naive.rows(), naive.cols()), (7, 3));
    assert!(approx_eq(&naive, &BlockedMultiplier::new().multiply(&a, &b).unwrap()));
    assert!(approx_eq(&naive, &accel.multiply(&a, &b).unwrap()));
}

#[test]
fn test_blocked_matches_naive_across_shapes() {
    let mut rng = StdRng::seed_from_u64(7);
    for rows in [1, 3, 4, 5, 9] {
        for k in [1, 4, 6, 11] {
            for cols in [1, 2, 8, 13] {
                let a = Matrix::<f32>::random_with(rows, k, &mut rng).unwrap();
                let b = Matrix::<f32>::random_with(k, cols, &mut rng).unwrap();
                let naive = NaiveMultiplier::new().multiply(&a, &b).unwrap();
                let blocked = BlockedMultiplier::new().multiply(&a, &b).unwrap();
                assert!(
                    approx_eq(&naive, &blocked),
                    "blocked diverged for {}x{} @ {}x{}",
                    rows,
                    k,
                    k,
                    cols
                );
            }
        }
    }
}

#[test]
fn test_integer_kinds_agree() {
    let handle = host_handle();
    let accel = AcceleratorMultiplier::new(&handle);

    let a = Matrix::new(3, 5, (0..15).map(|v| (v * 37) as u8).collect()).unwrap();
    let b = Matrix::new(5, 2, (0..10).map(|v| (v * 91 + 13) as u8).collect()).unwrap();
    let naive = NaiveMultiplier::new().multiply(&a, &b).unwrap();
    assert_eq!(naive, BlockedMultiplier::new().multiply(&a, &b).unwrap());
    assert_eq!(naive, accel.multiply(&a, &b).unwrap());

    let a = Matrix::new(2, 3, vec![u32::MAX, 2, 3, 4, 5, u32::MAX]).unwrap();
    let b = Matrix::new(3, 2, vec![2u32, 1, 1, 1, 1, 3]).unwrap();
    let naive = NaiveMultiplier::new().multiply(&a, &b).unwrap();
    assert_eq!(naive, BlockedMultiplier::new().multiply(&a, &b).unwrap());
    assert_eq!(naive, accel.multiply(&a, &b).unwrap());
}

#[test]
fn test_identity_law() {
    let handle = host_handle();
    let accel = AcceleratorMultiplier::new(&handle);
    let mut rng = StdRng::seed_from_u64(3);

    // Square A: A @ I == I @ A == A.
    let a = Matrix::<f32>::random_with(6, 6, &mut rng).unwrap();
    let id = Matrix::<f32>::identity(6).unwrap();
    for strategy in [Strategy::Naive, Strategy::Blocked] {
        assert_eq!(strategy.multiply(&a, &id).unwrap(), a);
        assert_eq!(strategy.multiply(&id, &a).unwrap(), a);
    }
    assert_eq!(accel.multiply(&a, &id).unwrap(), a);
    assert_eq!(accel.multiply(&id, &a).unwrap(), a);

    let a = Matrix::new(3, 3, vec![7i32, -2, 0, 5, 11, -9, 3, 4, 1]).unwrap();
    let id = Matrix::<i32>::identity(3).unwrap();
    assert_eq!(accel.multiply(&a, &id).unwrap(), a);
    assert_eq!(BlockedMultiplier::new().multiply(&id, &a).unwrap(), a);

    // Rectangular A with identities of matching sides.
    let a = Matrix::<f32>::random_with(5, 6, &mut rng).unwrap();
    let left = Matrix::<f32>::identity(5).unwrap();
    let right = Matrix::<f32>::identity(6).unwrap();
    for strategy in [Strategy::Naive, Strategy::Blocked] {
        assert_eq!(strategy.multiply(&left, &a).unwrap(), a);
        assert_eq!(strategy.multiply(&a, &right).unwrap(), a);
    }
    assert_eq!(accel.multiply(&left, &a).unwrap(), a);
    assert_eq!(accel.multiply(&a, &right).unwrap(), a);
}

#[test]
fn test_associativity() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = Matrix::<f32>::random_with(4, 5, &mut rng).unwrap();
    let b = Matrix::<f32>::random_with(5, 6, &mut rng).unwrap();
    let c = Matrix::<f32>::random_with(6, 3, &mut rng).unwrap();
    for strategy in [Strategy::Naive, Strategy::Blocked] {
        let ab_c = strategy
            .multiply(&strategy.multiply(&a, &b).unwrap(), &c)
            .unwrap();
        let a_bc = strategy
            .multiply(&a, &strategy.multiply(&b, &c).unwrap())
            .unwrap();
        assert!(approx_eq_within(&ab_c, &a_bc, 1e-4));
    }

    // Wrapping integer arithmetic is exactly associative.
    let a = Matrix::new(2, 3, vec![7i32, -3, 100_000, 4, 9, -2]).unwrap();
    let b = Matrix::new(3, 3, vec![50_000i32, 1, 2, -3, 4, 5, 6, 70_000, 8]).unwrap();
    let c = Matrix::new(3, 2, vec![9i32, -8, 7, 6, 5, 40_000]).unwrap();
    let naive = NaiveMultiplier::new();
    assert_eq!(
        naive
            .multiply(&naive.multiply(&a, &b).unwrap(), &c)
            .unwrap(),
        naive
            .multiply(&a, &naive.multiply(&b, &c).unwrap())
            .unwrap()
    );
}

#[test]
fn test_dimension_mismatch_every_strategy() {
    let handle = host_handle();
    let a = Matrix::<f32>::zeros(2, 3).unwrap();
    let b = Matrix::<f32>::zeros(4, 2).unwrap();

    let results = [
        NaiveMultiplier::new().multiply(&a, &b),
        BlockedMultiplier::new().multiply(&a, &b),
        AcceleratorMultiplier::new(&handle).multiply(&a, &b),
        Strategy::Accelerator.multiply(&a, &b),
    ];
    for r in results {
        match r {
            Err(MatrixError::DimensionMismatch {
                m_rows,
                m_cols,
                n_rows,
                n_cols,
            }) => assert_eq!((m_rows, m_cols, n_rows, n_cols), (2, 3, 4, 2)),
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }
}

#[test]
fn test_global_accelerator_strategy() {
    let a = Matrix::new(2, 2, vec![1u32, 2, 3, 4]).unwrap();
    let b = Matrix::new(2, 2, vec![5u32, 6, 7, 8]).unwrap();
    let result = Strategy::Accelerator.multiply(&a, &b);
    if AcceleratorMultiplier::global().available() {
        assert_eq!(result.unwrap().data(), &[19, 22, 43, 50]);
    } else {
        assert!(matches!(result, Err(MatrixError::AcceleratorUnavailable(_))));
    }
}

#[test]
fn test_strategy_parse_round_trip() {
    for strategy in Strategy::ALL {
        assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
    }
    assert!("simd".parse::<Strategy>().is_err());
}
