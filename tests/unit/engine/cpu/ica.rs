use super::*;

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let (ma, mb) = (a.iter().sum::<f64>() / n, b.iter().sum::<f64>() / n);
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        sab += (x - ma) * (y - mb);
        saa += (x - ma) * (x - ma);
        sbb += (y - mb) * (y - mb);
    }
    sab / (saa.sqrt() * sbb.sqrt())
}

#[test]
fn auto_mask_keeps_bright_voxels() {
    // Two timepoints of four voxels: means 100, 50, 5, 0.
    let volumes = [100.0, 40.0, 4.0, 0.0, 100.0, 60.0, 6.0, 0.0];
    let mut mask = [9.0; 4];
    estimate_mask(&volumes, 4, 2, &mut mask);
    assert_eq!(mask, [1.0, 1.0, 0.0, 0.0]);
    assert_eq!(masked_indices(&mask), vec![0, 1]);
}

#[test]
fn explicit_mask_threshold_is_one_half() {
    assert_eq!(masked_indices(&[0.5, 0.51, 1.0, 0.0, -1.0]), vec![1, 2]);
}

#[test]
fn components_follow_variance_and_cap() {
    let eig = [5.0, 3.0, 1.0, 1.0];
    assert_eq!(components_to_keep(&eig, 80.0, 55), 2);
    assert_eq!(components_to_keep(&eig, 95.0, 55), 4);
    assert_eq!(components_to_keep(&eig, 80.0, 1), 1);
    assert_eq!(components_to_keep(&eig, 10.0, 55), 1);
    assert_eq!(components_to_keep(&[0.0, 0.0], 80.0, 55), 0);
}

#[test]
fn observation_matrix_centers_rows_and_columns() {
    // Three timepoints, two voxels.
    let volumes = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
    let x = observation_matrix(&volumes, 2, 3, &[0, 1], false);
    assert_eq!(x.shape(), (3, 2));
    for row in x.row_iter() {
        assert!(row.sum().abs() < 1e-12);
    }

    let z = observation_matrix(&volumes, 2, 3, &[0, 1], true);
    // After z-scoring both voxels have the same series, so rows center to zero exactly.
    assert!(z.iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn whitening_gives_identity_covariance() {
    let (t, m) = (3, 500);
    let x: Vec<f64> = (0..t * m)
        .map(|i| {
            let (r, j) = (i / m, (i % m) as f64);
            match r {
                0 => (j * 0.37).sin(),
                1 => (j * 0.11).cos() + 0.5 * (j * 0.37).sin(),
                _ => ((j * 0.05).sin() * 3.0).tanh(),
            }
        })
        .collect();
    let w = whiten(&DMatrix::from_row_slice(t, m, &x), 99.99, 3);
    assert_eq!(w.components, 3);
    let cov = (&w.data * w.data.transpose()) / m as f64;
    for a in 0..3 {
        for b in 0..3 {
            let expected = if a == b { 1.0 } else { 0.0 };
            let c = cov[(a, b)];
            assert!((c - expected).abs() < 1e-6, "cov[{a}][{b}] = {c}");
        }
    }
}

#[test]
fn fast_ica_unmixes_two_sources() {
    let m = 4000;
    let s1: Vec<f64> = (0..m)
        .map(|j| if (j as f64 * 0.05).sin() >= 0.0 { 1.0 } else { -1.0 })
        .collect();
    let s2: Vec<f64> = (0..m).map(|j| ((j * 7) % 100) as f64 / 50.0 - 1.0).collect();

    // Two mixed observations.
    let mut x = Vec::with_capacity(2 * m);
    x.extend(s1.iter().zip(&s2).map(|(a, b)| 0.8 * a + 0.6 * b));
    x.extend(s1.iter().zip(&s2).map(|(a, b)| 0.3 * a - 0.9 * b));
    for row in x.chunks_mut(m) {
        let mean = row.iter().sum::<f64>() / m as f64;
        row.iter_mut().for_each(|v| *v -= mean);
    }

    let w = whiten(&DMatrix::from_row_slice(2, m, &x), 99.99, 2);
    assert_eq!(w.components, 2);
    let sep = fast_ica(&w.data);
    assert!(sep.converged);
    assert!(sep.iterations <= FAST_ICA_MAX_ITERATIONS);

    let est: Vec<Vec<f64>> = sep
        .sources
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    for truth in [&s1, &s2] {
        let best = est
            .iter()
            .map(|e| correlation(e, truth).abs())
            .fold(0.0, f64::max);
        assert!(best > 0.95, "best correlation {best}");
    }
}

#[test]
fn fast_ica_with_no_components_is_empty() {
    let sep = fast_ica(&DMatrix::zeros(0, 10));
    assert!(sep.sources.is_empty());
    assert!(sep.converged);
}

#[test]
fn symmetric_decorrelation_orthonormalizes_rows() {
    let w = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, 0.0, 0.5, 3.0, 1.0, 0.0, 1.0, 4.0]);
    let d = symmetric_decorrelation(&w);
    let gram = &d * d.transpose();
    assert!((gram - DMatrix::<f64>::identity(3, 3)).amax() < 1e-10);
}

#[test]
fn whitening_keeps_the_largest_variance_directions_first() {
    // Row 0 carries far more variance than row 1; one component at 90% keeps it.
    let m = 200;
    let x = DMatrix::from_fn(2, m, |r, j| {
        if r == 0 {
            10.0 * (j as f64 * 0.3).sin()
        } else {
            (j as f64 * 0.7).cos()
        }
    });
    let w = whiten(&x, 90.0, 5);
    assert_eq!(w.components, 1);
    assert!(w.explained_percent > 90.0);
    let corr = correlation(
        &w.data.row(0).iter().copied().collect::<Vec<_>>(),
        &x.row(0).iter().copied().collect::<Vec<_>>(),
    );
    assert!(corr.abs() > 0.99, "{corr}");
}
