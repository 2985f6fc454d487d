//! A small LDLT factorization driven entirely from scratch workspaces.

use ldlt_scratch::{
    with_workspace, BufferSpec, InlineStack, MatrixView, Origin, ScratchConfig, ScratchError,
    VectorView, Workspace,
};

/// Symmetric positive definite test matrix: `n` on the diagonal, 1 elsewhere.
fn spd(n: usize) -> Vec<f64> {
    let mut a = vec![1.0; n * n];
    for i in 0..n {
        a[i + i * n] = n as f64;
    }
    a
}

/// Factor column-major `a` into unit-lower `l` and diagonal `d`, using `v`
/// as a work vector.
fn factor(
    a: &[f64],
    n: usize,
    l: &mut MatrixView<'_, f64>,
    d: &mut VectorView<'_, f64>,
    v: &mut VectorView<'_, f64>,
) {
    for j in 0..n {
        for k in 0..j {
            v[k] = l[(j, k)] * d[k];
        }
        let mut djj = a[j + j * n];
        for k in 0..j {
            djj -= l[(j, k)] * v[k];
        }
        d[j] = djj;
        l[(j, j)] = 1.0;
        for i in j + 1..n {
            let mut lij = a[i + j * n];
            for k in 0..j {
                lij -= l[(i, k)] * v[k];
            }
            l[(i, j)] = lij / djj;
        }
    }
}

fn max_reconstruction_error(a: &[f64], n: usize, l: &MatrixView<'_, f64>, d: &[f64]) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..=i.min(j) {
                sum += l[(i, k)] * d[k] * l[(j, k)];
            }
            worst = worst.max((sum - a[i + j * n]).abs());
        }
    }
    worst
}

fn ldlt_specs(n: usize) -> [BufferSpec; 3] {
    [
        BufferSpec::matrix::<f64>("l", n, n),
        BufferSpec::vector::<f64>("d", n),
        BufferSpec::vector::<f64>("v", n),
    ]
}

#[test]
fn small_factorization_runs_on_stack() {
    let n = 6;
    let a = spd(n);
    let config = ScratchConfig::default();
    let mut frame = InlineStack::<8192>::new();
    let mut ws = Workspace::request(&ldlt_specs(n), &config, &mut frame).unwrap();
    assert_eq!(ws.origin(), Origin::Stack);

    let mut views = ws.views();
    let mut l = views.matrix::<f64>("l").unwrap();
    let mut d = views.vector::<f64>("d").unwrap();
    let mut v = views.vector::<f64>("v").unwrap();
    factor(&a, n, &mut l, &mut d, &mut v);

    assert!(d.iter().all(|&x| x > 0.0));
    assert!(max_reconstruction_error(&a, n, &l, &d) < 1e-12);
}

#[test]
fn large_factorization_runs_on_heap() {
    let n = 40;
    let a = spd(n);
    let config = ScratchConfig::default();
    let mut frame = InlineStack::<8192>::new();
    let mut ws = Workspace::request(&ldlt_specs(n), &config, &mut frame).unwrap();
    assert_eq!(ws.origin(), Origin::Heap);

    let mut views = ws.views();
    let mut l = views.matrix::<f64>("l").unwrap();
    let mut d = views.vector::<f64>("d").unwrap();
    let mut v = views.vector::<f64>("v").unwrap();
    factor(&a, n, &mut l, &mut d, &mut v);

    assert!(max_reconstruction_error(&a, n, &l, &d) < 1e-10);
}

#[test]
fn with_workspace_returns_owned_results() {
    let n = 4;
    let a = spd(n);
    let diag = with_workspace(&ldlt_specs(n), &ScratchConfig::default(), |views| {
        let mut l = views.matrix::<f64>("l")?;
        let mut d = views.vector::<f64>("d")?;
        let mut v = views.vector::<f64>("v")?;
        factor(&a, n, &mut l, &mut d, &mut v);
        Ok::<_, ScratchError>(d.to_vec())
    })
    .unwrap();
    assert_eq!(diag.len(), n);
    assert_eq!(diag[0], 4.0);
    // Determinant of the SPD matrix equals the product of the pivots.
    let det: f64 = diag.iter().product();
    assert!((det - 189.0).abs() < 1e-9);
}

#[derive(Debug)]
enum KernelError {
    Scratch(ScratchError),
    NotPositiveDefinite,
}

impl From<ScratchError> for KernelError {
    fn from(err: ScratchError) -> Self {
        Self::Scratch(err)
    }
}

#[test]
fn kernel_error_types_compose() {
    let result = with_workspace(&ldlt_specs(2), &ScratchConfig::default(), |views| {
        let d = views.vector::<f64>("d")?;
        if d[0] <= 0.0 {
            return Err(KernelError::NotPositiveDefinite);
        }
        Ok(())
    });
    assert!(matches!(result, Err(KernelError::NotPositiveDefinite)));

    let result = with_workspace(&ldlt_specs(2), &ScratchConfig::default(), |views| {
        views.vector::<f32>("d")?;
        Ok::<(), KernelError>(())
    });
    assert!(matches!(
        result,
        Err(KernelError::Scratch(ScratchError::TypeMismatch { name: "d", .. }))
    ));
}
