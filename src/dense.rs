//! Dense kernels on column-major blocks.
//!
//! Only the variants the factorization and solves actually dispatch are
//! implemented; all of them take explicit leading dimensions so they can
//! operate directly inside the factor arena.

/// Cholesky-factor the leading n-by-n block of `a` in place, lower triangle.
/// Returns the 0-based index of the first non-positive pivot on failure.
pub fn potrf_lower(n: usize, a: &mut [f64], lda: usize) -> Result<(), usize> {
    for j in 0..n {
        let mut s = a[j + j * lda];
        for k in 0..j {
            let v = a[j + k * lda];
            s -= v * v;
        }
        if s <= 0.0 {
            return Err(j);
        }
        let ljj = s.sqrt();
        a[j + j * lda] = ljj;
        for i in (j + 1)..n {
            let mut t = a[i + j * lda];
            for k in 0..j {
                t -= a[i + k * lda] * a[j + k * lda];
            }
            a[i + j * lda] = t / ljj;
        }
    }
    Ok(())
}

/// Solve X * L^T = B in place for the rows `row0..row0+m` of `block`, where
/// L is the lower-triangular n-by-n factor stored in rows `0..n` of the same
/// block. This is the sub-diagonal update of a supernode: both operands live
/// in one column-major panel with leading dimension `ld`.
pub fn trsm_right_lower_trans_in_block(block: &mut [f64], ld: usize, n: usize, row0: usize, m: usize) {
    for j in 0..n {
        for k in 0..j {
            let ljk = block[j + k * ld];
            if ljk != 0.0 {
                for i in 0..m {
                    block[row0 + i + j * ld] -= ljk * block[row0 + i + k * ld];
                }
            }
        }
        let ljj = block[j + j * ld];
        for i in 0..m {
            block[row0 + i + j * ld] /= ljj;
        }
    }
}

/// Solve L * X = B in place (forward substitution), B is n-by-nrhs.
pub fn trsm_left_lower_notrans(
    n: usize,
    nrhs: usize,
    a: &[f64],
    lda: usize,
    b: &mut [f64],
    ldb: usize,
) {
    for r in 0..nrhs {
        for k in 0..n {
            let bk = b[k + r * ldb] / a[k + k * lda];
            b[k + r * ldb] = bk;
            if bk != 0.0 {
                for i in (k + 1)..n {
                    b[i + r * ldb] -= a[i + k * lda] * bk;
                }
            }
        }
    }
}

/// Solve L^T * X = B in place (backward substitution), B is n-by-nrhs.
pub fn trsm_left_lower_trans(
    n: usize,
    nrhs: usize,
    a: &[f64],
    lda: usize,
    b: &mut [f64],
    ldb: usize,
) {
    for r in 0..nrhs {
        for k in (0..n).rev() {
            let mut bk = b[k + r * ldb];
            for i in (k + 1)..n {
                bk -= a[i + k * lda] * b[i + r * ldb];
            }
            b[k + r * ldb] = bk / a[k + k * lda];
        }
    }
}

/// C = alpha * A * A^T over the lower triangle, where A is the m-by-k panel
/// at rows `row0..row0+m` of `block`. C is m-by-m with leading dimension
/// `ldc` and is overwritten (beta = 0 semantics).
pub fn syrk_lower_in_block(
    block: &[f64],
    ld: usize,
    row0: usize,
    m: usize,
    k: usize,
    alpha: f64,
    c: &mut [f64],
    ldc: usize,
) {
    for j in 0..m {
        for i in j..m {
            c[i + j * ldc] = 0.0;
        }
    }
    for p in 0..k {
        for j in 0..m {
            let t = alpha * block[row0 + j + p * ld];
            if t != 0.0 {
                for i in j..m {
                    c[i + j * ldc] += t * block[row0 + i + p * ld];
                }
            }
        }
    }
}

/// C = alpha * A * B + beta * C, with A m-by-k, B k-by-n, C m-by-n.
pub fn gemm_notrans(
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    for j in 0..n {
        for i in 0..m {
            c[i + j * ldc] *= beta;
        }
        for p in 0..k {
            let t = alpha * b[p + j * ldb];
            if t != 0.0 {
                for i in 0..m {
                    c[i + j * ldc] += t * a[i + p * lda];
                }
            }
        }
    }
}

/// C = alpha * A^T * B + beta * C, with A k-by-m, B k-by-n, C m-by-n.
pub fn gemm_trans(
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    for j in 0..n {
        for i in 0..m {
            let mut s = 0.0;
            for p in 0..k {
                s += a[p + i * lda] * b[p + j * ldb];
            }
            c[i + j * ldc] = alpha * s + beta * c[i + j * ldc];
        }
    }
}
