//! GEMM kernel behind `Matrix::multiply`.
//!
//! - default: a cache-friendly `i-p-j` loop over row-major buffers
//! - optional: the `matrixmultiply` backend (feature `matrixmultiply`)

/// Computes `c = a * b` for row-major buffers.
///
/// Shape contract (checked by the caller):
/// - `a.len() == m * k`
/// - `b.len() == k * n`
/// - `c.len() == m * n`
#[inline]
pub(crate) fn gemm(m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);

    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        c.fill(0.0);
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // Row-major strides: (row stride, column stride).
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                1.0,
                a.as_ptr(),
                k as isize,
                1,
                b.as_ptr(),
                n as isize,
                1,
                0.0,
                c.as_mut_ptr(),
                n as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    {
        c.fill(0.0);
        for i in 0..m {
            let c_row = &mut c[i * n..(i + 1) * n];
            for p in 0..k {
                let av = a[i * k + p];
                if av == 0.0 {
                    continue;
                }
                let b_row = &b[p * n..(p + 1) * n];
                for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                    *cv = av.mul_add(bv, *cv);
                }
            }
        }
    }
}
