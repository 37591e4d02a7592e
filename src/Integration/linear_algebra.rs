//! In-place dense LU factorization with partial pivoting and the matching solve. The factors
//! overwrite the matrix and the pivot rows are kept in a caller-owned slice, so repeated
//! factorizations of the iteration matrix reuse the same storage.
use nalgebra::{DMatrix, DVector};

/// zero pivot met in column `0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularMatrix(pub usize);

/// Factor `a` = P L U in place. `pivots[k]` is the row swapped with row k at elimination step k.
pub fn lu_factor(a: &mut DMatrix<f64>, pivots: &mut [usize]) -> Result<(), SingularMatrix> {
    let n = a.nrows();
    for k in 0..n {
        // pivot: largest magnitude in column k at or below the diagonal
        let mut p = k;
        let mut amax = a[(k, k)].abs();
        for i in (k + 1)..n {
            let v = a[(i, k)].abs();
            if v > amax {
                amax = v;
                p = i;
            }
        }
        pivots[k] = p;
        if amax == 0.0 || !amax.is_finite() {
            return Err(SingularMatrix(k));
        }
        if p != k {
            a.swap_rows(p, k);
        }
        let inv = 1.0 / a[(k, k)];
        for i in (k + 1)..n {
            a[(i, k)] *= inv;
        }
        for j in (k + 1)..n {
            let akj = a[(k, j)];
            if akj == 0.0 {
                continue;
            }
            for i in (k + 1)..n {
                a[(i, j)] -= a[(i, k)] * akj;
            }
        }
    }
    Ok(())
}

/// Solve A x = b with the factors from [`lu_factor`]; `b` is overwritten by x.
pub fn lu_solve(lu: &DMatrix<f64>, pivots: &[usize], b: &mut DVector<f64>) {
    let n = lu.nrows();
    for k in 0..n {
        let p = pivots[k];
        if p != k {
            b.swap_rows(p, k);
        }
    }
    // forward substitution with the unit lower factor
    for k in 0..n {
        let bk = b[k];
        for i in (k + 1)..n {
            b[i] -= lu[(i, k)] * bk;
        }
    }
    for k in (0..n).rev() {
        b[k] /= lu[(k, k)];
        let bk = b[k];
        for i in 0..k {
            b[i] -= lu[(i, k)] * bk;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_needs_pivoting() {
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 0.0, 3.0, 0.0, 1.0]);
        let x_exact = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        let mut b = &a * &x_exact;
        let mut lu = a.clone();
        let mut pivots = vec![0; 3];
        lu_factor(&mut lu, &mut pivots).unwrap();
        lu_solve(&lu, &pivots, &mut b);
        for i in 0..3 {
            assert_relative_eq!(b[i], x_exact[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_iteration_matrix_shape() {
        // I - h J for a stiff 2x2 system
        let h = 0.1;
        let jac = DMatrix::from_row_slice(2, 2, &[-1.0e4, 1.0, 0.0, -1.0]);
        let mut p = DMatrix::identity(2, 2) - jac * h;
        let p0 = p.clone();
        let mut pivots = vec![0; 2];
        lu_factor(&mut p, &mut pivots).unwrap();
        let mut b = DVector::from_vec(vec![1.0, 2.0]);
        lu_solve(&p, &pivots, &mut b);
        let r = &p0 * &b;
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(r[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_singular_matrix() {
        let mut a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let mut pivots = vec![0; 2];
        assert_eq!(lu_factor(&mut a, &mut pivots), Err(SingularMatrix(1)));
    }
}
