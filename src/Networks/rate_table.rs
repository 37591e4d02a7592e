//! # Tabulated reaction rates
//!
//! Rates and their temperature derivatives are tabulated once on a log-spaced temperature grid
//! (10^6 K to 10^10 K, 2000 points per decade) and interpolated with a 4-point Lagrange cubic in
//! T. Each rate carries a density power: the interpolated value is multiplied by rho^k, k = 0 for
//! decays and photodisintegrations, 1 for two-body and 2 for three-body captures.
//!
//! A table is built by an explicit call to [`RateTable::build`] and shared read-only afterwards,
//! usually through an `Arc`.
use crate::Interfaces::errors::BurnError;
use log::info;

pub const TAB_TLO: f64 = 6.0;
pub const TAB_THI: f64 = 10.0;
pub const TAB_PER_DECADE: usize = 2000;

#[derive(Debug, Clone)]
pub struct RateTable {
    nrates: usize,
    density_powers: Vec<i32>,
    ttab: Vec<f64>,
    /// rates, row-major by temperature point: `rattab[i * nrates + j]`
    rattab: Vec<f64>,
    drattabdt: Vec<f64>,
    tstp: f64,
}

impl RateTable {
    /// Tabulate `nrates` rates. `eval(T, rates, drates_dT)` fills the density-free rates and their
    /// temperature derivatives at temperature T.
    pub fn build<F>(density_powers: Vec<i32>, eval: F) -> Result<Self, BurnError>
    where
        F: Fn(f64, &mut [f64], &mut [f64]),
    {
        let nrates = density_powers.len();
        if nrates == 0 {
            return Err(BurnError::Table(
                "a rate table needs at least one rate".to_owned(),
            ));
        }
        let npts = (TAB_THI - TAB_TLO) as usize * TAB_PER_DECADE + 1;
        let tstp = (TAB_THI - TAB_TLO) / (npts - 1) as f64;
        let mut ttab = Vec::with_capacity(npts);
        let mut rattab = vec![0.0; npts * nrates];
        let mut drattabdt = vec![0.0; npts * nrates];
        for i in 0..npts {
            let T = 10f64.powf(TAB_TLO + i as f64 * tstp);
            ttab.push(T);
            let range = i * nrates..(i + 1) * nrates;
            eval(T, &mut rattab[range.clone()], &mut drattabdt[range]);
        }
        if rattab.iter().chain(drattabdt.iter()).any(|r| !r.is_finite()) {
            return Err(BurnError::Table(
                "tabulated rate is not finite".to_owned(),
            ));
        }
        info!("rate table built: {} rates, {} temperature points", nrates, npts);
        Ok(Self {
            nrates,
            density_powers,
            ttab,
            rattab,
            drattabdt,
            tstp,
        })
    }

    pub fn nrates(&self) -> usize {
        self.nrates
    }

    /// whether `T` lies inside the tabulated temperature range
    pub fn covers(&self, T: f64) -> bool {
        match (self.ttab.first(), self.ttab.last()) {
            (Some(lo), Some(hi)) => T >= *lo && T <= *hi,
            _ => false,
        }
    }

    /// interpolate every rate (times its density factor) and its temperature derivative
    pub fn evaluate(&self, rho: f64, T: f64, rates: &mut [f64], drates_dT: &mut [f64]) {
        let npts = self.ttab.len();
        let guess = ((T.log10() - TAB_TLO) / self.tstp).floor();
        // first point of the 4-point stencil
        let iat = if guess.is_finite() {
            (guess as i64 - 1).clamp(0, npts as i64 - 4) as usize
        } else {
            0
        };

        let x = T;
        let (x1, x2, x3, x4) = (
            self.ttab[iat],
            self.ttab[iat + 1],
            self.ttab[iat + 2],
            self.ttab[iat + 3],
        );
        let (a, b, c, d) = (x - x1, x - x2, x - x3, x - x4);
        let (e, f, g) = (x1 - x2, x1 - x3, x1 - x4);
        let (h, p, q) = (x2 - x3, x2 - x4, x3 - x4);
        let alfa = b * c * d / (e * f * g);
        let beta = -a * c * d / (e * h * p);
        let gama = a * b * d / (f * h * q);
        let delt = -a * b * c / (g * p * q);

        let nr = self.nrates;
        for j in 0..nr {
            let dfac = rho.powi(self.density_powers[j]);
            rates[j] = (alfa * self.rattab[iat * nr + j]
                + beta * self.rattab[(iat + 1) * nr + j]
                + gama * self.rattab[(iat + 2) * nr + j]
                + delt * self.rattab[(iat + 3) * nr + j])
                * dfac;
            drates_dT[j] = (alfa * self.drattabdt[iat * nr + j]
                + beta * self.drattabdt[(iat + 1) * nr + j]
                + gama * self.drattabdt[(iat + 2) * nr + j]
                + delt * self.drattabdt[(iat + 3) * nr + j])
                * dfac;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_is_reproduced() {
        // a cubic in T is interpolated exactly by the 4-point stencil
        let table = RateTable::build(vec![0, 1], |T, r, dr| {
            let t9 = T / 1.0e9;
            r[0] = 1.0 + t9 + t9 * t9 * t9;
            dr[0] = (1.0 + 3.0 * t9 * t9) / 1.0e9;
            r[1] = 2.0 * t9;
            dr[1] = 2.0 / 1.0e9;
        })
        .unwrap();
        assert_eq!(table.nrates(), 2);
        let mut rates = [0.0; 2];
        let mut drates = [0.0; 2];
        let T = 3.3333e9;
        table.evaluate(10.0, T, &mut rates, &mut drates);
        let t9 = T / 1.0e9;
        assert_relative_eq!(rates[0], 1.0 + t9 + t9 * t9 * t9, max_relative = 1e-9);
        assert_relative_eq!(rates[1], 10.0 * 2.0 * t9, max_relative = 1e-9);
        assert_relative_eq!(drates[1], 10.0 * 2.0 / 1.0e9, max_relative = 1e-9);
    }

    #[test]
    fn test_range_and_errors() {
        let table = RateTable::build(vec![0], |_, r, dr| {
            r[0] = 1.0;
            dr[0] = 0.0;
        })
        .unwrap();
        assert!(table.covers(1.0e8));
        assert!(!table.covers(1.0e11));
        assert!(!table.covers(1.0e5));

        assert!(RateTable::build(vec![], |_, _, _| {}).is_err());
        assert!(
            RateTable::build(vec![0], |_, r, dr| {
                r[0] = f64::NAN;
                dr[0] = 0.0;
            })
            .is_err()
        );
    }
}
