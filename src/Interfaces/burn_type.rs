//! # Burn state
//!
//! ## Purpose
//! `BurnState` is the record an integration works on: density, temperature, energy and
//! composition of one fluid element, the derived thermodynamic quantities the right-hand side
//! needs, and the diagnostics of the last burn. It is created by the caller, mutated in place by
//! exactly one integration and read back afterwards.
//!
//! ## Main Structures
//! - `BurnState`: the state itself
//! - `SdcEvolve`, `SdcLayout`: which conserved variables the simplified-SDC coupling evolves and
//!   where they live in the conserved array
//! - `SdcData`: conserved state, advective sources and pre-burn values carried in SDC mode
//!
//! ## Conserved array layouts
//! | mode     | evolved                              | not evolved          |
//! |----------|--------------------------------------|----------------------|
//! | Energy   | `[rho E, rho e, rho X_1..rho X_N]`   | `[rho, rho u, rho v, rho w]` |
//! | Enthalpy | `[rho X_1..rho X_N, rho h]`          | density is `sum(rho X)` |
//!
//! After a burn `e_nuc` holds the specific energy released (erg/g) and `e` the final specific
//! internal energy.
use crate::Interfaces::eos_type::EosState;
use crate::Interfaces::errors::IntegrationStatus;
use nalgebra::DVector;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdcEvolve {
    /// evolve total and internal energy, carry density and momenta
    Energy,
    /// evolve enthalpy, density follows the partial densities
    Enthalpy,
}

/// index map of the conserved array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdcLayout {
    pub evolve: SdcEvolve,
    pub nspec: usize,
}

impl SdcLayout {
    pub fn new(evolve: SdcEvolve, nspec: usize) -> Self {
        Self { evolve, nspec }
    }
    /// first partial density
    pub fn sfs(&self) -> usize {
        match self.evolve {
            SdcEvolve::Energy => 2,
            SdcEvolve::Enthalpy => 0,
        }
    }
    /// total energy density
    pub fn seden(&self) -> Option<usize> {
        match self.evolve {
            SdcEvolve::Energy => Some(0),
            SdcEvolve::Enthalpy => None,
        }
    }
    /// internal energy density
    pub fn seint(&self) -> Option<usize> {
        match self.evolve {
            SdcEvolve::Energy => Some(1),
            SdcEvolve::Enthalpy => None,
        }
    }
    /// enthalpy density
    pub fn senth(&self) -> Option<usize> {
        match self.evolve {
            SdcEvolve::Energy => None,
            SdcEvolve::Enthalpy => Some(self.nspec),
        }
    }
    pub fn srho(&self) -> Option<usize> {
        match self.evolve {
            SdcEvolve::Energy => Some(2 + self.nspec),
            SdcEvolve::Enthalpy => None,
        }
    }
    /// momentum components
    pub fn smom(&self) -> Option<[usize; 3]> {
        match self.evolve {
            SdcEvolve::Energy => Some([3 + self.nspec, 4 + self.nspec, 5 + self.nspec]),
            SdcEvolve::Enthalpy => None,
        }
    }
    /// length of the conserved array
    pub fn nvar(&self) -> usize {
        match self.evolve {
            SdcEvolve::Energy => self.nspec + 6,
            SdcEvolve::Enthalpy => self.nspec + 1,
        }
    }
    /// number of evolved variables, they occupy the leading slots of the conserved array
    pub fn nevolve(&self) -> usize {
        match self.evolve {
            SdcEvolve::Energy => self.nspec + 2,
            SdcEvolve::Enthalpy => self.nspec + 1,
        }
    }
}

/// conserved-variable data carried through a simplified-SDC burn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdcData {
    pub layout: SdcLayout,
    /// conserved state, updated to the end-of-burn value
    pub y: DVector<f64>,
    /// advective rates of change of every conserved quantity
    pub ydot_a: DVector<f64>,
    /// pre-burn density
    pub rho_orig: f64,
    /// pre-burn momenta
    pub mom_orig: [f64; 3],
    /// get the temperature from the total energy minus the kinetic energy
    pub T_from_eden: bool,
    /// base-state pressure, used when the temperature is found from (rho, p)
    pub p0: f64,
    pub sdc_iter: usize,
    pub num_sdc_iters: usize,
}

impl SdcData {
    /// Conserved state for energy evolution from primitive variables: density, mass fractions,
    /// specific internal energy and velocity. Advective sources start at zero.
    pub fn energy_from_primitive(rho: f64, xn: &[f64], e: f64, vel: [f64; 3]) -> Self {
        let layout = SdcLayout::new(SdcEvolve::Energy, xn.len());
        let mut y = DVector::zeros(layout.nvar());
        let ke = 0.5 * rho * (vel[0] * vel[0] + vel[1] * vel[1] + vel[2] * vel[2]);
        y[0] = rho * e + ke;
        y[1] = rho * e;
        for (n, x) in xn.iter().enumerate() {
            y[layout.sfs() + n] = rho * x;
        }
        y[2 + xn.len()] = rho;
        for d in 0..3 {
            y[3 + xn.len() + d] = rho * vel[d];
        }
        Self::from_conserved(layout, y)
    }

    /// Conserved state for enthalpy evolution from density, mass fractions, specific enthalpy
    /// and the base-state pressure.
    pub fn enthalpy_from_primitive(rho: f64, xn: &[f64], h: f64, p0: f64) -> Self {
        let layout = SdcLayout::new(SdcEvolve::Enthalpy, xn.len());
        let mut y = DVector::zeros(layout.nvar());
        for (n, x) in xn.iter().enumerate() {
            y[n] = rho * x;
        }
        y[xn.len()] = rho * h;
        let mut data = Self::from_conserved(layout, y);
        data.p0 = p0;
        data
    }

    pub fn from_conserved(layout: SdcLayout, y: DVector<f64>) -> Self {
        let nvar = layout.nvar();
        Self {
            layout,
            y,
            ydot_a: DVector::zeros(nvar),
            rho_orig: 0.0,
            mom_orig: [0.0; 3],
            T_from_eden: false,
            p0: 0.0,
            sdc_iter: 0,
            num_sdc_iters: 0,
        }
    }

    pub fn with_advective_sources(mut self, ydot_a: DVector<f64>) -> Self {
        self.ydot_a = ydot_a;
        self
    }

    /// density implied by the conserved state
    pub fn density(&self) -> f64 {
        match self.layout.srho() {
            Some(srho) => self.y[srho],
            None => {
                let sfs = self.layout.sfs();
                (0..self.layout.nspec).map(|n| self.y[sfs + n]).sum()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnState {
    pub rho: f64,
    pub T: f64,
    pub e: f64,
    pub xn: DVector<f64>,
    pub aux: DVector<f64>,

    pub cv: f64,
    pub cp: f64,
    pub y_e: f64,
    pub eta: f64,
    pub abar: f64,
    pub zbar: f64,

    /// temperature of the last EOS call and the specific heats found there
    pub T_old: f64,
    pub cv_old: f64,
    pub cp_old: f64,
    /// temperature derivatives of the specific heats between EOS calls
    pub dcvdT: f64,
    pub dcpdT: f64,
    pub self_heat: bool,

    /// specific nuclear energy released over the last burn, erg/g
    pub e_nuc: f64,
    /// time reached by the last burn
    pub time: f64,

    pub n_rhs: usize,
    pub n_jac: usize,
    pub n_step: usize,
    pub success: bool,
    pub status: IntegrationStatus,

    pub sdc: Option<SdcData>,
}

impl BurnState {
    pub fn new(rho: f64, T: f64, xn: Vec<f64>, naux: usize) -> Self {
        Self {
            rho,
            T,
            e: 0.0,
            xn: DVector::from_vec(xn),
            aux: DVector::zeros(naux),
            cv: 0.0,
            cp: 0.0,
            y_e: 0.0,
            eta: 0.0,
            abar: 0.0,
            zbar: 0.0,
            T_old: T,
            cv_old: 0.0,
            cp_old: 0.0,
            dcvdT: 0.0,
            dcpdT: 0.0,
            self_heat: true,
            e_nuc: 0.0,
            time: 0.0,
            n_rhs: 0,
            n_jac: 0,
            n_step: 0,
            success: true,
            status: IntegrationStatus::Success,
            sdc: None,
        }
    }

    /// attach the conserved data of a simplified-SDC burn
    pub fn with_sdc(mut self, sdc: SdcData) -> Self {
        self.sdc = Some(sdc);
        self
    }

    pub fn nspec(&self) -> usize {
        self.xn.len()
    }

    /// Clamp the mass fractions into [small_x, 1] and rescale them to sum to one.
    pub fn normalize_abundances(&mut self, small_x: f64) {
        for x in self.xn.iter_mut() {
            *x = x.clamp(small_x, 1.0);
        }
        let sum = self.xn.sum();
        self.xn /= sum;
    }

    /// copy the thermodynamic data of an EOS call into the burn state
    pub fn eos_to_burn(&mut self, eos_state: &EosState) {
        self.rho = eos_state.rho;
        self.T = eos_state.T;
        self.e = eos_state.e;
        self.xn.copy_from(&eos_state.xn);
        self.aux.copy_from(&eos_state.aux);
        self.cv = eos_state.cv;
        self.cp = eos_state.cp;
        self.y_e = eos_state.y_e;
        self.eta = eos_state.eta;
        self.abar = eos_state.abar;
        self.zbar = eos_state.zbar;
    }

    /// copy the burn state into an EOS record
    pub fn burn_to_eos(&self, eos_state: &mut EosState) {
        eos_state.rho = self.rho;
        eos_state.T = self.T;
        eos_state.e = self.e;
        eos_state.xn.copy_from(&self.xn);
        eos_state.aux.copy_from(&self.aux);
        eos_state.cv = self.cv;
        eos_state.cp = self.cp;
        eos_state.y_e = self.y_e;
        eos_state.eta = self.eta;
        eos_state.abar = self.abar;
        eos_state.zbar = self.zbar;
    }

    /// Displays the burn state and the diagnostics of the last burn in a table.
    pub fn pretty_print(&self, species_names: &[&str]) {
        let mut table = Table::new();
        table.add_row(row!["Quantity", "Value", "Units"]);
        table.add_row(row!["Density (rho)", format!("{:.6e}", self.rho), "g/cm^3"]);
        table.add_row(row!["Temperature (T)", format!("{:.6e}", self.T), "K"]);
        table.add_row(row!["Internal energy (e)", format!("{:.6e}", self.e), "erg/g"]);
        table.add_row(row!["Energy released", format!("{:.6e}", self.e_nuc), "erg/g"]);
        for (n, x) in self.xn.iter().enumerate() {
            let name = species_names
                .get(n)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("X[{}]", n));
            table.add_row(row![name, format!("{:.6e}", x), "-"]);
        }
        table.add_row(row!["RHS evaluations", self.n_rhs, "-"]);
        table.add_row(row!["Jacobian evaluations", self.n_jac, "-"]);
        table.add_row(row!["Steps", self.n_step, "-"]);
        table.add_row(row!["Status", format!("{:?}", self.status), "-"]);
        table.add_row(row!["Success", self.success, "-"]);
        println!("\nBurn state:");
        table.printstd();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_abundances() {
        let mut state = BurnState::new(1.0, 1.0e9, vec![0.5, -1.0e-3, 0.7], 0);
        state.normalize_abundances(1.0e-30);
        assert_relative_eq!(state.xn.sum(), 1.0, epsilon = 1e-14);
        assert!(state.xn.iter().all(|x| *x >= 0.0 && *x <= 1.0));
        assert_relative_eq!(state.xn[0] / state.xn[2], 0.5 / 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_energy_layout() {
        let data = SdcData::energy_from_primitive(2.0, &[0.25, 0.75], 3.0, [1.0, 0.0, 0.0]);
        let layout = data.layout;
        assert_eq!(layout.nvar(), 8);
        assert_eq!(layout.nevolve(), 4);
        assert_relative_eq!(data.y[1], 6.0);
        assert_relative_eq!(data.y[0], 6.0 + 1.0);
        assert_relative_eq!(data.y[layout.sfs() + 1], 1.5);
        assert_relative_eq!(data.density(), 2.0);
        assert_eq!(layout.smom(), Some([5, 6, 7]));
    }

    #[test]
    fn test_enthalpy_layout() {
        let data = SdcData::enthalpy_from_primitive(2.0, &[0.25, 0.75], 3.0, 1.0e10);
        assert_eq!(data.layout.nevolve(), 3);
        assert_eq!(data.layout.senth(), Some(2));
        assert_relative_eq!(data.density(), 2.0);
        assert_relative_eq!(data.y[2], 6.0);
        assert!(data.layout.seden().is_none());
    }
}
