//! # BDF integrator data
//!
//! ## Main Structures
//! - `VodeControls`: the per-burn limits taken from the settings
//! - `DvodeWorkspace`: solution history (Nordsieck array), error weights, corrector buffers,
//!   Jacobian cache, iteration matrix and step/order bookkeeping. Every buffer is allocated in
//!   [`DvodeWorkspace::new`]; stepping never allocates.
//! - `VodeStatistics`: counters reported after an integration
//!
//! ## Nordsieck array
//! Column j of `yh` holds h^j y^(j)(t_n) / j!. The BDF coefficients follow the fixed-leading-
//! coefficient form: `el[0]` = l0 multiplies the correction in the solution update, `el[1]` = 1.
use crate::Interfaces::errors::IntegrationStatus;
use crate::settings::BurnerSettings;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub const UROUND: f64 = f64::EPSILON;
/// coefficient drift below which a convergence failure refreshes the Jacobian
pub const CCMXJ: f64 = 0.2;
/// coefficient drift above which the iteration matrix is re-formed
pub const CCMAX: f64 = 0.3;
/// steps between re-formations of the iteration matrix
pub const MSBP: usize = 20;
pub const MAXCOR: usize = 3;
pub const MXNCF: usize = 10;
pub const MXNEF: usize = 7;
pub const HMIN: f64 = 0.0;
pub const VODE_MAXORD: usize = 5;
pub const VODE_LMAX: usize = VODE_MAXORD + 1;
/// step growth needed before a change of step or order is applied
pub const THRESH: f64 = 1.5;
/// largest step growth on the first step, on later steps and after a failure
pub const ETAMX1: f64 = 1.0e4;
pub const ETAMX2: f64 = 10.0;
pub const ETAMX3: f64 = 2.0;
/// initial estimate of the corrector convergence rate
pub const CRATE_INIT: f64 = 0.7;
/// a converged X must satisfy -tol <= X <= 1 + tol
pub const VODE_FAILURE_TOLERANCE: f64 = 1.0e-2;

#[derive(Debug, Clone, PartialEq)]
pub struct VodeControls {
    pub max_steps: usize,
    pub max_dt: f64,
    pub max_steps_between_jacobian_evals: usize,
    pub use_species_change_limiter: bool,
    pub increase_change_factor: f64,
    pub decrease_change_factor: f64,
}

impl VodeControls {
    pub fn from_settings(settings: &BurnerSettings) -> Self {
        Self {
            max_steps: settings.ode_max_steps,
            max_dt: settings.ode_max_dt,
            max_steps_between_jacobian_evals: settings.max_steps_between_jacobian_evals,
            use_species_change_limiter: settings.use_species_change_limiter,
            increase_change_factor: settings.species_increase_change_factor,
            decrease_change_factor: settings.species_decrease_change_factor,
        }
    }
}

impl Default for VodeControls {
    fn default() -> Self {
        Self::from_settings(&BurnerSettings::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VodeStatistics {
    pub n_steps: usize,
    pub n_rhs: usize,
    pub n_jac: usize,
    pub n_lu: usize,
    pub n_error_test_failures: usize,
    pub n_convergence_failures: usize,
    /// size and order of the last successful step
    pub last_step: f64,
    pub last_order: usize,
    pub time: f64,
    pub status: Option<IntegrationStatus>,
}

/// BDF coefficients of order `nq`: `el[0..=nq]` and the error constants `tq`
/// (order nq-1, order nq, order nq+1).
pub fn bdf_coefficients(nq: usize) -> ([f64; VODE_LMAX], [f64; 3]) {
    let mut pc = [0.0; VODE_LMAX + 1];
    pc[0] = 1.0;
    let mut rq1fac = 1.0;
    let mut el = [0.0; VODE_LMAX];
    let mut tq = [0.0; 3];
    for q in 1..=nq {
        let fq = q as f64;
        // coefficients of p(x) (x + q)
        pc[q] = 0.0;
        for i in (1..=q).rev() {
            pc[i] = pc[i - 1] + fq * pc[i];
        }
        pc[0] *= fq;
        if q == nq {
            for i in 0..=q {
                el[i] = pc[i] / pc[1];
            }
            el[1] = 1.0;
            tq[0] = rq1fac;
            tq[1] = (q + 1) as f64 / el[0];
            tq[2] = (q + 2) as f64 / el[0];
        }
        rq1fac /= fq;
    }
    (el, tq)
}

#[derive(Debug, Clone)]
pub struct DvodeWorkspace {
    pub neq: usize,
    pub controls: VodeControls,

    pub rtol: DVector<f64>,
    pub atol: DVector<f64>,

    /// current time of the caller and target time
    pub t: f64,
    pub tout: f64,
    /// time of the Nordsieck history
    pub tn: f64,
    pub told: f64,

    /// solution at `t` on return, predicted/corrected solution while stepping
    pub y: DVector<f64>,
    pub yh: DMatrix<f64>,
    /// error weights, 1/(rtol |y| + atol)
    pub ewt: DVector<f64>,
    pub savf: DVector<f64>,
    pub acor: DVector<f64>,
    pub ftem: DVector<f64>,
    /// solution at the start of the current step, used by the species change limiter
    pub y_prev: DVector<f64>,

    pub jac: DMatrix<f64>,
    pub jac_save: DMatrix<f64>,
    /// LU factors of P = I - h l0 J
    pub p: DMatrix<f64>,
    pub pivots: Vec<usize>,

    pub h: f64,
    pub hold: f64,
    pub hmxi: f64,
    pub hu: f64,
    pub rc: f64,
    /// |rc - 1| at the start of the current attempt
    pub drc: f64,
    pub crate_: f64,
    pub conit: f64,
    pub rmax: f64,
    pub el: [f64; VODE_LMAX],
    pub el0: f64,
    pub tesco: [f64; 3],

    pub nq: usize,
    pub nqu: usize,
    pub l: usize,
    pub ialth: usize,
    pub ipup: bool,
    pub jcur: bool,
    /// convergence failure flag of the current attempt: 0 none, 1 stale Jacobian, 2 step cut
    pub icf: u8,
    pub nslp: usize,
    pub nslj: usize,

    pub nst: usize,
    pub nfe: usize,
    pub nje: usize,
    pub nlu: usize,
    pub netf: usize,
    pub ncfn: usize,
    /// species slots checked by the change limiter
    pub species: std::ops::Range<usize>,
}

impl DvodeWorkspace {
    pub fn new(neq: usize, controls: VodeControls) -> Self {
        let hmxi = 1.0 / controls.max_dt;
        Self {
            neq,
            controls,
            rtol: DVector::zeros(neq),
            atol: DVector::zeros(neq),
            t: 0.0,
            tout: 0.0,
            tn: 0.0,
            told: 0.0,
            y: DVector::zeros(neq),
            yh: DMatrix::zeros(neq, VODE_LMAX),
            ewt: DVector::zeros(neq),
            savf: DVector::zeros(neq),
            acor: DVector::zeros(neq),
            ftem: DVector::zeros(neq),
            y_prev: DVector::zeros(neq),
            jac: DMatrix::zeros(neq, neq),
            jac_save: DMatrix::zeros(neq, neq),
            p: DMatrix::zeros(neq, neq),
            pivots: vec![0; neq],
            h: 0.0,
            hold: 0.0,
            hmxi,
            hu: 0.0,
            rc: 0.0,
            drc: 0.0,
            crate_: CRATE_INIT,
            conit: 0.0,
            rmax: ETAMX1,
            el: [0.0; VODE_LMAX],
            el0: 1.0,
            tesco: [0.0; 3],
            nq: 1,
            nqu: 0,
            l: 2,
            ialth: 2,
            ipup: true,
            jcur: false,
            icf: 0,
            nslp: 0,
            nslj: 0,
            nst: 0,
            nfe: 0,
            nje: 0,
            nlu: 0,
            netf: 0,
            ncfn: 0,
            species: 0..0,
        }
    }

    pub fn set_tolerances(&mut self, rtol: &DVector<f64>, atol: &DVector<f64>) {
        self.rtol.copy_from(rtol);
        self.atol.copy_from(atol);
    }

    pub fn statistics(&self, status: IntegrationStatus) -> VodeStatistics {
        VodeStatistics {
            n_steps: self.nst,
            n_rhs: self.nfe,
            n_jac: self.nje,
            n_lu: self.nlu,
            n_error_test_failures: self.netf,
            n_convergence_failures: self.ncfn,
            last_step: self.hu,
            last_order: self.nqu,
            time: self.t,
            status: Some(status),
        }
    }
}
