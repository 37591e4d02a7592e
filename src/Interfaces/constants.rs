//! Physical constants, cgs units.

/// Avogadro's number, 1/mol
pub const N_A: f64 = 6.02214076e23;
/// Boltzmann constant, erg/K
pub const K_B: f64 = 1.380649e-16;
/// speed of light, cm/s
pub const C_LIGHT: f64 = 2.99792458e10;
/// electron volt, erg
pub const EV2ERG: f64 = 1.602176634e-12;
/// MeV, erg
pub const MEV2ERG: f64 = EV2ERG * 1.0e6;
/// gas constant k_B N_A, erg/K/mol
pub const R_GAS: f64 = K_B * N_A;
/// conversion of a binding-energy release rate in MeV per nucleus-mole to erg/g/s
pub const ENUC_CONV: f64 = MEV2ERG * N_A;
