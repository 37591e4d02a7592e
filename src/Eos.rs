/// ideal gas with constant adiabatic index, fully ionized
/// # Examples
/// ```
/// use NuBurn::Eos::gamma_law::GammaLaw;
/// use NuBurn::Interfaces::eos_type::{Eos, EosInput, EosState};
/// let eos = GammaLaw::default();
/// let mut state = EosState::new(1, 0);
/// state.rho = 1.0e6;
/// state.T = 1.0e8;
/// state.abar = 4.0;
/// state.zbar = 2.0;
/// eos.eos(EosInput::RT, &mut state).unwrap();
/// let e = state.e;
/// state.T = 0.0;
/// eos.eos(EosInput::RE, &mut state).unwrap();
/// assert!((state.T - 1.0e8).abs() < 1e-4);
/// assert!((state.e - e).abs() / e < 1e-14);
/// ```
pub mod gamma_law;
