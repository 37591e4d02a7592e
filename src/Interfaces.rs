/// error types shared by the closures, the integrators and the configuration layer
pub mod errors;
/// physical constants in cgs units
pub mod constants;
/// the burn state: the unit of work handed to every integrator
/// # Examples
/// ```
/// use NuBurn::Interfaces::burn_type::BurnState;
/// let mut state = BurnState::new(1.0e8, 1.0e9, vec![0.3, 0.3, 0.3], 0);
/// state.normalize_abundances(1.0e-30);
/// let sum: f64 = state.xn.iter().sum();
/// assert!((sum - 1.0).abs() < 1e-14);
/// ```
pub mod burn_type;
/// equation of state interface: input modes, EOS state record and the `Eos` trait
pub mod eos_type;
/// mean composition quantities and their derivatives with respect to mass fractions
pub mod eos_composition;
/// reaction network interface
pub mod network;
/// finite-difference Jacobian of a network in mass-fraction variables
pub mod numerical_jacobian;
/// temperature equation appended to the network right-hand side
pub mod temperature_integration;
/// nuclear statistical equilibrium tables and the shortcut interface
pub mod nse;
/// top-level burner: NSE shortcut, integrator and coupling selection
pub mod burner;
