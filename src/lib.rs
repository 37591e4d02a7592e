//! # NuBurn
//!
//! Stiff ODE integration of thermonuclear burning for a single fluid element.
//!
//! ## Purpose
//! Given density, temperature and composition of a fluid element, advance the mass fractions,
//! temperature and internal energy over a timestep under the action of a reaction network,
//! closing the thermodynamics with an equation of state.
//!
//! ## Main Modules
//! - **Interfaces**: burn state, EOS/network traits, composition, temperature equation, burner, NSE
//! - **Eos**: equations of state (ideal gamma-law gas)
//! - **Networks**: reaction networks, reaction-term tables and tabulated rates
//! - **Integration**: VODE-style BDF core, Strang and simplified-SDC coupling, forward Euler
//! - **settings**: serializable burner configuration
//! - **Examples**: runnable burn demonstrations
//!
//! ## Example
//! ```rust, no_run
//! use NuBurn::Eos::gamma_law::GammaLaw;
//! use NuBurn::Interfaces::burn_type::BurnState;
//! use NuBurn::Interfaces::burner::Burner;
//! use NuBurn::Networks::ignition_simple::IgnitionSimple;
//! use NuBurn::settings::BurnerSettings;
//!
//! let network = IgnitionSimple::new();
//! let eos = GammaLaw::default();
//! let settings = BurnerSettings::default();
//! let burner = Burner::new(&network, &eos, &settings);
//! let mut state = BurnState::new(1.0e9, 3.0e9, vec![0.5, 0.5, 0.0], 0);
//! burner.burn(&mut state, 1.0e-6);
//! assert!(state.success);
//! ```
#[allow(non_snake_case)]
pub mod Eos;
#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Integration;
#[allow(non_snake_case)]
pub mod Interfaces;
#[allow(non_snake_case)]
pub mod Networks;
pub mod settings;
