use crate::Eos::gamma_law::GammaLaw;
use crate::Integration::vode_type::VodeStatistics;
use crate::Interfaces::burn_type::{BurnState, SdcData, SdcEvolve};
use crate::Interfaces::burner::Burner;
use crate::Interfaces::eos_composition::call_eos;
use crate::Interfaces::eos_type::{EosInput, EosState};
use crate::Interfaces::network::Network;
use crate::Networks::create_network_by_name;
use crate::Networks::ignition_simple::IgnitionSimple;
use crate::settings::{BurnerSettings, CouplingKind, IntegratorKind, JacobianMode};
use log::{error, info};

fn report(label: &str, network: &impl Network, state: &BurnState, stats: &VodeStatistics) {
    info!(
        "{}: {} steps, {} rhs, {} jacobians, last order {}",
        label, stats.n_steps, stats.n_rhs, stats.n_jac, stats.last_order
    );
    state.pretty_print(network.species_names());
}

pub fn burn_examples(task: usize) {
    //
    let eos = GammaLaw::default();
    match task {
        0 => {
            // carbon ignition, operator split, BDF with analytic Jacobian
            let network = IgnitionSimple::new();
            let settings = BurnerSettings::default().with_verbose(true);
            let burner = Burner::new(&network, &eos, &settings);
            let mut state = BurnState::new(1.0e8, 2.0e9, vec![0.5, 0.5, 0.0], 0);
            let stats = burner.burn(&mut state, 1.0e-2);
            report("Strang + VODE", &network, &state, &stats);
        }
        1 => {
            // the same burn with a finite-difference Jacobian and the explicit fallback
            let network = IgnitionSimple::new();
            let numerical = BurnerSettings::default().with_jacobian(JacobianMode::Numerical);
            let euler = BurnerSettings::default().with_integrator(IntegratorKind::ForwardEuler);
            for (label, settings) in [("numerical Jacobian", numerical), ("forward Euler", euler)] {
                let burner = Burner::new(&network, &eos, &settings);
                let mut state = BurnState::new(1.0e8, 2.0e9, vec![0.5, 0.5, 0.0], 0);
                let stats = burner.burn(&mut state, 1.0e-2);
                report(label, &network, &state, &stats);
            }
        }
        2 => {
            // simplified SDC: conserved energy evolution with a compressive advective source
            let network = IgnitionSimple::new();
            let settings = BurnerSettings::default()
                .with_coupling(CouplingKind::SimplifiedSdc)
                .with_sdc_evolve(SdcEvolve::Energy)
                .with_verbose(true);
            let (rho, T) = (1.0e8, 2.0e9);
            let xn = [0.5, 0.5, 0.0];
            let mut eos_state = EosState::new(network.nspec(), network.naux());
            eos_state.rho = rho;
            eos_state.T = T;
            eos_state.xn.copy_from_slice(&xn);
            if let Err(e) = call_eos(&network, &eos, EosInput::RT, &mut eos_state) {
                error!("EOS call failed: {}", e);
                return;
            }
            let mut data = SdcData::energy_from_primitive(rho, &xn, eos_state.e, [1.0e8, 0.0, 0.0]);
            let layout = data.layout;
            let drho_dt = 1.0e9;
            if let Some(srho) = layout.srho() {
                data.ydot_a[srho] = drho_dt;
            }
            for (n, x) in xn.iter().enumerate() {
                data.ydot_a[layout.sfs() + n] = x * drho_dt;
            }
            let mut state = BurnState::new(rho, T, xn.to_vec(), 0).with_sdc(data);
            let burner = Burner::new(&network, &eos, &settings);
            let stats = burner.burn(&mut state, 1.0e-2);
            report("simplified SDC", &network, &state, &stats);
        }
        3 => {
            // settings round trip and a network chosen by name
            let settings = BurnerSettings::default().with_species_tolerances(1.0e-10, 1.0e-10);
            match serde_json::to_string_pretty(&settings) {
                Ok(json) => println!("settings:\n{}", json),
                Err(e) => error!("serialization failed: {}", e),
            }
            let network = match create_network_by_name("linear_decay") {
                Ok(network) => network,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            let burner = Burner::new(&network, &eos, &settings);
            let mut state = BurnState::new(1.0, 1.0e8, vec![1.0, 0.0], 0);
            let stats = burner.burn(&mut state, 1.0);
            report("linear decay", &network, &state, &stats);
        }
        _ => {
            println!("no example with number {}", task);
        }
    }
}
