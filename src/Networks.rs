/// tabulated reaction rates with Lagrange interpolation
pub mod rate_table;
/// generic right-hand side and Jacobian assembly from a table of reaction terms
pub mod rhs_terms;
/// 12C + 12C carbon ignition network
pub mod ignition_simple;
/// networks with closed-form solutions
pub mod test_networks;

use crate::Interfaces::burn_type::BurnState;
use crate::Interfaces::errors::BurnError;
use crate::Interfaces::network::Network;
use enum_dispatch::enum_dispatch;
use ignition_simple::IgnitionSimple;
use nalgebra::{DMatrix, DVector};
use test_networks::{LinearDecay, PureHeating};

/// the networks shipped with the crate, dispatched statically
#[derive(Debug, Clone)]
#[enum_dispatch(Network)]
pub enum NetworkKind {
    IgnitionSimple(IgnitionSimple),
    LinearDecay(LinearDecay),
    PureHeating(PureHeating),
}

/// Creates a network by name. The test networks are built with unit rates.
pub fn create_network_by_name(name: &str) -> Result<NetworkKind, BurnError> {
    match name {
        "ignition_simple" | "ignition" => Ok(NetworkKind::IgnitionSimple(IgnitionSimple::new())),
        "linear_decay" => Ok(NetworkKind::LinearDecay(LinearDecay::new(1.0, 1.0))),
        "pure_heating" => Ok(NetworkKind::PureHeating(PureHeating::new(1.0))),
        _ => Err(BurnError::InvalidConfiguration(format!(
            "unknown network: {}",
            name
        ))),
    }
}
