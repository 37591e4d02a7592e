/// carbon ignition burns with the shipped networks and the gamma-law EOS
pub mod burn_examples;
