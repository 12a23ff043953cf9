mod deposit_contract;
mod ssv_network;

pub use deposit_contract::*;
pub use ssv_network::*;
