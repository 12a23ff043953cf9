pub mod chain;
pub mod clients;
mod commands;
pub mod config;
pub mod dkg;
pub mod files;
pub mod pipeline;
pub mod problems;
mod tracing_util;

pub use commands::{
    MergeDepositCommand, NewOperatorsCommand, OffboardCommand, OnboardCommand, OperatorsCommand,
    PingCommand,
};
pub use tracing_util::initialize_tracing_log;
