pub mod ack;
pub mod audit;
pub mod capability;
pub mod cli;
pub mod clock;
pub mod config;
pub mod intent;
pub mod invariant;
pub mod lens;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod server;
pub mod shield;
pub mod types;
