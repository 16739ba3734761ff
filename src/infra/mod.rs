pub mod config;
pub mod ledger;
pub mod routing;
pub mod solana;
