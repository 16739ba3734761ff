pub mod client;

pub use client::SolanaLedger;
