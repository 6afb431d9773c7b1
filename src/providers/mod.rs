//! Wallet provider implementations

pub mod bitpanda;

pub use bitpanda::BitpandaProvider;
