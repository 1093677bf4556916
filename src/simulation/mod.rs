// Simulated chain for paper trading without an RPC node

pub mod chain;

pub use chain::{ConfirmationMode, SimulatedChain, RENT_EXEMPT_LAMPORTS, SIM_PAIR, SIM_WALLET};
