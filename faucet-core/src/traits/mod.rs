pub use chain_client::*;
pub use signing::*;
pub use token::*;

mod chain_client;
mod signing;
mod token;
