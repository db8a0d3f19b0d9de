// Authentication module
// Manages the OAuth client-credentials token lifecycle

mod credentials;
mod exchange;
mod manager;
mod types;

pub use credentials::Credentials;
pub use manager::{TokenManager, TokenManagerBuilder, DEFAULT_AGENT};
pub use types::Token;
