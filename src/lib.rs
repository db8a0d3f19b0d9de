// NYPL Platform client - library root
//
// OAuth client-credentials authentication plus authorized bib/item lookups
// against the NYPL Platform API.

pub mod auth;
pub mod config;
pub mod error;
pub mod params;
pub mod session;
pub mod timeout;

pub use auth::{Credentials, Token, TokenManager, TokenManagerBuilder, DEFAULT_AGENT};
pub use error::{Error, Result};
pub use params::{BibListQuery, ItemListQuery, Keywords, Source};
pub use session::{AuthorizedSession, AuthorizedSessionBuilder, Target, DEV_BASE_URL, PROD_BASE_URL};
pub use timeout::Timeout;
