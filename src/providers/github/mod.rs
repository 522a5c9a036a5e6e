mod client;
mod provider;

pub use client::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
pub use provider::GitHubProvider;
