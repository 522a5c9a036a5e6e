mod core;
mod insights;

pub use self::core::GitHubProvider;
