//! Registry records, selection and credentials.

mod http;
mod manager;
mod types;

pub use http::RegistryHttpClient;
pub use manager::{RegistryManager, NPM_TOKEN_ENV};
pub use types::{Registry, RegistryAccess};
