pub mod client;
pub mod config;
pub mod error;
pub mod providers;
pub mod retry;
pub mod traits;
pub mod types;

pub use client::*;
pub use config::*;
pub use error::{ErrorKind, ProviderError};
pub use providers::VoyageRerankProvider;
pub use retry::*;
pub use traits::*;
pub use types::*;
