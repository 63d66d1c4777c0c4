#![doc = "contentstack-republish: fetch entries per locale from the Contentstack delivery API and bulk republish them."]

//! The pipeline is linear: [`republish::select_target`] asks the operator for
//! an environment and content type, [`fetch`] drains every locale, and
//! [`publish`] sends the entries back in bulk batches with retry.
//!
//! The API and prompt seams live in [`contract`]; [`client`] is the reqwest
//! implementation used by the binary.

pub mod cli;
pub mod client;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod load_config;
pub mod prompt;
pub mod publish;
pub mod republish;
pub mod retry;

pub use cli::{run, Cli};
pub use error::{RepublishError, Result};
