//! Upwind API model types.

mod api_endpoint;
mod common;
mod configuration;
mod sbom;
mod threat;
mod vulnerability;
mod webhook;
mod workflow;

pub use api_endpoint::*;
pub use common::*;
pub use configuration::*;
pub use sbom::*;
pub use threat::*;
pub use vulnerability::*;
pub use webhook::*;
pub use workflow::*;
