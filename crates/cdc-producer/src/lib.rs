//! Wiring crate: the Delivery Loop, `SourceContext`,
//! `ProducerConfig`, pipeline assembly, logging bootstrap, and the binary
//! entry point in `main.rs` that ties every other crate together into one
//! running producer.

pub mod config;
pub mod context;
pub mod delivery;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::ProducerConfig;
pub use context::SourceContext;
pub use delivery::DeliveryLoop;
pub use pipeline::Pipeline;
