//! Address-to-coordinate resolution.
//!
//! Resolution runs as a batch before any evaluation; the engine only ever
//! sees coordinates that resolved.

pub mod postcode;
mod postcodes_io;
mod resolver;

pub use postcodes_io::PostcodesIoClient;
pub use resolver::{resolve_batch, CachedResolver, CoordinateResolver, Resolution, Unresolved};
