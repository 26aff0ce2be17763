//! Background tasks started with the server.

mod prewarm;

pub use prewarm::prewarm;
