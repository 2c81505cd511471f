//! Seams between the pipeline and the systems it talks to.
//!
//! The pipeline only sees these traits, so it runs against the Postgres
//! stores in production and the in-memory doubles in tests.

pub mod reporter;
pub mod source;
pub mod target;
