//! Transport adapters.
//!
//! Each adapter maps its transport's session semantics onto the request
//! pipeline: session id from transport metadata, one input per leg,
//! framing from the pipeline's continue flag.

pub mod at;
pub mod http;
pub mod ssh;
pub mod stdin;
