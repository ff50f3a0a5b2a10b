//! Request handler module
//!
//! Responsible for request routing dispatch and the outlet forwarding endpoint.

pub mod outlet;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
