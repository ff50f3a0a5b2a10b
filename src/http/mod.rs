//! HTTP protocol layer module
//!
//! Response builders and CORS handling, decoupled from request routing.

pub mod cors;
pub mod response;

// Re-export commonly used types
pub use cors::{apply_cors, apply_preflight};
pub use response::{
    build_404_response, build_405_response, build_error_response, build_health_response,
    build_options_response, build_passthrough_response, build_text_response,
};
