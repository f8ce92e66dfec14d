//! OTP gateway adapter module
//!
//! Provides the HTTP implementation of the core `OtpGateway` trait along with
//! the response decoder and SMS templating it relies on.

pub mod http_gateway;
pub mod message;
pub mod response;


pub use http_gateway::HttpOtpGateway;
pub use message::render_message;
pub use response::{decode_gateway_payload, parse_issue_response, parse_validate_response};
