//! 共通の型とユーティリティ

pub mod context;
pub mod http;
pub mod utils;

pub use context::{ApiContext, AttachmentKey, AttachmentMap};
pub use http::{ApiRequest, ApiResponse, Body, Method};
