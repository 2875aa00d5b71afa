//! ハンドラーの実装（分割モジュール）

pub mod body;
pub mod core;

pub use body::{parse_body, primary_content_type, serialize_body};
pub use core::{handler_fn, FnHandler, Handler};

#[cfg(test)]
mod tests;
