//! Content-Typeに基づくボディのネゴシエーション
//!
//! 取り込み側の解析は助言的であり、失敗してもリクエストを落とさず
//! 生のボディをそのまま保持する。

use log::debug;

use crate::common::http::Body;
use crate::common::utils::{encode_query_string, parse_query_string};
use crate::error::Error;

/// Content-Typeの主トークンを取り出す（";"以降のcharset等のパラメータを除去）
pub fn primary_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// 宣言されたContent-Typeに応じてボディを解析
///
/// application/json と application/x-www-form-urlencoded のみ構造化し、
/// それ以外（Content-Type不明を含む）および解析失敗時は生のボディを返す。
pub fn parse_body(content_type: Option<&str>, raw: &[u8]) -> Body {
    if raw.is_empty() {
        return Body::Empty;
    }
    let Some(content_type) = content_type else {
        return Body::Raw(raw.to_vec());
    };
    match primary_content_type(content_type).as_str() {
        "application/json" => match serde_json::from_slice(raw) {
            Ok(value) => Body::Json(value),
            Err(e) => {
                // 解析失敗と不明なContent-Typeは外部的には同じフォールバックだが、
                // 原因はログで区別できるようにしておく
                debug!("JSON body parse failed, falling back to raw body: {}", e);
                Body::Raw(raw.to_vec())
            }
        },
        "application/x-www-form-urlencoded" => match std::str::from_utf8(raw) {
            Ok(text) => Body::Form(parse_query_string(text)),
            Err(e) => {
                debug!("Form body is not valid UTF-8, falling back to raw body: {}", e);
                Body::Raw(raw.to_vec())
            }
        },
        other => {
            debug!("Unrecognized content type: {}, passing body through", other);
            Body::Raw(raw.to_vec())
        }
    }
}

/// ボディを出口側の文字列表現へシリアライズ
///
/// 文字列はそのまま通し、構造化値はJSONへ、フォームはURLエンコードへ
/// 再シリアライズする。ボディなしは空文字列。
pub fn serialize_body(body: &Body) -> Result<String, Error> {
    match body {
        Body::Empty => Ok(String::new()),
        Body::Text(text) => Ok(text.clone()),
        Body::Raw(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        // シリアライズ済みの文字列値を再び引用符で包まない
        Body::Json(serde_json::Value::String(text)) => Ok(text.clone()),
        Body::Json(value) => serde_json::to_string(value)
            .map_err(|e| Error::ResponseSerializationError(e.to_string())),
        Body::Form(params) => Ok(encode_query_string(params)),
    }
}
