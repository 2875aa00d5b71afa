//! HTTP関連の基本型（メソッド、正規化リクエスト/レスポンス、ボディ表現）

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// HTTPメソッド
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::HEAD => write!(f, "HEAD"),
            Method::OPTIONS => write!(f, "OPTIONS"),
        }
    }
}

impl Method {
    /// 文字列からMethodに変換
    pub fn from_str(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }
}

/// コンテンツネゴシエーションを経たボディの表現
///
/// 取り込み時はContent-Typeに応じてJson/Form/Rawのいずれかとなり、
/// 出口側ではこの表現から文字列ボディへシリアライズされる。
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// ボディなし
    Empty,
    /// 未解釈のバイト列（不明なContent-Typeや解析失敗時のフォールバック）
    Raw(Vec<u8>),
    /// プレーンな文字列
    Text(String),
    /// 構造化されたJSON値
    Json(serde_json::Value),
    /// application/x-www-form-urlencoded のキー/値
    Form(HashMap<String, String>),
}

impl Body {
    /// ボディが空かどうか
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Raw(bytes) => bytes.is_empty(),
            Body::Text(text) => text.is_empty(),
            Body::Json(_) | Body::Form(_) => false,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

/// 正規化されたHTTPリクエスト
///
/// ゲートウェイイベントから呼び出しごとに生成され、ハンドラーが
/// 呼び出しの間だけ所有する。ヘッダーキーは小文字に正規化済み。
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTPメソッド
    pub method: Method,
    /// 解決済みのリクエストパス
    pub path: String,
    /// パスパラメータ（テンプレートのプレースホルダ名 -> マッチしたセグメント）
    pub path_params: HashMap<String, String>,
    /// クエリパラメータ（単一値へ平坦化済み）
    pub query_params: HashMap<String, String>,
    /// HTTPヘッダー（キーは小文字）
    pub headers: HashMap<String, String>,
    /// 生のリクエストボディ
    pub raw_body: Option<Vec<u8>>,
    /// Content-Typeに基づいて解析されたボディ
    pub body: Body,
}

impl ApiRequest {
    /// 新しいリクエストを作成
    pub fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            headers: HashMap::new(),
            raw_body: None,
            body: Body::Empty,
        }
    }

    /// クエリパラメータを追加
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// ヘッダーを追加（キーは小文字化して格納）
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// 生ボディを設定
    pub fn with_raw_body(mut self, raw_body: Vec<u8>) -> Self {
        self.raw_body = Some(raw_body);
        self
    }

    /// 解析済みボディを設定
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// 生ボディを型付きでJSONとしてパース
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if let Some(raw_body) = &self.raw_body {
            serde_json::from_slice(raw_body).map_err(|e| Error::InvalidRequestBody(e.to_string()))
        } else {
            Err(Error::InvalidRequestBody("No request body".to_string()))
        }
    }

    /// 解析済みボディをJSON値として取得
    pub fn json_value(&self) -> Option<&serde_json::Value> {
        if let Body::Json(value) = &self.body {
            Some(value)
        } else {
            None
        }
    }

    /// 解析済みボディをフォームデータとして取得
    pub fn form(&self) -> Option<&HashMap<String, String>> {
        if let Body::Form(params) = &self.body {
            Some(params)
        } else {
            None
        }
    }
}

/// ハンドラーが書き込むHTTPレスポンス
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    /// HTTPステータスコード（未設定の場合はアセンブラが既定値を決める）
    pub status: Option<u16>,
    /// HTTPヘッダー（出口側では大文字小文字を変換しない）
    pub headers: HashMap<String, String>,
    /// レスポンスボディ
    pub body: Body,
}

impl ApiResponse {
    /// 新しいレスポンスを作成
    pub fn new(status: u16) -> Self {
        Self {
            status: Some(status),
            headers: HashMap::new(),
            body: Body::Empty,
        }
    }

    /// 200 OKレスポンスを作成
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 204 No Contentレスポンスを作成
    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// 404 Not Foundレスポンスを作成
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// ボディを設定
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// JSONをボディとして設定
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::ResponseSerializationError(e.to_string()))?;

        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self.body = Body::Json(value);
        Ok(self)
    }

    /// テキストをボディとして設定
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.headers.insert(
            "Content-Type".to_string(),
            "text/plain; charset=utf-8".to_string(),
        );
        self.body = Body::Text(text.into());
        self
    }
}
