//! エラー型の定義

use thiserror::Error;

/// アダプタのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// 設定エラー（起動時に致命的）
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 不正なルートテンプレート
    #[error("Invalid route template: {0}")]
    InvalidRouteTemplate(String),

    /// 同一の (メソッド, テンプレート) の二重登録
    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// レスポンスのシリアライズエラー
    #[error("Failed to serialize response: {0}")]
    ResponseSerializationError(String),

    /// ハンドラー内部のエラー（実行基盤へそのまま伝播する）
    #[error("Handler error: {0}")]
    HandlerError(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigurationError(_) => 500,
            Error::InvalidRouteTemplate(_) => 500,
            Error::DuplicateRoute(_) => 500,
            Error::InvalidRequestBody(_) => 400,
            Error::ResponseSerializationError(_) => 500,
            Error::HandlerError(_) => 500,
        }
    }
}
