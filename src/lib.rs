//! GateBridge: AWS API Gatewayのプロキシイベントをトランスポート非依存の
//! リクエスト/レスポンスモデルへ橋渡しするアダプタライブラリ
//!
//! ゲートウェイイベントの正規化、パステンプレートによるルーティング、
//! Content-Typeに基づくボディのネゴシエーション、型付き添付コンテキスト、
//! ゲートウェイ互換レスポンスの組み立てを提供する。

pub mod apigw;
pub mod common;
pub mod error;
pub mod handler;
pub mod router;

pub use apigw::{run_lambda, AdaptorConfig, ApiGatewayAdaptor};
pub use common::*;
pub use error::*;
pub use handler::*;
pub use router::{Router, RouterBuilder};

/// ルートと設定からアダプタを構築するためのビルダー
///
/// 登録は構築時に一度だけ行い、build()以降のルートテーブルは不変となる。
pub struct GateBridgeBuilder {
    router: RouterBuilder,
    config: AdaptorConfig,
}

impl Default for GateBridgeBuilder {
    fn default() -> Self {
        Self {
            router: RouterBuilder::new(),
            config: AdaptorConfig::default(),
        }
    }
}

impl GateBridgeBuilder {
    /// 新しいGateBridgeBuilderインスタンスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ルートを登録
    pub fn route<H>(mut self, method: Method, template: &str, handler: H) -> Result<Self, Error>
    where
        H: Handler + 'static,
    {
        self.router = self.router.route(method, template, handler)?;
        Ok(self)
    }

    /// デフォルトルートのハンドラーを差し替え
    pub fn default_handler<H>(mut self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.router = self.router.default_handler(handler);
        self
    }

    /// アダプタの設定を指定
    pub fn config(mut self, config: AdaptorConfig) -> Self {
        self.config = config;
        self
    }

    /// アダプタをビルドして返却
    pub fn build(self) -> ApiGatewayAdaptor {
        ApiGatewayAdaptor::with_config(self.router.build(), self.config)
    }
}
