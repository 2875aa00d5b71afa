//! ハンドラーの特性と関数アダプタ

use std::future::Future;

use async_trait::async_trait;

use crate::common::ApiContext;
use crate::error::Error;

/// ハンドラーの特性
///
/// ハンドラーはコンテキストを受け取り、responseへ書き込んで返却する。
/// 失敗はアダプタでは回復せず、実行基盤へそのまま伝播する。
#[async_trait]
pub trait Handler: Send + Sync {
    /// リクエストを処理
    async fn handle(&self, ctx: ApiContext) -> Result<ApiContext, Error>;
}

/// 非同期クロージャをHandlerとして扱うためのアダプタ
pub struct FnHandler<F> {
    handler_fn: F,
}

/// クロージャ（または非同期関数）からハンドラーを作成
pub fn handler_fn<F, Fut>(handler_fn: F) -> FnHandler<F>
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiContext, Error>> + Send + 'static,
{
    FnHandler { handler_fn }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(ApiContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiContext, Error>> + Send + 'static,
{
    async fn handle(&self, ctx: ApiContext) -> Result<ApiContext, Error> {
        (self.handler_fn)(ctx).await
    }
}
