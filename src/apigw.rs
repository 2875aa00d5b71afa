//! AWS API Gatewayプロキシ統合向けのアダプタ
//!
//! ゲートウェイイベントを正規化リクエストへ変換し、ルートテーブルで
//! ハンドラーを選択し、ハンドラーの書き込んだレスポンスをゲートウェイ
//! 互換の形へ組み立てる。呼び出しごとの流れは 正規化 → マッチング →
//! ハンドラー → 組み立て の一直線で、アダプタ自体は呼び出しをまたぐ
//! 状態を持たない。

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, OnceLock};

use aws_lambda_events::encodings::Body as GatewayBody;
use aws_lambda_events::event::apigw::{
    ApiGatewayProxyRequest, ApiGatewayProxyRequestContext, ApiGatewayProxyResponse,
};
use aws_lambda_events::http::header::{HeaderMap, HeaderName, HeaderValue};
use lambda_runtime::{run, service_fn, Context, Error as LambdaError, LambdaEvent};
use log::{debug, info, warn};

use crate::common::context::AttachmentKey;
use crate::common::utils::lowercase_keys;
use crate::common::{ApiContext, ApiRequest, Body, Method};
use crate::error::Error;
use crate::handler::body::{parse_body, serialize_body};
use crate::router::Router;

/// ベースパスを与える環境変数名
const BASE_PATH_ENV: &str = "GATEBRIDGE_BASE_PATH";

/// Lambda実行コンテキストを運ぶ添付キー（アダプタ → ハンドラー）
pub fn lambda_context_key() -> AttachmentKey<Context> {
    static KEY: OnceLock<AttachmentKey<Context>> = OnceLock::new();
    *KEY.get_or_init(AttachmentKey::new)
}

/// API Gatewayのリクエストコンテキストを運ぶ添付キー（アダプタ → ハンドラー）
pub fn request_context_key() -> AttachmentKey<ApiGatewayProxyRequestContext> {
    static KEY: OnceLock<AttachmentKey<ApiGatewayProxyRequestContext>> = OnceLock::new();
    *KEY.get_or_init(AttachmentKey::new)
}

/// 受信ボディがBase64エンコードされていたかを示す添付キー（アダプタ → ハンドラー）
pub fn request_base64_key() -> AttachmentKey<bool> {
    static KEY: OnceLock<AttachmentKey<bool>> = OnceLock::new();
    *KEY.get_or_init(AttachmentKey::new)
}

/// 送信ボディをBase64で返すべきことをハンドラーが指定する添付キー（ハンドラー → アダプタ）
pub fn response_base64_key() -> AttachmentKey<bool> {
    static KEY: OnceLock<AttachmentKey<bool>> = OnceLock::new();
    *KEY.get_or_init(AttachmentKey::new)
}

/// アダプタの設定
#[derive(Debug, Clone, Default)]
pub struct AdaptorConfig {
    /// マッチング前にリクエストパスの先頭から取り除くベースパス
    pub base_path: Option<String>,
}

impl AdaptorConfig {
    /// 環境変数からベースパスを読み込む（未設定なら何も取り除かない）
    pub fn from_env() -> Self {
        let base_path = env::var(BASE_PATH_ENV).ok().filter(|s| !s.is_empty());
        Self { base_path }
    }

    /// ベースパスが必須の構成で環境変数から読み込む
    ///
    /// 非ルートパスにマウントされる場合に使用する。未設定は起動時の
    /// 致命的な設定エラーであり、リクエスト処理時のエラーにはしない。
    pub fn base_path_from_env() -> Result<Self, Error> {
        match env::var(BASE_PATH_ENV) {
            Ok(value) if !value.is_empty() => Ok(Self {
                base_path: Some(value),
            }),
            _ => Err(Error::ConfigurationError(format!(
                "{} must be set",
                BASE_PATH_ENV
            ))),
        }
    }
}

/// API Gatewayプロキシ統合のアダプタ
///
/// ルートテーブルと設定のみを保持し、呼び出しごとの可変状態は
/// すべてApiContext側に置かれる。
pub struct ApiGatewayAdaptor {
    router: Router,
    config: AdaptorConfig,
}

impl ApiGatewayAdaptor {
    /// 新しいアダプタを作成
    pub fn new(router: Router) -> Self {
        Self {
            router,
            config: AdaptorConfig::default(),
        }
    }

    /// 設定付きでアダプタを作成
    pub fn with_config(router: Router, config: AdaptorConfig) -> Self {
        Self { router, config }
    }

    /// ゲートウェイイベントから正規化リクエストを構築
    ///
    /// 正規化は構造的な変換のみで、構文的に妥当なイベントに対して
    /// 常に成功する。
    fn normalize(&self, event: &ApiGatewayProxyRequest) -> ApiRequest {
        // HTTPメソッドの変換（未知のメソッドはGETへフォールバック）
        let method = match Method::from_str(event.http_method.as_str()) {
            Some(method) => method,
            None => {
                debug!("Unknown HTTP method: {}, fallback to GET", event.http_method);
                Method::GET
            }
        };

        // パスの解決（キャッチオールの"proxy"パラメータがあれば優先）
        let mut path = match event.path_parameters.get("proxy") {
            Some(proxy) => format!("/{}", proxy),
            None => event.path.clone().unwrap_or_else(|| "/".to_string()),
        };

        // 設定されたベースパスを先頭から取り除く（セグメント境界でのみ）
        if let Some(base_path) = &self.config.base_path {
            let stripped = match path.strip_prefix(base_path.as_str()) {
                Some(rest) if rest.is_empty() => Some("/".to_string()),
                Some(rest) if rest.starts_with('/') => Some(rest.to_string()),
                _ => None,
            };
            match stripped {
                Some(resolved) => path = resolved,
                None => debug!("Path '{}' does not carry base path '{}'", path, base_path),
            }
        }

        // ヘッダーの正規化（キーを小文字化、大文字小文字のみ異なる重複は後勝ち）
        let headers = lowercase_keys(event.headers.iter().filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (key.as_str().to_string(), value.to_string()))
        }));

        // クエリパラメータの平坦化（複数値は反復順で後勝ち）
        let mut query_params = HashMap::new();
        for (key, value) in event.query_string_parameters.iter() {
            query_params.insert(key.to_string(), value.to_string());
        }

        // ボディのデコード（Base64宣言時は実際にデコードする）
        let raw_body = match &event.body {
            Some(body_str) if event.is_base64_encoded => match base64::decode(body_str) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    // 正規化はリクエストを失敗させない。生の文字列へフォールバック
                    warn!("Base64 decode error: {}, using raw body", e);
                    Some(body_str.clone().into_bytes())
                }
            },
            Some(body_str) => Some(body_str.clone().into_bytes()),
            None => None,
        };

        // Content-Typeに基づくボディ解析（助言的であり、失敗しても生ボディが残る）
        let content_type = headers.get("content-type").map(String::as_str);
        let body = match &raw_body {
            Some(bytes) => parse_body(content_type, bytes),
            None => Body::Empty,
        };

        let mut request = ApiRequest::new(method, path);
        request.query_params = query_params;
        request.headers = headers;
        request.raw_body = raw_body;
        request.body = body;
        request
    }

    /// ハンドラーの書き込んだレスポンスをゲートウェイ互換の形へ組み立てる
    fn assemble(&self, ctx: ApiContext) -> Result<ApiGatewayProxyResponse, Error> {
        let encode_base64 = ctx
            .attachments()
            .get(response_base64_key())
            .copied()
            .unwrap_or(false);
        let response = ctx.response;

        // ボディのシリアライズ（フラグ設定時はBase64で再エンコード）
        let (body, is_base64_encoded) = if encode_base64 {
            let encoded = match &response.body {
                Body::Raw(bytes) => base64::encode(bytes),
                other => base64::encode(serialize_body(other)?.as_bytes()),
            };
            (encoded, true)
        } else {
            (serialize_body(&response.body)?, false)
        };

        // ステータス未設定時の既定値: ボディがあれば200、なければ204
        let status_code = response
            .status
            .unwrap_or(if body.is_empty() { 204 } else { 200 });

        // ヘッダーの変換（不正なヘッダーは警告の上で除外）
        let mut headers = HeaderMap::new();
        for (key, value) in &response.headers {
            match (
                HeaderName::try_from(key.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(header_value)) => {
                    headers.insert(name, header_value);
                }
                _ => warn!("Dropping invalid response header: {}", key),
            }
        }

        Ok(ApiGatewayProxyResponse {
            status_code: i64::from(status_code),
            headers,
            multi_value_headers: HeaderMap::new(),
            body: Some(GatewayBody::Text(body)),
            is_base64_encoded,
        })
    }

    /// 1回の呼び出しを処理（正規化 → マッチング → ハンドラー → 組み立て）
    pub async fn handle_event(
        &self,
        event: LambdaEvent<ApiGatewayProxyRequest>,
    ) -> Result<ApiGatewayProxyResponse, Error> {
        let (event, lambda_context) = event.into_parts();
        let was_base64 = event.is_base64_encoded;
        let request_context = event.request_context.clone();

        let mut request = self.normalize(&event);
        info!("Received request: {} {}", request.method, request.path);

        let (handler, path_params) = self.router.resolve(request.method, &request.path);
        request.path_params = path_params;

        let mut ctx = ApiContext::new(request);
        ctx.attachments_mut().put(lambda_context_key(), lambda_context);
        ctx.attachments_mut().put(request_context_key(), request_context);
        ctx.attachments_mut().put(request_base64_key(), was_base64);

        // ハンドラーの失敗はここでは回復せず、そのまま実行基盤へ伝播させる
        let ctx = handler.handle(ctx).await?;

        self.assemble(ctx)
    }
}

/// アダプタをLambda関数として実行
pub async fn run_lambda(adaptor: ApiGatewayAdaptor) -> Result<(), LambdaError> {
    info!("Starting API Gateway adaptor");

    let adaptor = Arc::new(adaptor);

    // サービス関数の定義
    let handler_func = service_fn(move |event| {
        let adaptor = adaptor.clone();
        async move {
            adaptor
                .handle_event(event)
                .await
                .map_err(LambdaError::from)
        }
    });

    // Lambda実行ランタイムの起動
    run(handler_func).await?;

    Ok(())
}
