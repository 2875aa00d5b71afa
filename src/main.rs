use log::info;
use serde::{Deserialize, Serialize};

use gatebridge::apigw::run_lambda;
use gatebridge::common::{ApiContext, ApiResponse, Method};
use gatebridge::error::Error;
use gatebridge::handler::handler_fn;
use gatebridge::{AdaptorConfig, ApiGatewayAdaptor, GateBridgeBuilder};

#[derive(Serialize, Deserialize)]
struct Item {
    id: String,
    name: String,
    description: Option<String>,
}

// サンプルのヘルスチェックハンドラー
async fn health_handler(mut ctx: ApiContext) -> Result<ApiContext, Error> {
    ctx.response = ApiResponse::ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))?;
    Ok(ctx)
}

// サンプルのアイテム取得ハンドラー
async fn get_item(mut ctx: ApiContext) -> Result<ApiContext, Error> {
    let id = ctx
        .request
        .path_params
        .get("id")
        .cloned()
        .unwrap_or_default();
    ctx.response = ApiResponse::ok().json(&Item {
        id,
        name: "Item".to_string(),
        description: None,
    })?;
    Ok(ctx)
}

// 新しいアイテムを作成するハンドラー
async fn create_item(mut ctx: ApiContext) -> Result<ApiContext, Error> {
    let item: Item = ctx.request.json()?;
    info!("Creating new item: {}", item.name);
    ctx.response = ApiResponse::new(201).json(&item)?;
    Ok(ctx)
}

fn build_adaptor() -> Result<ApiGatewayAdaptor, Error> {
    Ok(GateBridgeBuilder::new()
        .config(AdaptorConfig::from_env())
        .route(Method::GET, "/", handler_fn(health_handler))?
        .route(Method::GET, "/items/{id}", handler_fn(get_item))?
        .route(Method::POST, "/items", handler_fn(create_item))?
        .build())
}

#[tokio::main]
async fn main() {
    // ロガーの初期化
    env_logger::init();

    // アプリケーションの構築（ルート登録の失敗は起動時エラー）
    let adaptor = match build_adaptor() {
        Ok(adaptor) => adaptor,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting GateBridge application");

    if let Err(e) = run_lambda(adaptor).await {
        eprintln!("Lambda error: {}", e);
        std::process::exit(1);
    }
}
