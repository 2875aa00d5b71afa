//! メソッドとパステンプレートで引くルートテーブル
//!
//! テンプレートはリテラルセグメントと `{name}` プレースホルダからなり、
//! セグメント単位の共有プレフィックス木に格納される。探索は登録ルート数に
//! 依存せず、パスのセグメント数に比例する。登録はビルダーで行い、build()
//! 以降のRouterは不変となる（登録と探索は決して交錯しない）。

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;

use crate::common::{ApiContext, ApiResponse, Body, Method};
use crate::error::Error;
use crate::handler::Handler;

/// デフォルトルートが返す固定の404ボディ
const NOT_FOUND_BODY: &str = r#"{"message": "Not Found"}"#;

/// プレースホルダセグメントの形式 `{name}`
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"^\{([^/{}]+)\}$").expect("valid placeholder pattern"))
}

/// テンプレートの1セグメント
enum Segment {
    Literal(String),
    Param(String),
}

/// テンプレート文字列をセグメント列へ解析
fn parse_template(template: &str) -> Result<Vec<Segment>, Error> {
    if !template.starts_with('/') {
        return Err(Error::InvalidRouteTemplate(format!(
            "Template must start with '/': {}",
            template
        )));
    }
    if template == "/" {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    for raw in template[1..].split('/') {
        if raw.is_empty() {
            // 末尾スラッシュと連続スラッシュは登録を拒否する
            return Err(Error::InvalidRouteTemplate(format!(
                "Empty segment in template: {}",
                template
            )));
        }
        if let Some(caps) = placeholder_regex().captures(raw) {
            segments.push(Segment::Param(caps[1].to_string()));
        } else if raw.contains('{') || raw.contains('}') {
            return Err(Error::InvalidRouteTemplate(format!(
                "Malformed placeholder segment '{}' in template: {}",
                raw, template
            )));
        } else {
            segments.push(Segment::Literal(raw.to_string()));
        }
    }
    Ok(segments)
}

/// プレフィックス木のノード
#[derive(Default)]
struct Node {
    /// リテラルセグメントの子
    literals: HashMap<String, Node>,
    /// パラメータセグメントの子（1ノードにつき1つ、名前は最初の登録で固定）
    param: Option<Box<ParamChild>>,
    /// このノードで終端するルート（メソッド別）
    routes: HashMap<Method, Box<dyn Handler>>,
}

struct ParamChild {
    name: String,
    node: Node,
}

/// セグメント列に対する再帰的な探索
///
/// リテラル子を優先し、その枝で（メソッドまで含めて）マッチが成立しない
/// 場合のみパラメータ子へ後戻りする。捕捉したパラメータはparamsへ積まれ、
/// 失敗した枝の分は巻き戻される。
fn match_node<'a>(
    node: &'a Node,
    segments: &[&str],
    method: Method,
    params: &mut Vec<(String, String)>,
) -> Option<&'a Node> {
    let Some((head, rest)) = segments.split_first() else {
        return node.routes.contains_key(&method).then_some(node);
    };

    if let Some(child) = node.literals.get(*head) {
        if let Some(found) = match_node(child, rest, method, params) {
            return Some(found);
        }
    }

    // 空セグメント（末尾スラッシュ等）はプレースホルダに捕捉させない
    if !head.is_empty() {
        if let Some(param) = &node.param {
            params.push((param.name.clone(), (*head).to_string()));
            if let Some(found) = match_node(&param.node, rest, method, params) {
                return Some(found);
            }
            params.pop();
        }
    }

    None
}

/// ルート登録フェーズのビルダー
///
/// 登録は構築時に一度だけ行い、build()で確定する。デフォルトルートは
/// 固定の404 JSONを合成するハンドラーで初期化される。
pub struct RouterBuilder {
    root: Node,
    default_handler: Box<dyn Handler>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            root: Node::default(),
            default_handler: Box::new(NotFoundHandler),
        }
    }
}

impl RouterBuilder {
    /// 新しいRouterBuilderを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ルートを登録
    pub fn route<H>(mut self, method: Method, template: &str, handler: H) -> Result<Self, Error>
    where
        H: Handler + 'static,
    {
        let segments = parse_template(template)?;

        let mut node = &mut self.root;
        for segment in &segments {
            node = match segment {
                Segment::Literal(literal) => node.literals.entry(literal.clone()).or_default(),
                Segment::Param(name) => {
                    let child = node.param.get_or_insert_with(|| {
                        Box::new(ParamChild {
                            name: name.clone(),
                            node: Node::default(),
                        })
                    });
                    if child.name != *name {
                        return Err(Error::InvalidRouteTemplate(format!(
                            "Conflicting parameter name '{{{}}}' (already registered as '{{{}}}') in template: {}",
                            name, child.name, template
                        )));
                    }
                    &mut child.node
                }
            };
        }

        if node.routes.contains_key(&method) {
            return Err(Error::DuplicateRoute(format!("{} {}", method, template)));
        }
        debug!("Registering route: {} {}", method, template);
        node.routes.insert(method, Box::new(handler));
        Ok(self)
    }

    /// デフォルトルートのハンドラーを差し替え
    pub fn default_handler<H>(mut self, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.default_handler = Box::new(handler);
        self
    }

    /// ルートテーブルを確定してRouterを返却
    pub fn build(self) -> Router {
        Router {
            root: self.root,
            default_handler: self.default_handler,
        }
    }
}

/// 構築後は読み取り専用のルートテーブル
pub struct Router {
    root: Node,
    default_handler: Box<dyn Handler>,
}

impl Router {
    /// メソッドとパスにマッチするハンドラーとパスパラメータを検索
    ///
    /// パラメータマップのキーはテンプレートのプレースホルダ名と正確に
    /// 一致する。マッチしない場合はNone。
    pub fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(&dyn Handler, HashMap<String, String>)> {
        let segments: Vec<&str> = if path == "/" {
            Vec::new()
        } else {
            path.strip_prefix('/')?.split('/').collect()
        };

        let mut params = Vec::new();
        let node = match_node(&self.root, &segments, method, &mut params)?;
        let handler = node.routes.get(&method)?;
        Some((handler.as_ref(), params.into_iter().collect()))
    }

    /// lookupにデフォルトルートへのフォールバックを加えたもの
    pub fn resolve(&self, method: Method, path: &str) -> (&dyn Handler, HashMap<String, String>) {
        match self.lookup(method, path) {
            Some(found) => found,
            None => {
                debug!("No route matched: {} {}", method, path);
                (self.default_handler.as_ref(), HashMap::new())
            }
        }
    }

    /// デフォルトルートのハンドラーを取得
    pub fn default_handler(&self) -> &dyn Handler {
        self.default_handler.as_ref()
    }
}

/// 組み込みのデフォルトルート（固定の404 JSONを合成する）
struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, mut ctx: ApiContext) -> Result<ApiContext, Error> {
        ctx.response = ApiResponse::not_found()
            .with_header("Content-Type", "application/json")
            .with_body(Body::Text(NOT_FOUND_BODY.to_string()));
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ApiRequest;

    // マッチしたルートを識別できるよう、マーカー文字列を書き込むハンドラー
    struct Marker(&'static str);

    #[async_trait]
    impl Handler for Marker {
        async fn handle(&self, mut ctx: ApiContext) -> Result<ApiContext, Error> {
            ctx.response = ApiResponse::ok().text(self.0);
            Ok(ctx)
        }
    }

    fn marker(text: &'static str) -> Marker {
        Marker(text)
    }

    async fn invoke(handler: &dyn Handler) -> String {
        let ctx = ApiContext::new(ApiRequest::new(Method::GET, "/".to_string()));
        let ctx = handler.handle(ctx).await.unwrap();
        match ctx.response.body {
            Body::Text(text) => text,
            other => panic!("Unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_literal_route_matching() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/items", marker("list"))
            .unwrap()
            .route(Method::POST, "/items", marker("create"))
            .unwrap()
            .build();

        let (handler, params) = router.lookup(Method::GET, "/items").unwrap();
        assert!(params.is_empty());
        assert_eq!(invoke(handler).await, "list");

        let (handler, _) = router.lookup(Method::POST, "/items").unwrap();
        assert_eq!(invoke(handler).await, "create");
    }

    #[tokio::test]
    async fn test_param_extraction() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/users/{id}", marker("user"))
            .unwrap()
            .route(Method::GET, "/users/{id}/posts/{post_id}", marker("post"))
            .unwrap()
            .build();

        let (handler, params) = router.lookup(Method::GET, "/users/42").unwrap();
        assert_eq!(invoke(handler).await, "user");
        // パラメータ名はテンプレートのプレースホルダ名と正確に一致する
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some(&"42".to_string()));

        let (handler, params) = router.lookup(Method::GET, "/users/42/posts/7").unwrap();
        assert_eq!(invoke(handler).await, "post");
        assert_eq!(params.get("id"), Some(&"42".to_string()));
        assert_eq!(params.get("post_id"), Some(&"7".to_string()));
    }

    #[tokio::test]
    async fn test_literal_preferred_over_param() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/users/{id}", marker("param"))
            .unwrap()
            .route(Method::GET, "/users/me", marker("literal"))
            .unwrap()
            .build();

        let (handler, params) = router.lookup(Method::GET, "/users/me").unwrap();
        assert_eq!(invoke(handler).await, "literal");
        assert!(params.is_empty());

        let (handler, params) = router.lookup(Method::GET, "/users/42").unwrap();
        assert_eq!(invoke(handler).await, "param");
        assert_eq!(params.get("id"), Some(&"42".to_string()));
    }

    #[tokio::test]
    async fn test_backtracks_to_param_on_method_mismatch() {
        // リテラル枝にPOSTしかない場合、GETはパラメータ枝で成立する
        let router = RouterBuilder::new()
            .route(Method::POST, "/users/list", marker("literal-post"))
            .unwrap()
            .route(Method::GET, "/users/{id}", marker("param-get"))
            .unwrap()
            .build();

        let (handler, params) = router.lookup(Method::GET, "/users/list").unwrap();
        assert_eq!(invoke(handler).await, "param-get");
        assert_eq!(params.get("id"), Some(&"list".to_string()));
    }

    #[tokio::test]
    async fn test_root_route() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/", marker("root"))
            .unwrap()
            .build();

        let (handler, params) = router.lookup(Method::GET, "/").unwrap();
        assert_eq!(invoke(handler).await, "root");
        assert!(params.is_empty());
    }

    #[test]
    fn test_no_match_returns_none() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/items", marker("list"))
            .unwrap()
            .build();

        assert!(router.lookup(Method::GET, "/missing").is_none());
        // メソッド違いもマッチしない
        assert!(router.lookup(Method::DELETE, "/items").is_none());
        // セグメント数の過不足もマッチしない
        assert!(router.lookup(Method::GET, "/items/1").is_none());
        // 末尾スラッシュは別パスとして扱う
        assert!(router.lookup(Method::GET, "/items/").is_none());
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_default_404() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/items", marker("list"))
            .unwrap()
            .build();

        let (handler, params) = router.resolve(Method::GET, "/missing");
        assert!(params.is_empty());

        let ctx = ApiContext::new(ApiRequest::new(Method::GET, "/missing".to_string()));
        let ctx = handler.handle(ctx).await.unwrap();
        assert_eq!(ctx.response.status, Some(404));
        assert_eq!(
            ctx.response.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(
            ctx.response.body,
            Body::Text(r#"{"message": "Not Found"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_custom_default_handler() {
        let router = RouterBuilder::new()
            .default_handler(marker("fallback"))
            .build();

        let (handler, _) = router.resolve(Method::GET, "/anything");
        assert_eq!(invoke(handler).await, "fallback");
        assert_eq!(invoke(router.default_handler()).await, "fallback");
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let result = RouterBuilder::new()
            .route(Method::GET, "/items", marker("first"))
            .unwrap()
            .route(Method::GET, "/items", marker("second"));

        assert!(matches!(result, Err(Error::DuplicateRoute(_))));
    }

    #[test]
    fn test_conflicting_param_name_rejected() {
        let result = RouterBuilder::new()
            .route(Method::GET, "/users/{id}", marker("first"))
            .unwrap()
            .route(Method::POST, "/users/{name}", marker("second"));

        assert!(matches!(result, Err(Error::InvalidRouteTemplate(_))));
    }

    #[test]
    fn test_invalid_templates_rejected() {
        let no_slash = RouterBuilder::new().route(Method::GET, "items", marker("x"));
        assert!(matches!(no_slash, Err(Error::InvalidRouteTemplate(_))));

        let trailing = RouterBuilder::new().route(Method::GET, "/items/", marker("x"));
        assert!(matches!(trailing, Err(Error::InvalidRouteTemplate(_))));

        let malformed = RouterBuilder::new().route(Method::GET, "/items/{id", marker("x"));
        assert!(matches!(malformed, Err(Error::InvalidRouteTemplate(_))));
    }

    #[tokio::test]
    async fn test_case_sensitive_matching() {
        let router = RouterBuilder::new()
            .route(Method::GET, "/Items", marker("upper"))
            .unwrap()
            .build();

        assert!(router.lookup(Method::GET, "/items").is_none());
        let (handler, _) = router.lookup(Method::GET, "/Items").unwrap();
        assert_eq!(invoke(handler).await, "upper");
    }
}
