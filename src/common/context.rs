//! 型付き添付コンテキストの実装
//!
//! 正規化リクエストの公開形を広げることなく、アダプタとハンドラーの間で
//! プラットフォーム固有の値を受け渡すためのリクエスト単位のサイドチャネル。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use super::http::{ApiRequest, ApiResponse};

/// プロセス全体で一意なキーIDの発番元
static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// 添付マップの1スロットを読み書きするための不透明な型付きトークン
///
/// キーはプロセス起動時に一度だけ発番し、定数として保持して使い回す。
/// 型Tで書き込んだスロットは型Tとしてのみ読み出せる。
pub struct AttachmentKey<T> {
    id: u64,
    _type: PhantomData<fn() -> T>,
}

impl<T> AttachmentKey<T> {
    /// 新しいキーを発番
    pub fn new() -> Self {
        Self {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            _type: PhantomData,
        }
    }
}

impl<T> Default for AttachmentKey<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AttachmentKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttachmentKey<T> {}

impl<T> fmt::Debug for AttachmentKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachmentKey({})", self.id)
    }
}

/// リクエスト単位の添付マップ
#[derive(Debug, Default)]
pub struct AttachmentMap {
    slots: HashMap<u64, Box<dyn Any + Send + Sync>>,
}

impl AttachmentMap {
    /// 新しいAttachmentMapを作成
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// 値を設定
    pub fn put<T: Send + Sync + 'static>(&mut self, key: AttachmentKey<T>, value: T) {
        self.slots.insert(key.id, Box::new(value));
    }

    /// 値を取得
    pub fn get<T: Send + Sync + 'static>(&self, key: AttachmentKey<T>) -> Option<&T> {
        self.slots
            .get(&key.id)
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// 値を削除して返却
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: AttachmentKey<T>) -> Option<T> {
        self.slots
            .remove(&key.id)
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// 指定されたキーのスロットが存在するかチェック
    pub fn contains<T>(&self, key: AttachmentKey<T>) -> bool {
        self.slots.contains_key(&key.id)
    }

    /// マップが空かどうか
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// ハンドラーへ渡される呼び出し単位のコンテキスト
///
/// 正規化リクエスト、ハンドラーが書き込むレスポンス、添付マップを束ねる。
#[derive(Debug)]
pub struct ApiContext {
    /// 正規化されたリクエスト
    pub request: ApiRequest,
    /// ハンドラーが書き込むレスポンス
    pub response: ApiResponse,
    attachments: AttachmentMap,
}

impl ApiContext {
    /// 新しいコンテキストを作成
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            response: ApiResponse::default(),
            attachments: AttachmentMap::new(),
        }
    }

    /// 添付マップの不変参照を取得
    pub fn attachments(&self) -> &AttachmentMap {
        &self.attachments
    }

    /// 添付マップの可変参照を取得
    pub fn attachments_mut(&mut self) -> &mut AttachmentMap {
        &mut self.attachments
    }
}
