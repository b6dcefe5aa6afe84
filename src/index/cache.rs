//! ファイル単位で差分更新されるエンティティキャッシュ
//!
//! 状態は `Uninitialized → Populated`。最初の `refresh()` で一覧が揃い、
//! 以降はファイルイベントで該当ファイルの寄与だけを差し替える

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analyzer::{Documents, ParseContext};
use crate::config::PathMatcher;
use crate::error::{AnalyzerError, IndexError};
use crate::util::path_key;
use crate::workspace::collect_files;

/// 変更通知チャネルの容量
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// 1種類のエンティティの抽出方法
pub trait EntitySource: Send + Sync + 'static {
    type Entity: Clone + Send + Sync + 'static;

    /// ログ用の種別名
    const KIND: &'static str;

    /// 拡張子などで解析対象か判定する（globとは別）
    fn accepts(path: &Path) -> bool;

    /// 1ファイル分のエンティティを抽出する
    fn parse(&self, path: &Path, text: String, ctx: &ParseContext) -> Result<Vec<Self::Entity>, AnalyzerError>;

    /// 全ファイル分を結合した一覧に対する後処理（継承・コントローラーのリンク）
    fn link(&self, entities: Vec<Self::Entity>) -> Vec<Self::Entity> {
        entities
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Uninitialized,
    Populated,
}

/// 1ファイルからの寄与
struct FileEntry<T> {
    path: PathBuf,
    entities: Vec<T>,
    /// 変更されたらこのファイルを再解析すべきパスキー
    watched: BTreeSet<String>,
}

struct CacheState<T> {
    status: CacheStatus,
    /// パスキー → 寄与（キー順に並べて一覧を作る）
    entries: BTreeMap<String, FileEntry<T>>,
    snapshot: Arc<Vec<T>>,
}

pub struct EntityCache<S: EntitySource> {
    source: Arc<S>,
    root: PathBuf,
    matcher: PathMatcher,
    documents: Documents,
    state: RwLock<CacheState<S::Entity>>,
    generation: AtomicU64,
    changes: broadcast::Sender<Arc<Vec<S::Entity>>>,
}

impl<S: EntitySource> EntityCache<S> {
    pub fn new(source: S, root: impl Into<PathBuf>, matcher: PathMatcher, documents: Documents) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            source: Arc::new(source),
            root: root.into(),
            matcher,
            documents,
            state: RwLock::new(CacheState {
                status: CacheStatus::Uninitialized,
                entries: BTreeMap::new(),
                snapshot: Arc::new(Vec::new()),
            }),
            generation: AtomicU64::new(0),
            changes,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 変更通知を購読する（更新後の一覧全体が届く）
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<S::Entity>>> {
        self.changes.subscribe()
    }

    pub async fn snapshot(&self) -> Arc<Vec<S::Entity>> {
        Arc::clone(&self.state.read().await.snapshot)
    }

    pub async fn status(&self) -> CacheStatus {
        self.state.read().await.status
    }

    /// 開始済みの `refresh()` の世代
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// このキャッシュの対象ファイルか（拡張子とglob）
    pub fn is_tracked(&self, path: &Path) -> bool {
        S::accepts(path) && self.matcher.matches(&self.root, path)
    }

    // ========== 全体更新 ==========

    /// globに一致する全ファイルを解析し直し、一覧を丸ごと置き換える
    ///
    /// ファイル走査に失敗した場合は以前の内容を残してエラーを返す。
    /// 完了前に新しい `refresh()` が始まっていた場合は結果を捨てる
    pub async fn refresh(&self) -> Result<Arc<Vec<S::Entity>>, IndexError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let root = self.root.clone();
        let matcher = self.matcher.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&root, &matcher, S::accepts)).await??;
        let parsed = self.parse_all(files).await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(kind = S::KIND, generation, "discarding stale refresh");
            return Ok(Arc::clone(&state.snapshot));
        }

        state.entries = parsed
            .into_iter()
            .map(|entry| (path_key(&entry.path), entry))
            .collect();
        state.status = CacheStatus::Populated;
        let snapshot = self.rebuild(&mut state);
        drop(state);

        info!(kind = S::KIND, count = snapshot.len(), "index refreshed");
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// 最新のリンク先で一覧を作り直す（コントローラー更新後など）
    pub async fn relink(&self) -> Arc<Vec<S::Entity>> {
        let mut state = self.state.write().await;
        if state.status == CacheStatus::Uninitialized {
            return Arc::clone(&state.snapshot);
        }
        let snapshot = self.rebuild(&mut state);
        drop(state);
        self.notify(&snapshot);
        snapshot
    }

    // ========== ファイルイベント ==========

    pub async fn on_added(&self, path: &Path) -> bool {
        self.update(&[], &[path]).await
    }

    pub async fn on_changed(&self, path: &Path) -> bool {
        self.update(&[], &[path]).await
    }

    pub async fn on_deleted(&self, path: &Path) -> bool {
        self.update(&[path], &[]).await
    }

    /// 旧パスの寄与を外し、新パスで解析し直す（1回の更新・1回の通知）
    ///
    /// 新パスがglob外になった場合は削除と同じ
    pub async fn on_renamed(&self, from: &Path, to: &Path) -> bool {
        self.update(&[from], &[to]).await
    }

    /// `removed` の寄与を外し、`touched` と、それらを読み込んでいたファイルを再解析する
    ///
    /// 何か変わった場合のみ true を返して通知する
    async fn update(&self, removed: &[&Path], touched: &[&Path]) -> bool {
        let (targets, removed_keys) = {
            let state = self.state.read().await;
            if state.status == CacheStatus::Uninitialized {
                debug!(kind = S::KIND, "ignoring file event before first refresh");
                return false;
            }

            let removed_keys: BTreeSet<String> = removed
                .iter()
                .map(|p| path_key(p))
                .filter(|key| state.entries.contains_key(key))
                .collect();
            let event_keys: BTreeSet<String> = removed
                .iter()
                .chain(touched)
                .map(|p| path_key(p))
                .collect();

            let mut targets: BTreeMap<String, PathBuf> = touched
                .iter()
                .filter(|p| self.is_tracked(p))
                .map(|p| (path_key(p), p.to_path_buf()))
                .collect();
            for (key, entry) in &state.entries {
                if removed_keys.contains(key) || targets.contains_key(key) {
                    continue;
                }
                if !entry.watched.is_disjoint(&event_keys) {
                    debug!(kind = S::KIND, path = %entry.path.display(), "re-parsing dependent file");
                    targets.insert(key.clone(), entry.path.clone());
                }
            }
            // glob外になったファイルは寄与を外す
            let mut removed_keys = removed_keys;
            for path in touched {
                let key = path_key(path);
                if !targets.contains_key(&key) && state.entries.contains_key(&key) {
                    removed_keys.insert(key);
                }
            }
            (targets, removed_keys)
        };

        if targets.is_empty() && removed_keys.is_empty() {
            return false;
        }

        let parsed = self.parse_all(targets.into_values().collect()).await;

        let mut state = self.state.write().await;
        for key in &removed_keys {
            state.entries.remove(key);
        }
        for entry in parsed {
            state.entries.insert(path_key(&entry.path), entry);
        }
        let snapshot = self.rebuild(&mut state);
        drop(state);

        self.notify(&snapshot);
        true
    }

    // ========== 内部処理 ==========

    /// 複数ファイルを並行に解析する（失敗したファイルは寄与なし）
    async fn parse_all(&self, paths: Vec<PathBuf>) -> Vec<FileEntry<S::Entity>> {
        let mut tasks = JoinSet::new();
        for path in paths {
            tasks.spawn(parse_entry(
                Arc::clone(&self.source),
                self.root.clone(),
                self.documents.clone(),
                path,
            ));
        }

        let mut entries = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(kind = S::KIND, "parse task failed: {}", e),
            }
        }
        entries
    }

    fn rebuild(&self, state: &mut CacheState<S::Entity>) -> Arc<Vec<S::Entity>> {
        let entities: Vec<S::Entity> = state
            .entries
            .values()
            .flat_map(|entry| entry.entities.iter().cloned())
            .collect();
        state.snapshot = Arc::new(self.source.link(entities));
        Arc::clone(&state.snapshot)
    }

    fn notify(&self, snapshot: &Arc<Vec<S::Entity>>) {
        if self.changes.send(Arc::clone(snapshot)).is_err() {
            debug!(kind = S::KIND, "no subscribers for change notification");
        }
    }
}

/// 1ファイルを読み込んで解析する
///
/// 読み込み・解析のエラーはここで捕捉し、空の寄与として扱う
async fn parse_entry<S: EntitySource>(
    source: Arc<S>,
    root: PathBuf,
    documents: Documents,
    path: PathBuf,
) -> FileEntry<S::Entity> {
    let text = match documents.read(&path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(kind = S::KIND, path = %path.display(), "{}", e);
            return FileEntry {
                path,
                entities: Vec::new(),
                watched: BTreeSet::new(),
            };
        }
    };

    let task_path = path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let ctx = ParseContext::new(root, documents, &task_path);
        let entities = source.parse(&task_path, text, &ctx);
        (entities, ctx.watched_keys())
    })
    .await;

    match result {
        Ok((Ok(entities), watched)) => FileEntry {
            path,
            entities,
            watched,
        },
        Ok((Err(e), watched)) => {
            warn!(kind = S::KIND, path = %path.display(), "{}", e);
            FileEntry {
                path,
                entities: Vec::new(),
                watched,
            }
        }
        Err(e) => {
            warn!(kind = S::KIND, path = %path.display(), "parse task failed: {}", e);
            FileEntry {
                path,
                entities: Vec::new(),
                watched: BTreeSet::new(),
            }
        }
    }
}
