use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::cache::{EntityCache, EntitySource};
use super::feed::{FileChangeFeed, FileEvent};
use super::sources::{
    ComponentSource, ControllerSource, DirectiveSource, HtmlSource, RouteSource, SharedControllers,
};
use crate::analyzer::Documents;
use crate::config::{AjsConfig, DefinitionParts, MemberFilter};
use crate::error::IndexError;
use crate::model::{Component, Controller, ControllerSet, Directive, HtmlReference, Route};

/// プロジェクト全体のインデックス
///
/// 種別ごとのキャッシュを所有し、ファイルイベントを振り分ける。
/// コンポーネント・ルートのコントローラー参照は、コントローラーの更新に合わせて張り直す
pub struct ProjectIndex {
    root: PathBuf,
    config: AjsConfig,
    documents: Documents,
    shared_controllers: SharedControllers,
    member_filter: MemberFilter,
    controllers: EntityCache<ControllerSource>,
    components: EntityCache<ComponentSource>,
    directives: EntityCache<DirectiveSource>,
    routes: EntityCache<RouteSource>,
    html: EntityCache<HtmlSource>,
}

impl ProjectIndex {
    /// ルート直下の ajsconfig.json を読み込んで作成する
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let root = root.into();
        let config = AjsConfig::load_from_dir(&root);
        Self::new(root, config)
    }

    pub fn new(root: impl Into<PathBuf>, config: AjsConfig) -> Result<Self, IndexError> {
        let root = root.into();
        let documents = Documents::new();
        let shared_controllers = SharedControllers::default();

        Ok(Self {
            controllers: EntityCache::new(
                ControllerSource,
                root.clone(),
                config.controller_matcher()?,
                documents.clone(),
            ),
            components: EntityCache::new(
                ComponentSource::new(shared_controllers.clone()),
                root.clone(),
                config.component_matcher()?,
                documents.clone(),
            ),
            directives: EntityCache::new(
                DirectiveSource,
                root.clone(),
                config.directive_matcher()?,
                documents.clone(),
            ),
            routes: EntityCache::new(
                RouteSource::new(shared_controllers.clone()),
                root.clone(),
                config.route_matcher()?,
                documents.clone(),
            ),
            html: EntityCache::new(HtmlSource, root.clone(), config.html_matcher()?, documents.clone()),
            member_filter: MemberFilter::from_config(&config),
            root,
            config,
            documents,
            shared_controllers,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AjsConfig {
        &self.config
    }

    pub fn member_filter(&self) -> &MemberFilter {
        &self.member_filter
    }

    pub fn definition_parts(&self) -> DefinitionParts {
        self.config.definitions
    }

    // ========== 更新 ==========

    /// 全キャッシュを作り直す
    ///
    /// コンポーネント・ルートがリンクできるよう、コントローラーを先に更新する
    pub async fn refresh(&self) -> Result<(), IndexError> {
        let controllers = self.controllers.refresh().await?;
        self.publish_controllers(&controllers);

        let (components, directives, routes, html) = tokio::join!(
            self.components.refresh(),
            self.directives.refresh(),
            self.routes.refresh(),
            self.html.refresh(),
        );
        let (components, directives, routes, html) = (components?, directives?, routes?, html?);

        info!(
            controllers = controllers.len(),
            components = components.len(),
            directives = directives.len(),
            routes = routes.len(),
            html_references = html.len(),
            "project index refreshed"
        );
        Ok(())
    }

    /// ファイルイベントを全キャッシュに適用する
    pub async fn handle_event(&self, event: &FileEvent) {
        debug!(?event, "file event");
        let controllers_changed = apply(&self.controllers, event).await;
        if controllers_changed {
            let controllers = self.controllers.snapshot().await;
            self.publish_controllers(&controllers);
        }

        if !apply(&self.components, event).await && controllers_changed {
            self.components.relink().await;
        }
        if !apply(&self.routes, event).await && controllers_changed {
            self.routes.relink().await;
        }
        apply(&self.directives, event).await;
        apply(&self.html, event).await;
    }

    /// フィードが閉じるまでイベントを処理し続ける
    pub async fn run(&self, feed: &mut impl FileChangeFeed) {
        while let Some(event) = feed.next().await {
            self.handle_event(&event).await;
        }
        debug!("file change feed closed");
    }

    /// 未保存バッファを載せ、そのファイルを変更扱いにする
    pub async fn open_document(&self, path: &Path, text: impl Into<String>) {
        self.documents.open(path, text);
        self.handle_event(&FileEvent::Changed(path.to_path_buf())).await;
    }

    /// 未保存バッファを外し、ディスクの内容に戻す
    pub async fn close_document(&self, path: &Path) {
        if self.documents.close(path) {
            self.handle_event(&FileEvent::Changed(path.to_path_buf())).await;
        }
    }

    fn publish_controllers(&self, controllers: &Arc<Vec<Arc<Controller>>>) {
        self.shared_controllers
            .set(ControllerSet::new(controllers.as_ref().clone()));
    }

    // ========== 参照 ==========

    pub fn controllers(&self) -> &EntityCache<ControllerSource> {
        &self.controllers
    }

    pub fn components(&self) -> &EntityCache<ComponentSource> {
        &self.components
    }

    pub fn directives(&self) -> &EntityCache<DirectiveSource> {
        &self.directives
    }

    pub fn routes(&self) -> &EntityCache<RouteSource> {
        &self.routes
    }

    pub fn html(&self) -> &EntityCache<HtmlSource> {
        &self.html
    }

    /// 最新のコントローラー集合（名前・クラス名での検索用）
    pub fn controller_set(&self) -> Arc<ControllerSet> {
        self.shared_controllers.get()
    }

    /// html名（`user-card`）からコンポーネントを探す
    pub async fn find_component(&self, html_name: &str) -> Option<Component> {
        self.components
            .snapshot()
            .await
            .iter()
            .find(|c| c.html_name == html_name)
            .cloned()
    }

    /// html名からディレクティブを探す
    pub async fn find_directive(&self, html_name: &str) -> Option<Directive> {
        self.directives
            .snapshot()
            .await
            .iter()
            .find(|d| d.html_name == html_name)
            .cloned()
    }

    /// ステート名からルートを探す（ネストしたビューは含めない）
    pub async fn find_route(&self, name: &str) -> Option<Route> {
        self.routes
            .snapshot()
            .await
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    /// html名でHTML内の参照箇所を引く
    pub async fn html_references(&self, html_name: &str) -> Vec<HtmlReference> {
        self.html
            .snapshot()
            .await
            .iter()
            .filter(|r| r.name == html_name)
            .cloned()
            .collect()
    }
}

async fn apply<S: EntitySource>(cache: &EntityCache<S>, event: &FileEvent) -> bool {
    match event {
        FileEvent::Added(path) => cache.on_added(path).await,
        FileEvent::Changed(path) => cache.on_changed(path).await,
        FileEvent::Deleted(path) => cache.on_deleted(path).await,
        FileEvent::Renamed { from, to } => cache.on_renamed(from, to).await,
    }
}
