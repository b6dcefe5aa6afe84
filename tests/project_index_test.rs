//! ProjectIndex の全体更新・差分更新を実ファイルで検証する統合テスト

use std::fs;
use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use tempfile::TempDir;

use angularjs_index::config::AjsConfig;
use angularjs_index::index::{ChannelFeed, FileEvent, ProjectIndex};
use angularjs_index::model::{Component, Directive, Route};

/// 一時ディレクトリ上のプロジェクト
struct TempProject {
    dir: TempDir,
}

impl TempProject {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn remove(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::remove_file(&path).unwrap();
        path
    }

    fn index(&self) -> ProjectIndex {
        ProjectIndex::new(self.root(), AjsConfig::default()).unwrap()
    }

    async fn refreshed(&self) -> ProjectIndex {
        let index = self.index();
        index.refresh().await.unwrap();
        index
    }
}

const CARD_COMPONENT: &str = r#"
angular.module('app').component('userCard', {
    bindings: { user: '<', onSelect: '&' },
    templateUrl: 'src/card/card.html',
    controller: 'CardCtrl',
});
"#;

const CARD_CONTROLLER: &str = r#"
export class BaseCtrl {
    loading = false;
}
export class CardController extends BaseCtrl {
    title: string;
    select(id: number): void {}
}
angular.module('app').controller('CardCtrl', CardController);
"#;

const LIST_DIRECTIVE: &str = r#"
class ListDirective { restrict = 'E'; }
angular.module('app').directive('itemList', () => new ListDirective());
"#;

const ROUTES: &str = r#"
$stateProvider
    .state('home', { component: 'userCard' })
    .state('card', { templateUrl: 'src/card/card.html', controller: 'CardCtrl' });
"#;

const CARD_HTML: &str = r#"<div><item-list></item-list><span tooltip="vm.title"></span></div>"#;

#[fixture]
fn project() -> TempProject {
    let project = TempProject {
        dir: tempfile::tempdir().unwrap(),
    };
    project.write("src/card/card.component.ts", CARD_COMPONENT);
    project.write("src/card/card.controller.ts", CARD_CONTROLLER);
    project.write("src/list/list.directive.js", LIST_DIRECTIVE);
    project.write("src/app.routes.js", ROUTES);
    project.write("src/card/card.html", CARD_HTML);
    project.write("node_modules/lib/ignored.js", "angular.module('x').component('ignored', {});");
    project
}

async fn components(index: &ProjectIndex) -> Vec<Component> {
    index.components().snapshot().await.as_ref().clone()
}

async fn directives(index: &ProjectIndex) -> Vec<Directive> {
    index.directives().snapshot().await.as_ref().clone()
}

async fn routes(index: &ProjectIndex) -> Vec<Route> {
    index.routes().snapshot().await.as_ref().clone()
}

async fn controller_names(index: &ProjectIndex) -> Vec<String> {
    index
        .controllers()
        .snapshot()
        .await
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

/// 2つのインデックスの全エンティティが一致するか
async fn assert_same_index(actual: &ProjectIndex, expected: &ProjectIndex) {
    assert_eq!(components(actual).await, components(expected).await);
    assert_eq!(directives(actual).await, directives(expected).await);
    assert_eq!(routes(actual).await, routes(expected).await);
    assert_eq!(
        *actual.controllers().snapshot().await,
        *expected.controllers().snapshot().await
    );
    assert_eq!(*actual.html().snapshot().await, *expected.html().snapshot().await);
}

// ============================================================
// 全体更新
// ============================================================

#[rstest]
#[tokio::test]
async fn test_refresh_indexes_whole_project(project: TempProject) {
    let index = project.refreshed().await;

    let components = components(&index).await;
    assert_eq!(components.len(), 1, "node_modules は対象外");
    let card = &components[0];
    assert_eq!(card.html_name, "user-card");
    assert_eq!(card.bindings.len(), 2);
    assert_eq!(
        card.template.as_ref().unwrap().path,
        project.path("src/card/card.html")
    );
    let controller = card.link.controller.as_ref().expect("controller should be linked");
    assert_eq!(controller.class_name, "CardController");
    assert!(controller.is_instance_of("BaseCtrl"));

    let names: Vec<&str> = index
        .member_filter()
        .visible_members(controller)
        .into_iter()
        .map(|m| m.name())
        .collect();
    assert_eq!(names, vec!["title", "select", "loading"]);

    // 登録されていないクラスもクラス名のまま一覧に載る
    assert_eq!(
        controller_names(&index).await,
        vec!["BaseCtrl", "CardCtrl", "ListDirective"]
    );
    assert!(index.controller_set().find_by_name("CardCtrl").is_some());

    let directive = index.find_directive("item-list").await.unwrap();
    assert_eq!(directive.class_name.as_deref(), Some("ListDirective"));

    let route_names: Vec<String> = routes(&index).await.into_iter().map(|r| r.name).collect();
    assert_eq!(route_names, vec!["home", "card"]);
    let card_route = index.find_route("card").await.unwrap();
    assert!(card_route.link.controller.is_some());

    let usages = index.html_references("item-list").await;
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].path, project.path("src/card/card.html"));
}

#[rstest]
#[tokio::test]
async fn test_refresh_is_idempotent(project: TempProject) {
    let index = project.refreshed().await;
    let first = serde_json::to_string(&*index.components().snapshot().await).unwrap();
    index.refresh().await.unwrap();
    let second = serde_json::to_string(&*index.components().snapshot().await).unwrap();
    assert_eq!(first, second);

    let other = project.refreshed().await;
    assert_same_index(&index, &other).await;
}

#[rstest]
#[tokio::test]
async fn test_broken_file_contributes_nothing(project: TempProject) {
    project.write(
        "src/broken.ts",
        "angular.module('app').component('broken', makeConfig());",
    );
    let index = project.refreshed().await;
    let names: Vec<String> = components(&index).await.into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["userCard"]);
}

// ============================================================
// 差分更新
// ============================================================

#[rstest]
#[tokio::test]
async fn test_incremental_events_converge_to_full_refresh(project: TempProject) {
    let index = project.refreshed().await;

    let added = project.write(
        "src/profile/profile.component.js",
        "angular.module('app').component('profileView', { bindings: { id: '@' } });",
    );
    index.handle_event(&FileEvent::Added(added)).await;

    let changed = project.write("src/list/list.directive.js", &LIST_DIRECTIVE.replace("'E'", "'A'"));
    index.handle_event(&FileEvent::Changed(changed)).await;

    let deleted = project.remove("src/app.routes.js");
    index.handle_event(&FileEvent::Deleted(deleted)).await;

    let expected = project.refreshed().await;
    assert_same_index(&index, &expected).await;
    assert!(routes(&index).await.is_empty());
    assert_eq!(
        index.find_directive("item-list").await.unwrap().restrict.as_str(),
        "A"
    );
}

#[rstest]
#[tokio::test]
async fn test_rename_rewrites_paths_with_single_notification(project: TempProject) {
    let index = project.refreshed().await;
    let mut changes = index.components().subscribe();

    let from = project.path("src/card/card.component.ts");
    let to = project.path("src/widgets/card.component.ts");
    fs::create_dir_all(to.parent().unwrap()).unwrap();
    fs::rename(&from, &to).unwrap();
    index
        .handle_event(&FileEvent::Renamed {
            from: from.clone(),
            to: to.clone(),
        })
        .await;

    let snapshot = changes.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].path, to);
    assert!(changes.try_recv().is_err(), "通知は1回だけ");
}

#[rstest]
#[tokio::test]
async fn test_controller_change_relinks_components(project: TempProject) {
    let index = project.refreshed().await;

    let path = project.write(
        "src/card/card.controller.ts",
        "export class CardController {}\nangular.module('app').controller('OtherCtrl', CardController);",
    );
    index.handle_event(&FileEvent::Changed(path)).await;

    let card = index.find_component("user-card").await.unwrap();
    assert!(card.link.controller.is_none(), "CardCtrl はもう存在しない");
    assert!(index.find_route("card").await.unwrap().link.controller.is_none());
}

#[rstest]
#[tokio::test]
async fn test_imported_configuration_change_reparses_dependent(project: TempProject) {
    project.write(
        "src/details/details.config.ts",
        "export const config = { bindings: { id: '@' } };",
    );
    project.write(
        "src/details/details.component.ts",
        "import { config } from './details.config';\nangular.module('app').component('details', config);",
    );
    let index = project.refreshed().await;
    let details = index.find_component("details").await.unwrap();
    assert_eq!(details.bindings[0].name, "id");

    let path = project.write(
        "src/details/details.config.ts",
        "export const config = { bindings: { key: '<' } };",
    );
    index.handle_event(&FileEvent::Changed(path)).await;

    let details = index.find_component("details").await.unwrap();
    assert_eq!(details.bindings[0].name, "key");
}

#[rstest]
#[tokio::test]
async fn test_unsaved_buffer_overrides_disk(project: TempProject) {
    let index = project.refreshed().await;
    let path = project.path("src/card/card.component.ts");

    index
        .open_document(
            &path,
            "angular.module('app').component('draftCard', { bindings: {} });",
        )
        .await;
    assert!(index.find_component("draft-card").await.is_some());
    assert!(index.find_component("user-card").await.is_none());

    index.close_document(&path).await;
    assert!(index.find_component("user-card").await.is_some());
    assert!(index.find_component("draft-card").await.is_none());
}

#[rstest]
#[tokio::test]
async fn test_channel_feed_drives_updates(project: TempProject) {
    let index = project.refreshed().await;
    let (sender, mut feed) = ChannelFeed::channel();

    let added = project.write(
        "src/badge.directive.ts",
        "angular.module('app').directive('statusBadge', () => ({ restrict: 'A' }));",
    );
    sender.send(FileEvent::Added(added)).unwrap();
    drop(sender);

    index.run(&mut feed).await;
    assert!(index.find_directive("status-badge").await.is_some());
}
