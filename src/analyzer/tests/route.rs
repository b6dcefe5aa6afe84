use std::path::PathBuf;

use super::{main_path, routes, Project, MAIN};
use crate::model::Span;

#[test]
fn test_named_views() {
    let result = routes(
        "$stateProvider.state('r', { views: { 'a': 'CompA', 'b': { template: 'hi' } } });",
    );

    assert_eq!(result.len(), 1);
    let route = &result[0];
    assert_eq!(route.name, "r");
    assert_eq!(route.path, main_path());
    assert_eq!(route.span, Span::new(0, 21, 0, 24));
    assert!(route.template.is_none());
    assert_eq!(route.views.len(), 2);

    let a = &route.views[0];
    assert_eq!(a.name, "a");
    let template = a.template.as_ref().unwrap();
    assert_eq!(template.body.as_deref(), Some("<comp-a />"));
    assert!(template.is_inline());

    let b = &route.views[1];
    assert_eq!(b.name, "b");
    assert_eq!(b.template.as_ref().unwrap().body.as_deref(), Some("hi"));

    let names: Vec<&str> = route.walk().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["r", "a", "b"]);
}

#[test]
fn test_chained_states_keep_source_order() {
    let result = routes(
        r#"
$stateProvider
    .state('home', { templateUrl: 'views/home.html', controller: 'HomeCtrl' })
    .state('detail', { template: '<p></p>', controller: DetailController, controllerAs: 'vm' })
    .state('about', { component: 'aboutPage' });
"#,
    );

    let names: Vec<&str> = result.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["home", "detail", "about"]);

    let home = &result[0];
    assert_eq!(
        home.template.as_ref().unwrap().path,
        PathBuf::from("/app/views/home.html")
    );
    assert_eq!(home.link.controller_name.as_deref(), Some("HomeCtrl"));
    assert_eq!(home.link.controller_as, "$ctrl");

    let detail = &result[1];
    assert_eq!(detail.link.controller_class_name.as_deref(), Some("DetailController"));
    assert_eq!(detail.link.controller_as, "vm");

    let about = &result[2];
    assert_eq!(
        about.template.as_ref().unwrap().body.as_deref(),
        Some("<about-page />")
    );
}

#[test]
fn test_state_with_name_property() {
    let result = routes(
        "const aboutState = { name: 'about', template: '<h1>About</h1>' };\n$stateProvider.state(aboutState);",
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "about");
    assert_eq!(result[0].span.start_line, 0);
    assert_eq!(
        result[0].template.as_ref().unwrap().body.as_deref(),
        Some("<h1>About</h1>")
    );
}

#[test]
fn test_imported_state_configuration() {
    let project = Project::new()
        .file(
            "src/states/list.state.ts",
            "export const listState = {\n  templateUrl: 'list.html',\n  controller: 'ListCtrl'\n};",
        )
        .file(
            MAIN,
            "import { listState } from './states/list.state';\n$stateProvider.state('list', listState);",
        );
    let (result, dependencies) = project
        .parse(MAIN, |u, c| crate::analyzer::RouteParser::new().parse(u, c))
        .unwrap();

    assert_eq!(result[0].name, "list");
    assert_eq!(result[0].path, main_path(), "ルートは登録箇所に置く");
    assert_eq!(result[0].link.controller_name.as_deref(), Some("ListCtrl"));
    assert_eq!(dependencies, vec![PathBuf::from("/app/src/states/list.state.ts")]);
}

#[test]
fn test_dynamic_state_is_skipped() {
    let result = routes("$stateProvider.state(stateName(), buildConfig());");
    assert!(result.is_empty());
}

#[test]
fn test_self_referencing_views_stop_nesting() {
    let result = routes(
        "var looped = { template: 'x', views: { inner: looped } };\n$stateProvider.state('loop', looped);",
    );
    assert_eq!(result.len(), 1);
    let nested = result[0].walk();
    assert_eq!(nested.len(), 9, "入れ子は一定段数で打ち切る");
    assert!(nested.iter().all(|r| r.template.as_ref().and_then(|t| t.body.as_deref()) == Some("x")));
}
