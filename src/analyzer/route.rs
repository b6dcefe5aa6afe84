use std::path::PathBuf;

use tracing::debug;
use tree_sitter::Node;

use super::config_accessor::ConfigAccessor;
use super::query::{unwrap_expression, TreeQuery};
use super::source::{ParseContext, SourceUnit};
use super::syntax::{walk, CallExpression, SyntaxNode, Visitor};
use super::template::{component_tag_template, resolve_controller_link, resolve_template};
use crate::error::AnalyzerError;
use crate::model::{Route, Span, Template};

/// 名前付きビューを辿る最大の入れ子段数
const MAX_VIEW_DEPTH: usize = 8;

/// ui-router のステート定義の抽出
///
/// 認識パターン:
/// ```javascript
/// $stateProvider
///     .state('home', { templateUrl: 'home.html', controller: 'HomeCtrl' })
///     .state('detail', { views: { main: 'detailComponent', side: { template: '<p></p>' } } })
///     .state({ name: 'about', component: 'aboutPage' });
/// ```
#[derive(Debug, Default)]
pub struct RouteParser;

impl RouteParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, unit: &SourceUnit, ctx: &ParseContext) -> Result<Vec<Route>, AnalyzerError> {
        let query = TreeQuery::new(unit, ctx);
        let mut visitor = RouteVisitor {
            query: &query,
            routes: Vec::new(),
        };
        walk(unit, &mut visitor)?;
        Ok(visitor.routes)
    }
}

struct RouteVisitor<'a, 'q> {
    query: &'q TreeQuery<'a>,
    routes: Vec<Route>,
}

impl<'a> Visitor<'a> for RouteVisitor<'a, '_> {
    fn visit_call(&mut self, call: &CallExpression<'a>) -> Result<(), AnalyzerError> {
        if !call.is_method("state") || is_chained_into_state(self.query, call.node) {
            return Ok(());
        }

        // 最も外側の呼び出しから連鎖を辿り、記述順に並べ直す
        let mut chain = vec![*call];
        let mut current = *call;
        while let Some(object) = current.object.map(unwrap_expression) {
            match SyntaxNode::classify(object, self.query.unit()) {
                SyntaxNode::Call(inner) if inner.is_method("state") => {
                    chain.push(inner);
                    current = inner;
                }
                _ => break,
            }
        }

        for state in chain.iter().rev() {
            if let Some(route) = route_from_call(self.query, state) {
                self.routes.push(route);
            }
        }
        Ok(())
    }
}

/// `X.state(...).state(...)` の内側の呼び出しか（外側でまとめて処理する）
fn is_chained_into_state(query: &TreeQuery, call: Node) -> bool {
    let Some(member) = call.parent() else {
        return false;
    };
    if member.kind() != "member_expression"
        || member.child_by_field_name("object") != Some(call)
    {
        return false;
    }
    let Some(outer) = member.parent() else {
        return false;
    };
    outer.kind() == "call_expression"
        && outer.child_by_field_name("function") == Some(member)
        && member
            .child_by_field_name("property")
            .is_some_and(|p| query.text(p) == "state")
}

fn route_from_call<'a>(query: &TreeQuery<'a>, call: &CallExpression<'a>) -> Option<Route> {
    let args = call.arguments();
    let path = query.unit().path().to_path_buf();
    match args.as_slice() {
        [name_node, config_node] => {
            let Some(name) = query.get_string_value(*name_node) else {
                debug!(path = %path.display(), "state name is not static");
                return None;
            };
            let span = Span::of(*name_node);
            let route = query.follow(*config_node, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
                let config = ConfigAccessor::from_node(q, n)?;
                Some(build_route(q, &config, &name, path.clone(), span, 0))
            });
            if route.is_none() {
                debug!(state = %name, "state configuration is not resolvable");
            }
            route
        }
        // .state({ name: 'x', ... })
        [config_node] => query.follow(*config_node, &mut |q: &TreeQuery<'_>, n: Node<'_>| {
            let config = ConfigAccessor::from_node(q, n)?;
            let name_node = config.get("name")?;
            let name = q.get_string_value(name_node)?;
            Some(build_route(
                q,
                &config,
                &name,
                q.unit().path().to_path_buf(),
                Span::of(name_node),
                0,
            ))
        }),
        _ => None,
    }
}

fn build_route(
    query: &TreeQuery,
    config: &ConfigAccessor,
    name: &str,
    path: PathBuf,
    span: Span,
    depth: usize,
) -> Route {
    let mut route = Route::new(name, path, span);
    route.template = resolve_template(query, config).or_else(|| component_template(query, config));
    route.link = resolve_controller_link(query, config);

    let views = config
        .get("views")
        .and_then(|views| query.get_object_literal_value(views));
    if let Some(views) = views.filter(|_| depth < MAX_VIEW_DEPTH) {
        let views = ConfigAccessor::from_object(query, views);
        route.views = views
            .entries()
            .filter_map(|(view_name, value)| view_route(query, view_name, value, depth + 1))
            .collect();
    }

    if route.template.is_none() && route.views.is_empty() {
        debug!(state = %route.name, "state has neither template nor views");
    }
    route
}

/// 名前付きビュー
///
/// 文字列はコンポーネント名として自己終了タグのテンプレートにし、
/// オブジェクトはステートと同じ規則で解決する
fn view_route(query: &TreeQuery, view_name: &str, value: Node, depth: usize) -> Option<Route> {
    let path = query.unit().path().to_path_buf();
    if let Some(component_name) = query.get_string_value(value) {
        let mut view = Route::new(view_name, path, Span::of(value));
        view.template = Some(component_tag_template(query, &component_name, value));
        return Some(view);
    }
    let object = query.get_object_literal_value(value)?;
    let config = ConfigAccessor::from_object(query, object);
    Some(build_route(query, &config, view_name, path, Span::of(value), depth))
}

/// `component: 'name'` を自己終了タグのテンプレートにする
fn component_template(query: &TreeQuery, config: &ConfigAccessor) -> Option<Template> {
    let value = config.get("component")?;
    let component_name = query.get_string_value(value)?;
    Some(component_tag_template(query, &component_name, value))
}
