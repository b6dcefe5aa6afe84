//! エンティティ種別ごとの `EntitySource` 実装

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use super::cache::EntitySource;
use crate::analyzer::{
    ComponentParser, ControllerParser, DirectiveParser, HtmlReferenceParser, ParseContext,
    RouteParser, SourceUnit,
};
use crate::error::AnalyzerError;
use crate::model::{link_base_classes, Component, Controller, ControllerSet, Directive, HtmlReference, Route};
use crate::util::{is_html_file, is_script_file};

/// コンポーネント・ルートのリンクに使う最新のコントローラー集合
#[derive(Clone, Debug, Default)]
pub struct SharedControllers(Arc<RwLock<Arc<ControllerSet>>>);

impl SharedControllers {
    pub fn get(&self) -> Arc<ControllerSet> {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn set(&self, controllers: ControllerSet) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(controllers);
    }
}

fn parse_script<T>(
    path: &Path,
    text: String,
    ctx: &ParseContext,
    f: impl FnOnce(&SourceUnit, &ParseContext) -> Result<Vec<T>, AnalyzerError>,
) -> Result<Vec<T>, AnalyzerError> {
    let unit = SourceUnit::parse_from_text(text, path)?;
    f(&unit, ctx)
}

// ========== Controllers ==========

#[derive(Debug, Default)]
pub struct ControllerSource;

impl EntitySource for ControllerSource {
    type Entity = Arc<Controller>;
    const KIND: &'static str = "controller";

    fn accepts(path: &Path) -> bool {
        is_script_file(path)
    }

    fn parse(&self, path: &Path, text: String, ctx: &ParseContext) -> Result<Vec<Self::Entity>, AnalyzerError> {
        let controllers = parse_script(path, text, ctx, |unit, ctx| ControllerParser::new().parse(unit, ctx))?;
        Ok(controllers.into_iter().map(Arc::new).collect())
    }

    /// 全体が揃ってから継承元をリンクする
    fn link(&self, entities: Vec<Self::Entity>) -> Vec<Self::Entity> {
        link_base_classes(&entities)
    }
}

// ========== Components ==========

#[derive(Debug, Default)]
pub struct ComponentSource {
    controllers: SharedControllers,
}

impl ComponentSource {
    pub fn new(controllers: SharedControllers) -> Self {
        Self { controllers }
    }
}

impl EntitySource for ComponentSource {
    type Entity = Component;
    const KIND: &'static str = "component";

    fn accepts(path: &Path) -> bool {
        is_script_file(path)
    }

    fn parse(&self, path: &Path, text: String, ctx: &ParseContext) -> Result<Vec<Component>, AnalyzerError> {
        parse_script(path, text, ctx, |unit, ctx| ComponentParser::new().parse(unit, ctx))
    }

    fn link(&self, mut entities: Vec<Component>) -> Vec<Component> {
        let controllers = self.controllers.get();
        for component in &mut entities {
            component.link.resolve(&controllers);
        }
        entities
    }
}

// ========== Directives ==========

#[derive(Debug, Default)]
pub struct DirectiveSource;

impl EntitySource for DirectiveSource {
    type Entity = Directive;
    const KIND: &'static str = "directive";

    fn accepts(path: &Path) -> bool {
        is_script_file(path)
    }

    fn parse(&self, path: &Path, text: String, ctx: &ParseContext) -> Result<Vec<Directive>, AnalyzerError> {
        parse_script(path, text, ctx, |unit, ctx| DirectiveParser::new().parse(unit, ctx))
    }
}

// ========== Routes ==========

#[derive(Debug, Default)]
pub struct RouteSource {
    controllers: SharedControllers,
}

impl RouteSource {
    pub fn new(controllers: SharedControllers) -> Self {
        Self { controllers }
    }
}

impl EntitySource for RouteSource {
    type Entity = Route;
    const KIND: &'static str = "route";

    fn accepts(path: &Path) -> bool {
        is_script_file(path)
    }

    fn parse(&self, path: &Path, text: String, ctx: &ParseContext) -> Result<Vec<Route>, AnalyzerError> {
        parse_script(path, text, ctx, |unit, ctx| RouteParser::new().parse(unit, ctx))
    }

    fn link(&self, mut entities: Vec<Route>) -> Vec<Route> {
        let controllers = self.controllers.get();
        for route in &mut entities {
            route.resolve_controllers(&controllers);
        }
        entities
    }
}

// ========== HTML ==========

#[derive(Debug, Default)]
pub struct HtmlSource;

impl EntitySource for HtmlSource {
    type Entity = HtmlReference;
    const KIND: &'static str = "html";

    fn accepts(path: &Path) -> bool {
        is_html_file(path)
    }

    fn parse(&self, path: &Path, text: String, _ctx: &ParseContext) -> Result<Vec<HtmlReference>, AnalyzerError> {
        HtmlReferenceParser::new().parse(path, &text)
    }
}
