use std::path::{Path, PathBuf};

use super::source::{Documents, ParseContext, SourceUnit};
use super::{ComponentParser, ControllerParser, DirectiveParser, RouteParser};
use crate::error::AnalyzerError;
use crate::model::{Component, Controller, Directive, Route};

mod component;
mod route;

const ROOT: &str = "/app";
const MAIN: &str = "src/main.ts";

/// 仮想プロジェクト（ファイルは未保存バッファとして載せる）
struct Project {
    root: PathBuf,
    documents: Documents,
}

impl Project {
    fn new() -> Self {
        Self {
            root: PathBuf::from(ROOT),
            documents: Documents::new(),
        }
    }

    fn file(self, relative: &str, text: &str) -> Self {
        self.documents.open(&self.path(relative), text);
        self
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn parse<T>(
        &self,
        relative: &str,
        f: impl FnOnce(&SourceUnit, &ParseContext) -> Result<T, AnalyzerError>,
    ) -> Result<(T, Vec<PathBuf>), AnalyzerError> {
        let path = self.path(relative);
        let unit = self.documents.load_blocking(&path)?;
        let ctx = ParseContext::new(&self.root, self.documents.clone(), &path);
        let result = f(&unit, &ctx)?;
        Ok((result, ctx.dependencies()))
    }

    fn components(&self, relative: &str) -> Vec<Component> {
        self.parse(relative, |u, c| ComponentParser::new().parse(u, c))
            .unwrap()
            .0
    }

    fn controllers(&self, relative: &str) -> Vec<Controller> {
        self.parse(relative, |u, c| ControllerParser::new().parse(u, c))
            .unwrap()
            .0
    }

    fn directives(&self, relative: &str) -> Vec<Directive> {
        self.parse(relative, |u, c| DirectiveParser::new().parse(u, c))
            .unwrap()
            .0
    }

    fn routes(&self, relative: &str) -> Vec<Route> {
        self.parse(relative, |u, c| RouteParser::new().parse(u, c))
            .unwrap()
            .0
    }
}

fn components(source: &str) -> Vec<Component> {
    Project::new().file(MAIN, source).components(MAIN)
}

fn controllers(source: &str) -> Vec<Controller> {
    Project::new().file(MAIN, source).controllers(MAIN)
}

fn js_controllers(source: &str) -> Vec<Controller> {
    Project::new().file("src/main.js", source).controllers("src/main.js")
}

fn directives(source: &str) -> Vec<Directive> {
    Project::new().file(MAIN, source).directives(MAIN)
}

fn routes(source: &str) -> Vec<Route> {
    Project::new().file(MAIN, source).routes(MAIN)
}

fn main_path() -> PathBuf {
    Path::new(ROOT).join(MAIN)
}
