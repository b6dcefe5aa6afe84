pub mod component;
pub mod config_accessor;
pub mod controller;
pub mod directive;
pub mod html;
pub mod query;
pub mod route;
pub mod source;
pub mod syntax;
pub mod template;

pub use component::ComponentParser;
pub use config_accessor::ConfigAccessor;
pub use controller::ControllerParser;
pub use directive::DirectiveParser;
pub use html::HtmlReferenceParser;
pub use query::TreeQuery;
pub use route::RouteParser;
pub use source::{Dialect, Documents, ParseContext, SourceUnit};

#[cfg(test)]
mod tests;
