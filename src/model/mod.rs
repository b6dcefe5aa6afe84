pub mod component;
pub mod controller;
pub mod directive;
pub mod html;
pub mod route;
pub mod span;

pub use component::{Binding, Component, ControllerLink, Template, DEFAULT_CONTROLLER_AS};
pub use controller::{
    link_base_classes, Controller, ControllerSet, Member, Method, MethodParameter, Property,
    ANY_TYPE,
};
pub use directive::{Directive, Restrict};
pub use html::{HtmlReference, HtmlReferenceKind};
pub use route::Route;
pub use span::Span;
