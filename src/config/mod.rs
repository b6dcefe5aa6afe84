pub mod ajs_config;
pub mod member_filter;
pub mod path_matcher;

pub use ajs_config::{AjsConfig, DefinitionParts, CONFIG_FILE_NAME};
pub use member_filter::MemberFilter;
pub use path_matcher::PathMatcher;
