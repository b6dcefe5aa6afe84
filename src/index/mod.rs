pub mod cache;
pub mod feed;
pub mod project;
pub mod sources;

pub use cache::{CacheStatus, EntityCache, EntitySource};
pub use feed::{ChannelFeed, FileChangeFeed, FileEvent};
pub use project::ProjectIndex;
pub use sources::{
    ComponentSource, ControllerSource, DirectiveSource, HtmlSource, RouteSource, SharedControllers,
};
