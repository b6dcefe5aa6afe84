use regex::Regex;
use tracing::warn;

use super::ajs_config::AjsConfig;
use crate::model::{Controller, Member};

/// テンプレートから見えるコントローラーメンバーの絞り込み
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    public_only: bool,
    excluded: Option<Regex>,
}

impl MemberFilter {
    pub fn new(public_only: bool, excluded: Option<Regex>) -> Self {
        Self {
            public_only,
            excluded,
        }
    }

    /// 設定から作成する（不正な正規表現は警告して無視）
    pub fn from_config(config: &AjsConfig) -> Self {
        let excluded = config
            .excluded_members
            .as_deref()
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern, "Invalid excludedMembers pattern: {}", e);
                    None
                }
            });
        Self::new(config.public_members_only, excluded)
    }

    pub fn is_visible(&self, member: &Member) -> bool {
        if self.public_only && !member.is_public() {
            return false;
        }
        !self
            .excluded
            .as_ref()
            .is_some_and(|regex| regex.is_match(member.name()))
    }

    /// 継承元を含めた表示対象メンバー
    pub fn visible_members<'c>(&self, controller: &'c Controller) -> Vec<&'c Member> {
        controller
            .all_members()
            .into_iter()
            .filter(|m| self.is_visible(m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::model::{Property, Span, ANY_TYPE};

    fn property(name: &str, is_public: bool) -> Member {
        Member::Property(Property {
            name: name.to_string(),
            return_type: ANY_TYPE.to_string(),
            is_public,
            span: Span::default(),
        })
    }

    fn controller() -> Controller {
        let mut base = Controller::new("BaseCtrl", PathBuf::from("/app/base.ts"), Span::default());
        base.members = vec![property("baseValue", true), property("$inject", true)];

        let mut child = Controller::new("CardCtrl", PathBuf::from("/app/card.ts"), Span::default());
        child.base_class_name = Some("BaseCtrl".to_string());
        child.base_class = Some(Arc::new(base));
        child.members = vec![property("title", true), property("secret", false)];
        child
    }

    fn names(members: Vec<&Member>) -> Vec<&str> {
        members.into_iter().map(|m| m.name()).collect()
    }

    #[test]
    fn test_default_shows_everything_including_inherited() {
        let ctrl = controller();
        let filter = MemberFilter::default();
        assert_eq!(
            names(filter.visible_members(&ctrl)),
            vec!["title", "secret", "baseValue", "$inject"]
        );
    }

    #[test]
    fn test_public_only_and_excluded_pattern() {
        let ctrl = controller();
        let config = AjsConfig {
            public_members_only: true,
            excluded_members: Some(r"^\$".to_string()),
            ..AjsConfig::default()
        };
        let filter = MemberFilter::from_config(&config);
        assert_eq!(names(filter.visible_members(&ctrl)), vec!["title", "baseValue"]);
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let config = AjsConfig {
            excluded_members: Some("(".to_string()),
            ..AjsConfig::default()
        };
        let filter = MemberFilter::from_config(&config);
        assert!(filter.is_visible(&property("anything", true)));
    }
}
