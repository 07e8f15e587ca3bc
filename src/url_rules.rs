//! Product name -> product page resolution.
//!
//! Rules are evaluated against the lowercased product name. When several
//! keywords occur in the name, the rule with the highest `priority` wins,
//! then the longest keyword, then the one declared first. A name matching
//! no rule resolves to the caller's fallback.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRule {
    pub keyword: String,
    pub url: String,
    #[serde(default)]
    pub priority: i32,
}

impl UrlRule {
    pub fn new(keyword: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            url: url.into(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Returns the URL of the winning rule for `product_name`, if any.
pub fn resolve_url<'a>(rules: &'a [UrlRule], product_name: &str) -> Option<&'a str> {
    let name = product_name.to_lowercase();

    let mut best: Option<&UrlRule> = None;
    for rule in rules {
        let keyword = rule.keyword.trim().to_lowercase();
        if keyword.is_empty() || !name.contains(&keyword) {
            continue;
        }
        // strictly better only, so earlier declarations keep ties
        let better = match best {
            None => true,
            Some(current) => {
                (rule.priority, rule.keyword.trim().len())
                    > (current.priority, current.keyword.trim().len())
            }
        };
        if better {
            best = Some(rule);
        }
    }

    best.map(|rule| rule.url.as_str())
}

/// The storefront's product pages.
pub fn default_rules() -> Vec<UrlRule> {
    vec![
        UrlRule::new("keter", "/products/keter-outdoor-storage").with_priority(10),
        UrlRule::new("deck box", "/products/deck-box"),
        UrlRule::new("storage bench", "/products/storage-bench"),
        UrlRule::new("storage", "/products/outdoor-storage"),
        UrlRule::new("shed", "/products/garden-shed"),
        UrlRule::new("planter", "/products/raised-planter"),
        UrlRule::new("composter", "/products/composter"),
        UrlRule::new("greenhouse", "/products/greenhouse"),
        UrlRule::new("hose reel", "/products/hose-reel"),
        UrlRule::new("parasol", "/products/parasol"),
    ]
}
