//! robots.txt evaluation
//!
//! Allow/disallow matching is delegated to the robotstxt crate. The
//! `Crawl-delay` extension isn't covered by it, so groups are scanned here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// A site's robots.txt, or the absence of one
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    /// Raw file content; `None` when the file could not be obtained
    content: Option<String>,
}

/// One `User-agent` group and its crawl delay
#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RobotsPolicy {
    /// Wraps the body of a fetched robots.txt
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Policy used when robots.txt is missing or unreachable
    pub fn permissive() -> Self {
        Self { content: None }
    }

    pub fn is_permissive(&self) -> bool {
        self.content.as_deref().map_or(true, |c| c.trim().is_empty())
    }

    /// Checks a full URL against the rules for `user_agent`
    pub fn allows(&self, url: &str, user_agent: &str) -> bool {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, product_token(user_agent), url)
            }
            _ => true,
        }
    }

    /// Returns the `Crawl-delay` for `user_agent`
    ///
    /// A group naming the agent takes precedence over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let content = self.content.as_deref()?;
        let token = product_token(user_agent).to_lowercase();
        let groups = parse_groups(content);

        let specific = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && token.contains(a.as_str())))
            .find_map(|g| g.crawl_delay);
        let wildcard = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a == "*"))
            .find_map(|g| g.crawl_delay);

        specific
            .or(wildcard)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// `Name/1.0 (+url)` → `Name`
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or(user_agent)
}

/// Splits the file into groups. Consecutive `User-agent` lines share a group;
/// a `User-agent` line after any rule starts a new one.
fn parse_groups(content: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut in_rules = true;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if in_rules || groups.is_empty() {
                groups.push(Group::default());
                in_rules = false;
            }
            if let Some(group) = groups.last_mut() {
                group.agents.push(value.to_lowercase());
            }
            continue;
        }

        in_rules = true;
        if key == "crawl-delay" {
            if let (Some(group), Ok(secs)) = (groups.last_mut(), value.parse::<f64>()) {
                group.crawl_delay.get_or_insert(secs);
            }
        }
    }

    groups
}
