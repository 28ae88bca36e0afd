//! Robots.txt rules bound to our agent token
//!
//! Allow/disallow matching is delegated to the robotstxt crate; the
//! non-standard `Crawl-delay` directive is read here.

use robotstxt::DefaultMatcher;
use url::Url;

/// Parsed robots.txt for one site, evaluated for one agent
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    /// Product token matched against `User-agent` lines
    agent: String,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `agent` - Our product token, e.g. `CatalogHarvester`
    pub fn from_content(content: &str, agent: &str) -> Self {
        Self {
            content: content.to_string(),
            agent: agent.to_string(),
        }
    }

    /// A policy that allows everything and sets no delay
    ///
    /// Used when robots.txt is missing, unreachable, or ignored.
    pub fn allow_all(agent: &str) -> Self {
        Self::from_content("", agent)
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Checks if a URL may be fetched
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url.as_str())
    }

    /// Crawl delay in seconds for our agent, falling back to `*`
    ///
    /// Consecutive `User-agent` lines form one group; the group ends at the
    /// next `User-agent` line that follows a rule.
    pub fn crawl_delay(&self) -> Option<f64> {
        let agent = self.agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent = None;
        let mut for_wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        for_agent = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        for_agent.or(for_wildcard)
    }
}
