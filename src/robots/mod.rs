//! Robots.txt handling module
//!
//! Before the first request the seed URL is checked against its site's
//! robots.txt. An unreachable or missing file permits everything.

mod parser;

pub use parser::RobotsPolicy;

use crate::crawler::Transport;
use url::Url;

/// Returns the robots.txt URL for the site hosting `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Fetches robots.txt for the site hosting `url`
///
/// A single request is made; any status other than 2xx, or a transport
/// failure, yields a permissive policy.
///
/// # Arguments
///
/// * `transport` - Transport used for page fetches
/// * `url` - Any URL on the target site
pub async fn fetch_robots(transport: &dyn Transport, url: &Url) -> RobotsPolicy {
    let Some(robots) = robots_url(url) else {
        return RobotsPolicy::permissive();
    };

    match transport.get(robots.as_str()).await {
        Ok(response) if (200..300).contains(&response.status) => match response.body {
            Some(body) => RobotsPolicy::from_content(&body),
            None => RobotsPolicy::permissive(),
        },
        Ok(response) => {
            tracing::debug!(url = %robots, status = response.status, "No robots.txt");
            RobotsPolicy::permissive()
        }
        Err(e) => {
            tracing::warn!(url = %robots, error = %e, "Failed to fetch robots.txt, assuming allow");
            RobotsPolicy::permissive()
        }
    }
}
