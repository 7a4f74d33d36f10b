//! Best-effort dislike counts from the community vote service.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

pub const DISLIKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Votes {
    #[serde(default)]
    dislikes: Option<i64>,
}

#[derive(Clone)]
pub struct DislikeClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DislikeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(DISLIKE_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Never fails: timeouts, non-200 answers and odd bodies all read as 0.
    pub fn dislikes(&self, video_id: &str) -> u64 {
        let url = format!("{}/votes", self.base_url);
        let response = match self.agent.get(&url).query("videoId", video_id).call() {
            Ok(response) if response.status() == 200 => response,
            Ok(response) => {
                debug!(identifier = video_id, status = response.status(), "dislike lookup skipped");
                return 0;
            }
            Err(err) => {
                debug!(identifier = video_id, error = %err, "dislike lookup failed");
                return 0;
            }
        };
        match response.into_json::<Votes>() {
            Ok(votes) => votes.dislikes.unwrap_or(0).max(0) as u64,
            Err(err) => {
                debug!(identifier = video_id, error = %err, "dislike body unreadable");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubServer, dead_base_url};

    #[test]
    fn reads_dislike_field() {
        let server = StubServer::start(|_| (200, r#"{"id":"x","likes":10,"dislikes":42}"#.into()));
        let client = DislikeClient::new(&server.base_url);
        assert_eq!(client.dislikes("dQw4w9WgXcQ"), 42);
        assert_eq!(server.requests(), vec!["/votes?videoId=dQw4w9WgXcQ".to_string()]);
    }

    #[test]
    fn failures_collapse_to_zero() {
        let not_found = StubServer::start(|_| (404, r#"{"title":"Not Found"}"#.into()));
        assert_eq!(DislikeClient::new(&not_found.base_url).dislikes("abc"), 0);

        let garbage = StubServer::start(|_| (200, "<html>".into()));
        assert_eq!(DislikeClient::new(&garbage.base_url).dislikes("abc"), 0);

        let missing = StubServer::start(|_| (200, "{}".into()));
        assert_eq!(DislikeClient::new(&missing.base_url).dislikes("abc"), 0);

        assert_eq!(DislikeClient::new(dead_base_url()).dislikes("abc"), 0);
    }
}
