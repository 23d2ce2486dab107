//! Fetching JSON for rad blocks and `http_get`.
//!
//! The runtime ships no HTTP client of its own: [`NoTransport`] refuses
//! every request, and [`MockFetcher`] answers from canned documents keyed
//! by URL regexes (the `-m` command-line option).

use log::debug;
use regex::Regex;
use serde_json::Value as Json;

use crate::error::RadError;

pub trait JsonFetcher {
    fn fetch(&mut self, url: &str) -> Result<Json, RadError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransport;

impl JsonFetcher for NoTransport {
    fn fetch(&mut self, url: &str) -> Result<Json, RadError> {
        Err(RadError::Fetch {
            url: url.to_owned(),
            message: "no HTTP transport configured (use -m to mock responses)".to_owned(),
        })
    }
}

/// Answers requests whose URL matches a rule's regex with that rule's
/// document.  Rules are tried in the order they were added.
#[derive(Debug, Default)]
pub struct MockFetcher {
    rules: Vec<(Regex, Json)>,
    requests: Vec<String>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, pattern: &str, response: Json) -> Result<(), regex::Error> {
        self.rules.push((Regex::new(pattern)?, response));
        Ok(())
    }

    pub fn with_rule(mut self, pattern: &str, response: Json) -> Result<Self, regex::Error> {
        self.add_rule(pattern, response)?;
        Ok(self)
    }

    /// URLs requested so far.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl JsonFetcher for MockFetcher {
    fn fetch(&mut self, url: &str) -> Result<Json, RadError> {
        self.requests.push(url.to_owned());
        let (re, body) = self
            .rules
            .iter()
            .find(|(re, _)| re.is_match(url))
            .ok_or_else(|| RadError::Fetch {
                url: url.to_owned(),
                message: "no mock response matches".to_owned(),
            })?;
        debug!("mock response for {url} (rule /{re}/)");
        Ok(body.clone())
    }
}
