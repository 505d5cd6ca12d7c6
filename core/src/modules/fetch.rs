//! Remote module fetching

use std::time::Duration;

use tracing::debug;

use super::ModuleError;

/// Source of remote module text
///
/// The interpreter fetches HTTP and registry modules through this trait so
/// embedders and tests can substitute their own transport.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String, ModuleError>;
}

/// Blocking HTTP fetcher backed by `ureq`
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, ModuleError> {
        debug!(url, "fetching remote module");
        let response = self.agent.get(url).call().map_err(|err| {
            let message = match err {
                ureq::Error::Status(code, _) => format!("server responded with status {}", code),
                other => other.to_string(),
            };
            ModuleError::Fetch {
                url: url.to_string(),
                message,
            }
        })?;
        response.into_string().map_err(|err| ModuleError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}
