use std::time::Duration;

use url::Url;

use crate::SubmitError;

/// Registry host used when none is configured.
pub const DEFAULT_HOST: &str = "https://ismp.crpt.ru";

const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_LIMIT: usize = 5;

/// Settings for a [`crate::DocumentSubmitter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitterConfig {
    host: Url,
    window: Duration,
    limit: usize,
    request_timeout: Option<Duration>,
    max_wait: Option<Duration>,
}

/// Makes `host` usable as a base for relative paths.
///
/// Without a trailing slash, joining would replace the last path segment
/// instead of appending to it.
pub(crate) fn as_base(mut host: Url) -> Url {
    if !host.cannot_be_a_base() && !host.path().ends_with('/') {
        let path = format!("{}/", host.path());
        host.set_path(&path);
    }
    host
}

impl SubmitterConfig {
    /// Five submissions per minute against `host`, with no timeouts.
    ///
    /// A path prefix in `host` is kept, with or without a trailing slash.
    pub fn new(host: Url) -> Self {
        Self {
            host: as_base(host),
            window: DEFAULT_WINDOW,
            limit: DEFAULT_LIMIT,
            request_timeout: None,
            max_wait: None,
        }
    }

    pub fn from_host(host: &str) -> Result<Self, SubmitError> {
        Ok(Self::new(Url::parse(host)?))
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bound each HTTP exchange, from connect to the end of the body.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Bound how long a submission may wait for admission.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Rejects settings no submitter can work with.
    ///
    /// Window and limit are checked again when the gate is built.
    pub fn validate(&self) -> Result<(), SubmitError> {
        match self.host.scheme() {
            "http" | "https" => {}
            other => {
                return Err(SubmitError::InvalidConfiguration(format!(
                    "unsupported registry scheme: {other}"
                )));
            }
        }
        if self.host.cannot_be_a_base() {
            return Err(SubmitError::InvalidConfiguration(format!(
                "registry url cannot be a base: {}",
                self.host
            )));
        }
        if self.window.is_zero() {
            return Err(SubmitError::InvalidConfiguration(
                "window must be greater than zero".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(SubmitError::InvalidConfiguration(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
