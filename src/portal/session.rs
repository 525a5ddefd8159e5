//! Cookie-carrying HTTP session bound to the currently active portal host.

use reqwest::redirect::Policy;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

use crate::portal::errors::PortalError;
use crate::utils::{fmt_duration, log_if_slow};

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// HTTP settings applied to every request in a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub user_agent: String,
    pub request_timeout: Duration,
}

/// The single HTTP session used for a whole run.
///
/// Relative links are resolved against `host`, which moves when the portal
/// hands the workflow off to another subdomain.
pub struct PortalSession {
    http: reqwest::Client,
    host: Url,
}

impl PortalSession {
    pub fn new(entry_url: &Url, settings: &SessionSettings) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            http,
            host: origin_of(entry_url)?,
        })
    }

    /// Scheme and authority of the active server.
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Make `target`'s origin the base for subsequent relative links.
    pub fn switch_host(&mut self, target: &Url) -> Result<(), PortalError> {
        let host = origin_of(target)?;
        if host != self.host {
            debug!(from = %self.host, to = %host, "Switching portal host");
        }
        self.host = host;
        Ok(())
    }

    /// Resolve an `href` or form action against the active host.
    pub fn resolve(&self, href: &str) -> Result<Url, PortalError> {
        Ok(self.host.join(href)?)
    }

    /// GET `url` and return the decoded body.
    pub async fn get(&self, url: &Url) -> Result<String, PortalError> {
        let request = self.http.get(url.clone());
        self.execute("GET", url, request).await
    }

    /// POST a urlencoded form to `url` and return the decoded body.
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        form: &T,
    ) -> Result<String, PortalError> {
        let request = self.http.post(url.clone()).form(form);
        self.execute("POST", url, request).await
    }

    async fn execute(
        &self,
        method: &'static str,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<String, PortalError> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            debug!(method, url = %url, status = status.as_u16(), "Request failed");
            return Err(PortalError::Status {
                status,
                url: final_url,
            });
        }

        let body = response.text().await?;
        trace!(
            method,
            url = %url,
            final_url = final_url.as_str(),
            status = status.as_u16(),
            bytes = body.len(),
            duration = fmt_duration(start.elapsed()),
            "Request completed"
        );
        log_if_slow(start, SLOW_REQUEST_THRESHOLD, url.as_str());

        Ok(body)
    }
}

fn origin_of(url: &Url) -> Result<Url, PortalError> {
    Ok(Url::parse(&url.origin().ascii_serialization())?)
}
