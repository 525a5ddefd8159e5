use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::poller::{AvailabilityPoller, PollSummary, UniformDelay};
use crate::portal::{
    Credentials, PortalError, PortalSession, SessionSettings, TargetCourseSet, authenticate,
    load_catalog,
};

/// One watch run: login, catalog load, then polling, all on one session.
pub struct App {
    config: Config,
    session: PortalSession,
}

impl App {
    pub fn new(config: Config) -> Result<Self, PortalError> {
        let settings = SessionSettings {
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout,
        };
        let session = PortalSession::new(&config.portal_url, &settings)?;
        Ok(Self { config, session })
    }

    /// Run the pipeline until polling stops.
    ///
    /// Any error returned is fatal for the run. Cancellation before or during
    /// a stage ends the run early with whatever was counted so far.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
        targets: TargetCourseSet,
        cancel: &CancellationToken,
    ) -> Result<PollSummary, PortalError> {
        info!(
            portal = %self.config.portal_url,
            username = credentials.username.as_str(),
            targets = targets.len(),
            "Starting watch"
        );

        let entry = tokio::select! {
            _ = cancel.cancelled() => return Ok(PollSummary::default()),
            entry = authenticate(&mut self.session, &self.config.portal_url, credentials) => entry?,
        };

        let catalog = tokio::select! {
            _ = cancel.cancelled() => return Ok(PollSummary::default()),
            catalog = load_catalog(&self.session, &entry) => catalog?,
        };

        let delay = UniformDelay::new(
            self.config.poll_interval_min,
            self.config.poll_interval_max,
        );
        let poller = tokio::select! {
            _ = cancel.cancelled() => return Ok(PollSummary::default()),
            poller = AvailabilityPoller::setup(&self.session, &entry, &catalog, targets, delay) => poller?,
        };

        let mut poller = poller.with_max_cycles(self.config.poll_max_cycles);
        poller.run(cancel).await
    }
}
