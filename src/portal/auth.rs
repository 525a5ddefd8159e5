//! Login handshake and hand-off to the enrollment host.
//!
//! The flow is: entry page (public key + login form) → encrypted login POST →
//! portal home (link to the enrollment system) → a page whose inline script
//! redirects to the enrollment host → enrollment entry page.

use custom_debug_derive::Debug;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

use crate::portal::crypto::{Encryptor, extract_public_key};
use crate::portal::errors::PortalError;
use crate::portal::html::{Document, FormFields};
use crate::portal::session::PortalSession;

pub const LOGIN_FORM_ID: &str = "sepform";
pub const USERNAME_FIELD: &str = "userName";
pub const PASSWORD_FIELD: &str = "pwd";
/// Text the portal renders when the password check fails.
pub const LOGIN_FAILURE_MARKER: &str = "密码错误";
/// `title` of the portal-home link into the enrollment system.
pub const ENROLLMENT_LINK_TITLE: &str = "选课系统";

static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"window\.location\.href\s*=\s*'(https?://[#$%&+,\-./0-9:;=?@A-Z_a-z~]+)'").unwrap()
});

/// Login credentials supplied by the user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    #[debug(with = "crate::fmt::redacted")]
    pub password: String,
}

/// The enrollment system's landing page, reached after login.
///
/// Holds the raw body so later stages can look up the links they need.
#[derive(Debug, Clone)]
pub struct EnrollmentEntry {
    pub url: Url,
    #[debug(skip)]
    body: String,
}

impl EnrollmentEntry {
    pub fn new(url: Url, body: String) -> Self {
        Self { url, body }
    }

    /// Resolve the link labelled `text` against the session's current host.
    pub fn link(&self, session: &PortalSession, text: &str) -> Result<Url, PortalError> {
        let href = Document::parse(&self.body)
            .link_by_text(text)
            .ok_or_else(|| PortalError::missing(format!("link \"{text}\" on enrollment page")))?;
        session.resolve(&href)
    }
}

/// What the entry page provides for logging in.
#[derive(Debug)]
struct LoginPage {
    public_key: String,
    action: String,
    fields: FormFields,
}

fn parse_login_page(body: &str) -> Result<LoginPage, PortalError> {
    let doc = Document::parse(body);
    let public_key = extract_public_key(&doc)?;
    let form = doc
        .form(LOGIN_FORM_ID)
        .ok_or_else(|| PortalError::missing(format!("form#{LOGIN_FORM_ID}")))?;
    let action = form
        .action
        .ok_or_else(|| PortalError::missing(format!("action of form#{LOGIN_FORM_ID}")))?;

    Ok(LoginPage {
        public_key,
        action,
        fields: form.fields,
    })
}

fn parse_enrollment_link(body: &str) -> Result<String, PortalError> {
    Document::parse(body)
        .link_by_title(ENROLLMENT_LINK_TITLE)
        .ok_or_else(|| PortalError::missing(format!("link titled \"{ENROLLMENT_LINK_TITLE}\"")))
}

fn parse_redirect(body: &str) -> Result<Url, PortalError> {
    let target = Document::parse(body)
        .script_capture(&REDIRECT_RE)
        .ok_or(PortalError::RedirectNotFound)?;
    Ok(Url::parse(&target)?)
}

/// Log in at `entry_url` and follow the portal through to the enrollment host.
///
/// On success the session's host has moved to the enrollment server.
pub async fn authenticate(
    session: &mut PortalSession,
    entry_url: &Url,
    credentials: &Credentials,
) -> Result<EnrollmentEntry, PortalError> {
    let index = session.get(entry_url).await?;
    let login = parse_login_page(&index)?;
    info!(public_key = login.public_key.as_str(), "Retrieved RSA public key");

    let encryptor = Encryptor::new(&login.public_key)?;
    let mut fields = login.fields;
    fields.set(USERNAME_FIELD, credentials.username.as_str());
    fields.set(PASSWORD_FIELD, encryptor.encrypt(&credentials.password)?);

    let login_url = session.resolve(&login.action)?;
    debug!(url = %login_url, fields = fields.len(), "Submitting login form");
    let home = session.post_form(&login_url, fields.as_pairs()).await?;
    if home.contains(LOGIN_FAILURE_MARKER) {
        return Err(PortalError::AuthenticationRejected {
            username: credentials.username.clone(),
        });
    }
    info!(username = credentials.username.as_str(), "Logged in");

    let portal_url = session.resolve(&parse_enrollment_link(&home)?)?;
    let portal = session.get(&portal_url).await?;
    let redirect_url = parse_redirect(&portal)?;
    session.switch_host(&redirect_url)?;
    info!(url = %redirect_url, "Found enrollment system redirect");

    let body = session.get(&redirect_url).await?;
    Ok(EnrollmentEntry::new(redirect_url, body))
}
