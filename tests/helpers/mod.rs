//! Mock portal used by the pipeline tests.
//!
//! Two servers stand in for the login host and the enrollment host so the
//! host switch after the redirect is exercised.

#![allow(dead_code)]

use rand_core::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use seatwatch::config::Config;
use figment::Figment;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ENABLED_SECTION: &str = "730001";
pub const DISABLED_SECTION: &str = "730002";

pub struct MockPortal {
    pub login: MockServer,
    pub enrollment: MockServer,
    pub private_key: RsaPrivateKey,
}

/// A fresh keypair and the bare base64 SPKI body the login page embeds.
pub fn keypair() -> (RsaPrivateKey, String) {
    let private = RsaPrivateKey::new(&mut OsRng, 1024).expect("generate key");
    let pem = private
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("encode key");
    let body = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<String>();
    (private, body)
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{body}</body></html>"),
        "text/html; charset=utf-8",
    )
}

pub fn login_page(public_key: &str) -> String {
    format!(
        r#"<script>var jsePubKey = '{public_key}';</script>
        <form id="sepform" action="/slogin" method="post">
            <input type="text" name="userName" value="">
            <input type="password" name="pwd" value="">
            <input type="hidden" name="loginFrom" value="portal">
            <input type="submit" value="登录">
        </form>"#
    )
}

pub fn home_page() -> &'static str {
    r#"<a href="/portal/site/16/801" title="个人信息">Profile</a>
       <a href="/portal/site/226/821" title="选课系统">Enroll</a>"#
}

pub fn redirect_page(target: &str) -> String {
    format!(
        r#"<h1>Redirecting</h1>
        <script type="text/javascript">window.location.href='{target}';</script>"#
    )
}

pub fn entry_page() -> &'static str {
    r#"<a href="/courseManage/main">选择课程</a>
       <a href="/course/termSchedule">学期课表</a>"#
}

fn row(cells: &[&str]) -> String {
    let mut out = String::from("<tr>");
    for cell in cells {
        out.push_str(&format!("<td>{cell}</td>"));
    }
    out.push_str("</tr>");
    out
}

pub fn schedule_page() -> String {
    let rows = [
        row(&["序号", "开课单位", "课程编码", "课程名称", "学分", "学时", "教师", "时间", "地点"]),
        row(&["1", "Computer Science", "CS101", "Intro to CS", "3", "40", "A", "Mon", "101"]),
        row(&["2", "Mathematics", "MA202", "Analysis", "4", "60", "B", "Tue", "202"]),
    ];
    format!(
        r#"<select name="deptId">
            <option value="10">Computer Science</option>
            <option value="20">Mathematics</option>
        </select>
        <table>{}</table>"#,
        rows.concat()
    )
}

pub fn selection_page() -> &'static str {
    r#"<form id="regfrm2" name="regfrm2" action="/courseManage/selectCourse?s=abc" method="post">
        <input type="checkbox" name="deptIds" value="10">
        <input type="checkbox" name="deptIds" value="20">
    </form>"#
}

fn result_row(checkbox: &str, code: &str, capacity: &str) -> String {
    let mut cells = vec![checkbox, "1", "x", code, capacity];
    cells.extend(std::iter::repeat_n("-", 8));
    row(&cells)
}

pub fn results_page() -> String {
    let enabled = format!(r#"<input type="checkbox" name="sids" value="{ENABLED_SECTION}">"#);
    let disabled =
        format!(r#"<input type="checkbox" name="sids" value="{DISABLED_SECTION}" disabled>"#);
    format!(
        "<table>{}{}{}</table>",
        result_row(&enabled, "CS101", "5 seats"),
        result_row(&disabled, "CS101", "0 seats"),
        result_row(&enabled, "PH300", "9 seats"),
    )
}

impl MockPortal {
    /// Start both hosts and mount every page except the selection search.
    pub async fn start() -> Self {
        let login = MockServer::start().await;
        let enrollment = MockServer::start().await;
        let (private_key, public_key) = keypair();

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(&login_page(&public_key)))
            .mount(&login)
            .await;
        Mock::given(method("GET"))
            .and(path("/portal/site/226/821"))
            .respond_with(html(&redirect_page(&format!(
                "{}/login?Identity=token-123&roleId=801",
                enrollment.uri()
            ))))
            .mount(&login)
            .await;

        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(html(entry_page()))
            .mount(&enrollment)
            .await;
        Mock::given(method("GET"))
            .and(path("/course/termSchedule"))
            .respond_with(html(&schedule_page()))
            .mount(&enrollment)
            .await;
        Mock::given(method("GET"))
            .and(path("/courseManage/main"))
            .respond_with(html(selection_page()))
            .mount(&enrollment)
            .await;

        Self {
            login,
            enrollment,
            private_key,
        }
    }

    /// Accept any login POST.
    pub async fn accept_login(&self) {
        Mock::given(method("POST"))
            .and(path("/slogin"))
            .respond_with(html(home_page()))
            .mount(&self.login)
            .await;
    }

    /// Answer the selection search with the standard results table.
    pub async fn serve_results(&self) {
        Mock::given(method("POST"))
            .and(path("/courseManage/selectCourse"))
            .respond_with(html(&results_page()))
            .mount(&self.enrollment)
            .await;
    }

    pub fn config(&self, max_cycles: u64) -> Config {
        self.config_with_timeout(max_cycles, 5)
    }

    pub fn config_with_timeout(&self, max_cycles: u64, timeout_secs: u64) -> Config {
        Config::from_figment(
            Figment::new()
                .merge(("portal_url", self.login.uri()))
                .merge(("poll_interval_min", 0))
                .merge(("poll_interval_max", 0))
                .merge(("request_timeout", timeout_secs))
                .merge(("poll_max_cycles", max_cycles)),
        )
        .expect("valid test config")
    }
}
