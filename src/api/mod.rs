pub mod types;

use anyhow::Result;
use reqwest::{blocking::Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use self::types::*;

const HOST: &str = "http://p.nju.edu.cn/portal_io";
const PROBE_URL: &str = "http://www.baidu.com";

/// Everything the session logic needs to know about the captive portal.
///
/// None of these calls fail: transport and protocol errors are folded into
/// `false`/`None` here so callers only deal with "the portal said yes" or not.
pub trait Portal {
    /// `true` only when a non-portal host answered with HTTP 200.
    fn probe_connectivity(&self) -> bool;
    fn fetch_user_info(&self) -> Option<UserInfo>;
    fn fetch_usage_info(&self) -> Option<UsageInfo>;
    /// Returns the HTTP status code, `None` on transport failure.
    fn submit_login(&self, credentials: &Credentials) -> Option<u16>;
    /// Fire-and-forget, verify with `probe_connectivity`.
    fn submit_logout(&self);
}

pub struct PortalClient {
    client: Client,
    host: String,
    probe_url: String,
}

impl PortalClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_hosts(HOST, PROBE_URL, timeout)
    }

    pub fn with_hosts(host: &str, probe_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            probe_url: probe_url.to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.host)
    }

    fn fetch_first_row<T, R>(&self, endpoint: &str) -> Option<R>
    where
        T: DeserializeOwned,
        R: From<T>,
    {
        let url = self.url(endpoint);
        let res = match self.client.get(&url).send() {
            Ok(res) => res,
            Err(err) => {
                log::debug!("GET {url} failed: {err}");
                return None;
            }
        };

        if res.status() != StatusCode::OK {
            log::debug!("GET {url} returned {}", res.status());
            return None;
        }

        let text = res.text().ok()?;
        parse_first_row::<T>(&text).map(R::from)
    }
}

/// Decodes a `{"rows": [...]}` payload, `None` when malformed or empty.
pub fn parse_first_row<T: DeserializeOwned>(text: &str) -> Option<T> {
    match serde_json::from_str::<Rows<T>>(text) {
        Ok(rows) => rows.first(),
        Err(err) => {
            log::debug!("Malformed portal payload: {err}");
            None
        }
    }
}

impl Portal for PortalClient {
    fn probe_connectivity(&self) -> bool {
        let connected = match self.client.get(&self.probe_url).send() {
            Ok(res) => res.status() == StatusCode::OK,
            Err(err) => {
                log::debug!("Connectivity probe failed: {err}");
                false
            }
        };

        log::trace!(connected:?; "Probed {}", self.probe_url);
        connected
    }

    fn fetch_user_info(&self) -> Option<UserInfo> {
        self.fetch_first_row::<UserInfoRow, UserInfo>("selfservice/userinfo/getlist")
    }

    fn fetch_usage_info(&self) -> Option<UsageInfo> {
        self.fetch_first_row::<VolumeRow, UsageInfo>("selfservice/volume/getlist")
    }

    fn submit_login(&self, credentials: &Credentials) -> Option<u16> {
        let params = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        match self.client.post(self.url("login")).query(&params).send() {
            Ok(res) => Some(res.status().as_u16()),
            Err(err) => {
                // without_url keeps the password query parameter out of the log
                log::debug!("Login request failed: {}", err.without_url());
                None
            }
        }
    }

    fn submit_logout(&self) {
        if let Err(err) = self.client.post(self.url("logout")).send() {
            log::debug!("Logout request failed: {err}");
        }
    }
}
