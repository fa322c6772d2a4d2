//! `update`: pull the upstream configuration file and swap it in when it carries
//! a newer version, keeping the user's saved credentials.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::{
    api::Credentials,
    config::{self, LoadedConfig},
    utils,
    version::VersionTag,
};

pub trait ReleaseSource {
    fn fetch_latest(&self) -> Result<String>;
}

pub struct HttpRelease {
    client: Client,
    url: String,
}

impl HttpRelease {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.to_string(),
        })
    }
}

impl ReleaseSource for HttpRelease {
    fn fetch_latest(&self) -> Result<String> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("Unable to reach {}", self.url))?;

        if !res.status().is_success() {
            anyhow::bail!("{} answered with {}", self.url, res.status());
        }

        Ok(res.text()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate {
        local: VersionTag,
        latest: VersionTag,
    },
    Updated {
        from: VersionTag,
        to: VersionTag,
        path: PathBuf,
    },
}

pub struct SelfUpdater<S: ReleaseSource> {
    source: S,
}

impl<S: ReleaseSource> SelfUpdater<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn run(&self, loaded: &LoadedConfig, credentials: &Credentials) -> Result<UpdateOutcome> {
        let local = VersionTag::from_str(&loaded.config.version)
            .with_context(|| format!("Invalid version in {:?}", loaded.path))?;

        let fetched = self.source.fetch_latest()?;
        let latest = find_version(&fetched)?;
        log::debug!("Local configuration {local}, upstream {latest}");

        if !latest.is_newer_than(&local) {
            return Ok(UpdateOutcome::UpToDate { local, latest });
        }

        let marker = match loaded.exists {
            true => std::fs::read_to_string(&loaded.path)
                .with_context(|| format!("Failed to read {:?}", loaded.path))?
                .lines()
                .next()
                .filter(|line| is_marker(line))
                .map(str::to_owned),
            false => None,
        };

        let contents = rewrite(&fetched, marker.as_deref(), credentials)?;
        config::parse(&contents).context("Upstream configuration does not parse")?;

        utils::atomic_replace(&loaded.path, &contents)?;
        log::info!("Replaced {:?} with version {latest}", loaded.path);

        Ok(UpdateOutcome::Updated {
            from: local,
            to: latest,
            path: loaded.path.clone(),
        })
    }
}

fn is_marker(line: &str) -> bool {
    line.starts_with("#!")
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

/// `true` for a `name: ...` field line.
fn is_field(line: &str, name: &str) -> bool {
    if is_comment(line) {
        return false;
    }

    match line.trim_start().strip_prefix(name) {
        Some(rest) => rest.trim_start().starts_with(':'),
        None => false,
    }
}

/// Version of the first `version:` field in a configuration text.
pub fn find_version(text: &str) -> Result<VersionTag> {
    text.lines()
        .filter(|line| is_field(line, "version"))
        .find_map(VersionTag::find)
        .context("No version marker in the upstream configuration")
}

#[derive(PartialEq, Eq)]
enum Stage {
    Version,
    Username,
    Password,
    Done,
}

/// Rebuilds `fetched` with `credentials` in place of its username and password
/// fields (the first ones after the version field).
///
/// The local `marker` line replaces a marker the fetched text starts with.
pub fn rewrite(fetched: &str, marker: Option<&str>, credentials: &Credentials) -> Result<String> {
    let mut lines = fetched.lines().peekable();
    let fetched_marker = lines.next_if(|line| is_marker(line));

    let mut out = Vec::new();
    if let Some(marker) = marker.or(fetched_marker) {
        out.push(marker.to_string());
    }

    let mut stage = Stage::Version;
    for line in lines {
        let indent = &line[..line.len() - line.trim_start().len()];

        let line = match stage {
            Stage::Version if is_field(line, "version") => {
                stage = Stage::Username;
                line.to_string()
            }
            Stage::Username if is_field(line, "username") => {
                stage = Stage::Password;
                format!("{indent}username: {},", ron::to_string(&credentials.username)?)
            }
            Stage::Password if is_field(line, "password") => {
                stage = Stage::Done;
                format!("{indent}password: {},", ron::to_string(&credentials.password)?)
            }
            _ => line.to_string(),
        };

        out.push(line);
    }

    if stage != Stage::Done {
        anyhow::bail!("Upstream configuration is missing the credential fields");
    }

    let mut contents = out.join("\n");
    contents.push('\n');
    Ok(contents)
}
