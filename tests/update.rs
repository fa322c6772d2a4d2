use anyhow::Result;
use njunet_rs::{
    api::Credentials,
    config::{self, Configuration, LoadedConfig},
    update::{self, ReleaseSource, SelfUpdater, UpdateOutcome},
    version::VersionTag,
};
use std::{fs, path::Path};

const UPSTREAM: &str = r#"#![enable(implicit_some)]
(
    // bumped by every release
    version: "0.2.0",
    // username: "not this one"
    username: "xxxx",
    password: "****",
    request_timeout_secs: 10,
)
"#;

const LOCAL: &str = r#"#![enable(unwrap_newtypes)]
(
    version: "0.1.0",
    username: "alice",
    password: "pw",
)
"#;

struct StaticRelease(&'static str);

impl ReleaseSource for StaticRelease {
    fn fetch_latest(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

fn write_local(path: &Path, contents: &str) -> Result<LoadedConfig> {
    fs::write(path, contents)?;
    config::load(Some(&path.to_path_buf()))
}

#[test]
fn test_update_keeps_credentials_and_marker() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("njunet.ron");
    let loaded = write_local(&path, LOCAL)?;

    let outcome = SelfUpdater::new(StaticRelease(UPSTREAM)).run(&loaded, &loaded.config.credentials())?;

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: VersionTag::new(0, 1, 0),
            to: VersionTag::new(0, 2, 0),
            path: path.clone(),
        }
    );

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().next(), Some("#![enable(unwrap_newtypes)]"));
    assert!(contents.contains(r#"// username: "not this one""#));

    let updated = config::parse(&contents)?;
    assert_eq!(updated.version, "0.2.0");
    assert_eq!(updated.username, "alice");
    assert_eq!(updated.password, "pw");
    assert_eq!(updated.request_timeout_secs, 10);

    // Only the live file is left behind
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);

    Ok(())
}

#[test]
fn test_same_version_is_up_to_date() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("njunet.ron");
    let loaded = write_local(&path, &LOCAL.replace("0.1.0", "0.2.0"))?;

    let outcome = SelfUpdater::new(StaticRelease(UPSTREAM)).run(&loaded, &loaded.config.credentials())?;

    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
    assert_eq!(fs::read_to_string(&path)?, LOCAL.replace("0.1.0", "0.2.0"));

    Ok(())
}

#[test]
fn test_older_upstream_is_up_to_date() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("njunet.ron");
    let loaded = write_local(&path, &LOCAL.replace("0.1.0", "0.3.0"))?;

    let outcome = SelfUpdater::new(StaticRelease(UPSTREAM)).run(&loaded, &loaded.config.credentials())?;

    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            local: VersionTag::new(0, 3, 0),
            latest: VersionTag::new(0, 2, 0),
        }
    );

    Ok(())
}

#[test]
fn test_upstream_without_version_leaves_file_alone() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("njunet.ron");
    let loaded = write_local(&path, LOCAL)?;

    let result = SelfUpdater::new(StaticRelease("(username: \"\", password: \"\")"))
        .run(&loaded, &loaded.config.credentials());

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path)?, LOCAL);

    Ok(())
}

#[test]
fn test_update_creates_missing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config").join("njunet.ron");
    let loaded = LoadedConfig {
        path: path.clone(),
        exists: false,
        config: Configuration {
            version: "0.1.0".into(),
            ..Configuration::default()
        },
    };

    let outcome = SelfUpdater::new(StaticRelease(UPSTREAM)).run(&loaded, &Credentials::new("bob", "pw"))?;

    assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().next(), Some("#![enable(implicit_some)]"));
    assert_eq!(config::parse(&contents)?.username, "bob");

    Ok(())
}

#[test]
fn test_rewrite_escapes_credentials() -> Result<()> {
    let credentials = Credentials::new("alice", r#"p"a\ss"#);
    let contents = update::rewrite(UPSTREAM, None, &credentials)?;
    let parsed = config::parse(&contents)?;

    assert_eq!(parsed.password, r#"p"a\ss"#);

    Ok(())
}

#[test]
fn test_rewrite_requires_credential_fields() {
    let fetched = "(\n    version: \"0.2.0\",\n    username: \"\",\n)\n";
    assert!(update::rewrite(fetched, None, &Credentials::default()).is_err());
}

#[test]
fn test_rewrite_default_configuration() -> Result<()> {
    let fetched = Configuration::default().to_pretty_string()?;
    let contents = update::rewrite(&fetched, None, &Credentials::new("alice", "pw"))?;
    let parsed = config::parse(&contents)?;

    assert_eq!(parsed.username, "alice");
    assert_eq!(parsed.password, "pw");

    Ok(())
}

#[test]
fn test_find_version_skips_comments() -> Result<()> {
    let text = "(\n    // version: \"9.9.9\"\n    version: \"0.4.2\",\n)";
    assert_eq!(update::find_version(text)?, VersionTag::new(0, 4, 2));
    assert!(update::find_version("(username: \"\")").is_err());

    Ok(())
}

#[test]
fn test_shipped_configuration_is_updatable() -> Result<()> {
    let shipped = include_str!("../njunet.ron");
    let parsed = config::parse(shipped)?;
    assert!(!parsed.credentials().has_username());
    assert_eq!(update::find_version(shipped)?.to_string(), parsed.version);

    let contents = update::rewrite(shipped, None, &Credentials::new("alice", "pw"))?;
    let rewritten = config::parse(&contents)?;
    assert_eq!(rewritten.credentials(), Credentials::new("alice", "pw"));
    assert_eq!(rewritten.ignored_commands, parsed.ignored_commands);

    Ok(())
}
