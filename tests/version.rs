use anyhow::Result;
use njunet_rs::version::VersionTag;

fn tag(s: &str) -> VersionTag {
    s.parse().expect("valid version")
}

#[test]
fn test_newer_predicate() {
    assert!(tag("0.2.0").is_newer_than(&tag("0.1.9")));
    assert!(tag("1.0.0").is_newer_than(&tag("0.9.9")));
    assert!(tag("0.1.1").is_newer_than(&tag("0.1.0")));

    assert!(!tag("0.1.0").is_newer_than(&tag("0.1.0")));
    assert!(!tag("0.1.9").is_newer_than(&tag("0.2.0")));
}

#[test]
fn test_first_differing_field_decides() {
    assert!(!tag("0.1.10").is_newer_than(&tag("0.2.0")));
    assert!(tag("0.2.0").is_newer_than(&tag("0.1.10")));
    assert!(!tag("1.0.5").is_newer_than(&tag("2.0.0")));
}

#[test]
fn test_parse_and_display() -> Result<()> {
    let version = "0.12.3".parse::<VersionTag>()?;
    assert_eq!(version, VersionTag::new(0, 12, 3));
    assert_eq!(version.to_string(), "0.12.3");

    assert!("0.1".parse::<VersionTag>().is_err());
    assert!("0.1.x".parse::<VersionTag>().is_err());
    assert!("1.2.3.4".parse::<VersionTag>().is_err());

    Ok(())
}

#[test]
fn test_find_in_text() {
    assert_eq!(
        VersionTag::find(r#"    version: "0.3.1","#),
        Some(VersionTag::new(0, 3, 1))
    );
    assert_eq!(VersionTag::find("no version here"), None);
}
