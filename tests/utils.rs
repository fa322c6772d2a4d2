use anyhow::Result;
use njunet_rs::utils;
use std::fs;

#[test]
fn test_atomic_replace_writes_and_overwrites() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("njunet.ron");

    utils::atomic_replace(&path, "first")?;
    utils::atomic_replace(&path, "second")?;

    assert_eq!(fs::read_to_string(&path)?, "second");
    assert!(!dir.path().join("nested").join("njunet.ron.tmp").exists());

    Ok(())
}

#[test]
fn test_failed_rename_leaves_target_and_no_temp_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("njunet.ron");
    fs::create_dir(&target)?;
    fs::write(target.join("keep"), "live")?;

    assert!(utils::atomic_replace(&target, "replacement").is_err());

    assert!(target.is_dir());
    assert_eq!(fs::read_to_string(target.join("keep"))?, "live");
    assert!(!dir.path().join("njunet.ron.tmp").exists());

    Ok(())
}

#[test]
fn test_stale_temp_file_is_cleared() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("njunet.ron");
    fs::write(dir.path().join("njunet.ron.tmp"), "interrupted")?;

    utils::atomic_replace(&path, "fresh")?;

    assert_eq!(fs::read_to_string(&path)?, "fresh");
    assert!(!dir.path().join("njunet.ron.tmp").exists());

    Ok(())
}
