use anyhow::Result;
use njunet_rs::guard::{IgnorePolicy, ProcessGuard, ProcessRecord, ProcessTable};

struct FakeTable {
    user: &'static str,
    records: Vec<ProcessRecord>,
}

impl ProcessTable for FakeTable {
    fn current_user(&self) -> Result<String> {
        Ok(self.user.into())
    }

    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        Ok(self.records.clone())
    }
}

fn guard() -> ProcessGuard<FakeTable> {
    ProcessGuard::new(
        FakeTable {
            user: "alice",
            records: Vec::new(),
        },
        IgnorePolicy::default(),
    )
}

#[test]
fn test_editor_ignored_transfer_tallied() {
    let records = vec![
        ProcessRecord::new("alice", "vim", "notes.txt"),
        ProcessRecord::new("alice", "rsync", "backup"),
    ];

    let report = guard().evaluate("alice", &records);
    assert!(report.has_conflicts());
    assert_eq!(report.tally.len(), 1);
    assert_eq!(report.tally.get("rsync backup"), Some(&1));
}

#[test]
fn test_other_users_ignored() {
    let records = vec![
        ProcessRecord::new("bob", "rsync", "backup"),
        ProcessRecord::new("root", "/usr/sbin/cron", "-f"),
    ];

    let report = guard().evaluate("alice", &records);
    assert!(!report.has_conflicts());
}

#[test]
fn test_sessions_and_self_ignored() {
    let records = vec![
        ProcessRecord::new("alice", "-zsh", ""),
        ProcessRecord::new("alice", "/bin/bash", "--login"),
        ProcessRecord::new("alice", "/usr/lib/openssh/sftp-server", ""),
        ProcessRecord::new("alice", "sshd:", "alice@pts/0"),
        ProcessRecord::new("alice", "/usr/local/bin/njunet", "logout"),
        ProcessRecord::new("alice", "/usr/bin/vim", "njunet.ron"),
        ProcessRecord::new("alice", "ps", "aux"),
    ];

    let report = guard().evaluate("alice", &records);
    assert!(!report.has_conflicts(), "{:?}", report.tally);
}

#[test]
fn test_identical_command_lines_counted() {
    let records = vec![
        ProcessRecord::new("alice", "python", "train.py --epochs 10"),
        ProcessRecord::new("alice", "python", "train.py --epochs 10"),
        ProcessRecord::new("alice", "python", "serve.py"),
        ProcessRecord::new("alice", "aria2c", ""),
    ];

    let report = guard().evaluate("alice", &records);
    assert_eq!(report.tally.get("python train.py --epochs 10"), Some(&2));
    assert_eq!(report.tally.get("python serve.py"), Some(&1));
    assert_eq!(report.tally.get("aria2c"), Some(&1));
}

#[test]
fn test_extra_ignored_commands() {
    let policy = IgnorePolicy::default().with_extra_commands(&["tmux".to_string()]);
    let record = ProcessRecord::new("alice", "/usr/bin/tmux", "new -s work");

    assert!(policy.ignores(&record));
    assert!(!IgnorePolicy::default().ignores(&record));
}

#[test]
fn test_scan_uses_table_user() -> Result<()> {
    let guard = ProcessGuard::new(
        FakeTable {
            user: "alice",
            records: vec![
                ProcessRecord::new("alice", "wget", "https://example.com/big.iso"),
                ProcessRecord::new("bob", "curl", "https://example.com"),
            ],
        },
        IgnorePolicy::default(),
    );

    let report = guard.scan()?;
    assert_eq!(
        report.tally.keys().collect::<Vec<_>>(),
        vec!["wget https://example.com/big.iso"]
    );

    Ok(())
}

#[test]
fn test_command_name_and_line() {
    let record = ProcessRecord::new("alice", "/usr/bin/rsync", "-a src dst");
    assert_eq!(record.command_name(), "rsync");
    assert_eq!(record.command_line(), "/usr/bin/rsync -a src dst");

    let record = ProcessRecord::new("alice", "aria2c", "");
    assert_eq!(record.command_line(), "aria2c");
}
