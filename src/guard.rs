//! Looks for the user's own background work that would break once the
//! network goes away.
//!
//! This is a heuristic for a yes/no prompt before logout, never a hard block.

use anyhow::Result;
use regex::RegexSet;
use std::{collections::BTreeMap, ffi::OsString, path::Path};
use sysinfo::{ProcessesToUpdate, System, Users};

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub owning_user: String,
    pub command: String,
    pub argument_tail: String,
}

impl ProcessRecord {
    pub fn new(owning_user: &str, command: &str, argument_tail: &str) -> Self {
        Self {
            owning_user: owning_user.into(),
            command: command.into(),
            argument_tail: argument_tail.into(),
        }
    }

    pub fn command_line(&self) -> String {
        match self.argument_tail.is_empty() {
            true => self.command.clone(),
            false => format!("{} {}", self.command, self.argument_tail),
        }
    }

    /// Final path component of the command, `/usr/bin/vim` -> `vim`.
    pub fn command_name(&self) -> &str {
        Path::new(&self.command)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.command)
    }

    fn first_argument(&self) -> &str {
        self.argument_tail.split_whitespace().next().unwrap_or_default()
    }
}

/// Source of process snapshots.
pub trait ProcessTable {
    /// Name of the user whose processes matter.
    fn current_user(&self) -> Result<String>;
    fn snapshot(&self) -> Result<Vec<ProcessRecord>>;
}

/// Process table of the running system.
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn current_user(&self) -> Result<String> {
        match users::get_current_username() {
            Some(name) => Ok(name.to_string_lossy().into_owned()),
            None => anyhow::bail!("Unable to resolve the current user name"),
        }
    }

    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All);
        let accounts = Users::new_with_refreshed_list();
        let own_pid = sysinfo::Pid::from_u32(std::process::id());

        let records = sys
            .processes()
            .iter()
            .filter(|(pid, _)| **pid != own_pid)
            .filter_map(|(_, process)| {
                let owner = process
                    .user_id()
                    .and_then(|uid| accounts.get_user_by_id(uid))
                    .map(|user| user.name().to_string())?;

                let mut argv = process.cmd().iter().map(lossy);
                let command = argv
                    .next()
                    .unwrap_or_else(|| process.name().to_string_lossy().into_owned());
                let argument_tail = argv.collect::<Vec<_>>().join(" ");

                Some(ProcessRecord {
                    owning_user: owner,
                    command,
                    argument_tail,
                })
            })
            .collect();

        Ok(records)
    }
}

fn lossy(arg: &OsString) -> String {
    arg.to_string_lossy().into_owned()
}

/// Which of the user's processes are not worth a warning.
#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    /// Exact command names: editors, process listing tools, ssh.
    pub commands: Vec<String>,
    /// Interactive shells and file transfer sessions.
    pub sessions: RegexSet,
    /// Invocations of this tool.
    pub own_invocation: RegexSet,
}

const IGNORED_COMMANDS: [&str; 10] = [
    "ssh", "sshd:", "sshd", "vim", "nvim", "emacs", "ps", "grep", "top", "njunet",
];
const SESSION_PATTERNS: [&str; 4] = ["zsh", "bash", "/sftp", "sftp-server"];
const OWN_INVOCATION_PATTERNS: [&str; 1] = ["njunet"];

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self {
            commands: IGNORED_COMMANDS.iter().map(|c| c.to_string()).collect(),
            sessions: RegexSet::new(SESSION_PATTERNS).expect("valid session patterns"),
            own_invocation: RegexSet::new(OWN_INVOCATION_PATTERNS)
                .expect("valid invocation patterns"),
        }
    }
}

impl IgnorePolicy {
    pub fn with_extra_commands(mut self, extra: &[String]) -> Self {
        self.commands.extend_from_slice(extra);
        self
    }

    pub fn ignores(&self, record: &ProcessRecord) -> bool {
        let name = record.command_name();
        if self
            .commands
            .iter()
            .any(|c| c == name || *c == record.command)
        {
            return true;
        }

        if self.sessions.is_match(&record.command) {
            return true;
        }

        self.own_invocation.is_match(name) || self.own_invocation.is_match(record.first_argument())
    }
}

/// Remaining command lines of the user and how often each runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub tally: BTreeMap<String, usize>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.tally.is_empty()
    }
}

pub struct ProcessGuard<T: ProcessTable> {
    table: T,
    policy: IgnorePolicy,
}

impl<T: ProcessTable> ProcessGuard<T> {
    pub fn new(table: T, policy: IgnorePolicy) -> Self {
        Self { table, policy }
    }

    pub fn scan(&self) -> Result<ConflictReport> {
        let user = self.table.current_user()?;
        let records = self.table.snapshot()?;
        Ok(self.evaluate(&user, &records))
    }

    /// Tallies `user`'s processes the policy does not ignore.
    pub fn evaluate(&self, user: &str, records: &[ProcessRecord]) -> ConflictReport {
        let mut tally = BTreeMap::new();

        for record in records.iter().filter(|r| r.owning_user == user) {
            if self.policy.ignores(record) {
                log::trace!("Ignoring process {}", record.command_line());
                continue;
            }

            *tally.entry(record.command_line()).or_insert(0) += 1;
        }

        log::debug!("{} conflicting command lines", tally.len());
        ConflictReport { tally }
    }
}
