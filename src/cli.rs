use colored::Colorize;
use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};
use dialoguer::{Confirm, Input, Password};

use crate::{
    api::PortalClient,
    billing::Projection,
    config::{self, Configuration, LoadedConfig},
    guard::{IgnorePolicy, ProcessGuard, SystemProcessTable},
    session::{
        LoginFailure, LoginOutcome, LogoutOutcome, Question, SessionController, SessionSettings,
        StatusReport, UserPrompt,
    },
    update::{HttpRelease, SelfUpdater, UpdateOutcome},
    utils::{self, Hms},
};

pub fn init() -> Command {
    command!("njunet")
        .about("Log in to and out of the NJU campus network")
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Path to configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Set RUST_LOG to debug")
                .action(ArgAction::SetTrue)
                .value_parser(value_parser!(bool)),
        )
        .subcommand(init_login_subcommand())
        .subcommand(init_logout_subcommand())
        .subcommand(init_status_subcommand())
        .subcommand(init_update_subcommand())
        .subcommand(init_config_subcommand())
}

fn init_user_arg() -> Arg {
    Arg::new("user")
        .short('u')
        .long("user")
        .help("Only act if this is the account id in use")
        .value_parser(value_parser!(String))
}

fn controller(config: &Configuration) -> Result<SessionController<PortalClient, SystemProcessTable>> {
    let portal = PortalClient::new(config.request_timeout())?;
    let policy = IgnorePolicy::default().with_extra_commands(&config.ignored_commands);
    let guard = ProcessGuard::new(SystemProcessTable, policy);

    Ok(SessionController::new(
        portal,
        guard,
        SessionSettings::from(config),
    ))
}

pub fn init_login_subcommand() -> Command {
    Command::new("login")
        .about("Log in to the campus network")
        .arg(init_user_arg())
}

pub fn handle_login_subcommand(args: &ArgMatches, loaded: &LoadedConfig) -> Result<ExitCode> {
    let controller = controller(&loaded.config)?;
    let user = args.get_one::<String>("user").map(String::as_str);

    let outcome = controller.login(loaded.config.credentials(), user, &mut CliPrompt)?;
    let success = match outcome {
        LoginOutcome::AlreadyConnected(report) => {
            print_status(&report);
            true
        }
        LoginOutcome::LoggedIn(report) => {
            println!("{}", "Logged in to the campus network".green().bold());
            print_status(&report);
            true
        }
        LoginOutcome::IdentityMismatch { username, expected } => {
            println!(
                "{} account is {username} but --user asked for {expected}",
                "Error:".red().bold()
            );
            false
        }
        LoginOutcome::Declined => true,
        LoginOutcome::Failed(failure) => {
            let reason = match failure {
                LoginFailure::Transport => "portal unreachable".to_string(),
                LoginFailure::Rejected(status) => format!("portal answered HTTP {status}"),
                LoginFailure::NotActivated => "network still closed after login".to_string(),
            };
            println!("{} ({reason})", "Login failed".red().bold());
            false
        }
    };

    Ok(exit_code(success))
}

pub fn init_logout_subcommand() -> Command {
    Command::new("logout")
        .about("Log out of the campus network")
        .arg(init_user_arg())
}

pub fn handle_logout_subcommand(args: &ArgMatches, loaded: &LoadedConfig) -> Result<ExitCode> {
    let controller = controller(&loaded.config)?;
    let user = args.get_one::<String>("user").map(String::as_str);

    let outcome = controller.logout(&loaded.config.credentials(), user, &mut CliPrompt)?;
    let success = match outcome {
        LogoutOutcome::NotConnected | LogoutOutcome::Declined => true,
        LogoutOutcome::IdentityMismatch { active, expected } => {
            log::info!("Logged in as {}, not {expected}; leaving the session alone", active.user_id);
            true
        }
        LogoutOutcome::LoggedOut { user, .. } => {
            println!("{} account: {user}", "Logged out of the campus network".green().bold());
            true
        }
        LogoutOutcome::Failed { attempts, .. } => {
            println!(
                "{} after {attempts} attempts, try again or log out from a browser",
                "Logout failed".red().bold()
            );
            false
        }
    };

    Ok(exit_code(success))
}

pub fn init_status_subcommand() -> Command {
    Command::new("status")
        .visible_alias("s")
        .about("Show balance and usage of the logged in account")
}

pub fn handle_status_subcommand(_args: &ArgMatches, loaded: &LoadedConfig) -> Result<ExitCode> {
    let report = controller(&loaded.config)?.status();
    print_status(&report);

    Ok(exit_code(matches!(report, StatusReport::Billing { .. })))
}

pub fn init_update_subcommand() -> Command {
    Command::new("update").about("Update the configuration file from upstream")
}

pub fn handle_update_subcommand(_args: &ArgMatches, loaded: &LoadedConfig) -> Result<ExitCode> {
    println!("Fetching update...");
    let source = HttpRelease::new(&loaded.config.update_url, loaded.config.request_timeout())?;
    let outcome = SelfUpdater::new(source).run(loaded, &loaded.config.credentials())?;

    match outcome {
        UpdateOutcome::UpToDate { local, .. } => println!("Already up to date ({local})"),
        UpdateOutcome::Updated { from, to, path } => println!(
            "{} {from} -> {to}, written to {}",
            "Updated".green().bold(),
            path.display()
        ),
    }

    Ok(ExitCode::SUCCESS)
}

pub fn init_config_subcommand() -> Command {
    Command::new("config")
        .about("Operate on the user configuration")
        .subcommand_required(true)
        .subcommand(
            Command::new("writedefault").arg(
                Arg::new("path")
                    .short('p')
                    .long("path")
                    .value_parser(value_parser!(PathBuf))
                    .help("Write the default config"),
            ),
        )
}

pub fn handle_config_subcommand(args: &ArgMatches) -> Result<ExitCode> {
    if let Some(("writedefault", args)) = args.subcommand() {
        let path = match args.get_one::<PathBuf>("path") {
            Some(path) => path.to_owned(),
            None => config::default_path(),
        };

        utils::atomic_replace(&path, &Configuration::default().to_pretty_string()?)?;
        println!("Written default config to {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn exit_code(success: bool) -> ExitCode {
    match success {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}

fn print_status(report: &StatusReport) {
    let (user, status) = match report {
        StatusReport::Billing { user, billing } => (user, billing),
        StatusReport::UserInfoUnavailable => {
            println!(
                "{} online, but the portal returned no account info (unstable campus network, or not on it)",
                "Warning:".yellow().bold()
            );
            return;
        }
        StatusReport::UsageUnavailable { user } => {
            println!("Account: {user}");
            println!(
                "{} could not read usage time, check again later or in a browser",
                "Warning:".yellow().bold()
            );
            return;
        }
    };

    let balance = format!("{:.2} yuan", status.balance_yuan());
    let used = status.used().to_string();
    let consumed = format!("{:.2} yuan", status.monthly_consumed_yuan());
    let projection = match status.projection {
        Projection::Capped => "monthly cap reached, no further charges".to_string(),
        Projection::BalanceLimited { remaining_seconds } => format!(
            "balance runs out before the cap, {} left",
            Hms::from_seconds(remaining_seconds)
        ),
        Projection::Headroom { seconds_to_cap } => {
            format!("balance covers the cap, {} to go", Hms::from_seconds(seconds_to_cap))
        }
    };
    let account = user.to_string();

    StatusTable::new(vec![
        ("Account", account.as_str()),
        ("Balance", balance.as_str()),
        ("Used", used.as_str()),
        ("This month", consumed.as_str()),
        ("Projection", projection.as_str()),
    ])
    .print_lines()
}

struct CliPrompt;

impl UserPrompt for CliPrompt {
    fn username(&mut self) -> Result<String> {
        Ok(Input::<String>::new().with_prompt("Account").interact_text()?)
    }

    fn password(&mut self, username: &str) -> Result<String> {
        Ok(Password::new()
            .with_prompt(format!("Password for {username}"))
            .interact()?)
    }

    fn confirm(&mut self, question: &Question) -> Result<bool> {
        let prompt = match question {
            Question::OverrideUsername {
                configured,
                requested,
            } => format!("Configured account is {configured}, log in as {requested} instead?"),
            Question::LogoutAccount { active, configured } => {
                let notice = match configured {
                    Some(configured) => {
                        format!("logged in as {active}, not your configured {configured}")
                    }
                    None => format!("logged in as {active}"),
                };
                println!("{} {notice}", "Notice:".red().bold());
                "Log out this account?".to_string()
            }
            Question::ContinueDespiteConflicts(report) => {
                println!("Num   Command");
                for (command, count) in &report.tally {
                    println!("{count:>3}x  {command}");
                }
                "\nThe processes above are running, log out anyway?".to_string()
            }
        };

        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}

pub struct StatusLine {
    key: String,
    value: String,
}

pub struct StatusTable {
    pub lines: Vec<StatusLine>,
}

impl StatusTable {
    pub fn new(values: Vec<(&str, &str)>) -> Self {
        Self {
            lines: values
                .into_iter()
                .map(|(key, value)| StatusLine {
                    key: key.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    pub fn print_lines(&self) {
        let max_len = self
            .lines
            .iter()
            .map(|line| line.key.len())
            .max()
            .unwrap_or_default();

        for line in &self.lines {
            let padding = " ".repeat(max_len - line.key.len() + 1);
            println!("{padding}{}: {}", line.key.magenta(), line.value)
        }
    }
}
