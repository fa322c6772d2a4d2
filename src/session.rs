//! Login and logout against the captive portal.
//!
//! Connectivity is never remembered: every decision starts from a fresh probe
//! and the portal's own view of who is logged in.

use anyhow::Result;
use std::{thread, time::Duration};

use crate::{
    api::{Credentials, Portal, UserInfo},
    billing::{self, BillingStatus},
    config::Configuration,
    guard::{ConflictReport, ProcessGuard, ProcessTable},
};

pub const LOGOUT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Pause between a successful login POST and the confirming probe.
    pub settle_delay: Duration,
    pub logout_retry_delay: Duration,
}

impl From<&Configuration> for SessionSettings {
    fn from(config: &Configuration) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            logout_retry_delay: config.logout_retry_delay(),
        }
    }
}

/// Yes/no decisions the controller hands to the user.
#[derive(Debug)]
pub enum Question<'a> {
    /// `--user` disagrees with the configured username.
    OverrideUsername {
        configured: &'a str,
        requested: &'a str,
    },
    /// The portal reports an account that is not (known to be) ours.
    LogoutAccount {
        active: &'a UserInfo,
        configured: Option<&'a str>,
    },
    ContinueDespiteConflicts(&'a ConflictReport),
}

pub trait UserPrompt {
    fn username(&mut self) -> Result<String>;
    fn password(&mut self, username: &str) -> Result<String>;
    /// Anything but an explicit yes counts as no.
    fn confirm(&mut self, question: &Question) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Billing {
        user: UserInfo,
        billing: BillingStatus,
    },
    /// Online, but the portal did not say who we are.
    UserInfoUnavailable,
    UsageUnavailable {
        user: UserInfo,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    Transport,
    Rejected(u16),
    /// The portal accepted the POST but the network stayed closed.
    NotActivated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyConnected(StatusReport),
    LoggedIn(StatusReport),
    IdentityMismatch { username: String, expected: String },
    Declined,
    Failed(LoginFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// Nobody is logged in as far as the portal can tell.
    NotConnected,
    /// `--user` named someone else, nothing was done.
    IdentityMismatch { active: UserInfo, expected: String },
    Declined,
    LoggedOut { user: UserInfo, attempts: usize },
    Failed { user: UserInfo, attempts: usize },
}

pub struct SessionController<P: Portal, T: ProcessTable> {
    portal: P,
    guard: ProcessGuard<T>,
    settings: SessionSettings,
}

impl<P: Portal, T: ProcessTable> SessionController<P, T> {
    pub fn new(portal: P, guard: ProcessGuard<T>, settings: SessionSettings) -> Self {
        Self {
            portal,
            guard,
            settings,
        }
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn state(&self) -> SessionState {
        match self.portal.probe_connectivity() {
            true => SessionState::Connected,
            false => SessionState::Disconnected,
        }
    }

    pub fn status(&self) -> StatusReport {
        let user = match self.portal.fetch_user_info() {
            Some(user) => user,
            None => return StatusReport::UserInfoUnavailable,
        };

        match self.portal.fetch_usage_info() {
            Some(usage) => StatusReport::Billing {
                billing: billing::status(&user, &usage),
                user,
            },
            None => StatusReport::UsageUnavailable { user },
        }
    }

    pub fn login(
        &self,
        mut credentials: Credentials,
        identity_check: Option<&str>,
        prompt: &mut impl UserPrompt,
    ) -> Result<LoginOutcome> {
        if self.state() == SessionState::Connected {
            log::debug!("Already connected, reporting status");
            return Ok(LoginOutcome::AlreadyConnected(self.status()));
        }

        let configured = credentials.username().map(str::to_owned);
        match (configured.as_deref(), identity_check) {
            (None, _) => {
                credentials.username = prompt.username()?;
                if let Some(expected) = identity_check {
                    if expected != credentials.username {
                        return Ok(LoginOutcome::IdentityMismatch {
                            username: credentials.username,
                            expected: expected.into(),
                        });
                    }
                }
            }
            (Some(configured), Some(requested)) if configured != requested => {
                let question = Question::OverrideUsername {
                    configured,
                    requested,
                };
                if !prompt.confirm(&question)? {
                    return Ok(LoginOutcome::Declined);
                }

                // The stored password belongs to the configured account
                credentials.username = requested.into();
                credentials.clear_password();
            }
            _ => {}
        }

        if !credentials.has_password() {
            credentials.password = prompt.password(&credentials.username)?;
        }

        log::info!("Logging in as {}", credentials.username);
        let status = match self.portal.submit_login(&credentials) {
            Some(status) => status,
            None => return Ok(LoginOutcome::Failed(LoginFailure::Transport)),
        };

        if status != 200 {
            log::debug!("Login rejected with HTTP {status}");
            return Ok(LoginOutcome::Failed(LoginFailure::Rejected(status)));
        }

        thread::sleep(self.settings.settle_delay);

        match self.state() {
            SessionState::Connected => Ok(LoginOutcome::LoggedIn(self.status())),
            SessionState::Disconnected => Ok(LoginOutcome::Failed(LoginFailure::NotActivated)),
        }
    }

    pub fn logout(
        &self,
        credentials: &Credentials,
        identity_check: Option<&str>,
        prompt: &mut impl UserPrompt,
    ) -> Result<LogoutOutcome> {
        let active = match self.portal.fetch_user_info() {
            Some(user) => user,
            None => {
                log::debug!("No user info from portal, treating as disconnected");
                return Ok(LogoutOutcome::NotConnected);
            }
        };

        let proceed = match identity_check {
            Some(expected) if expected == active.user_id => true,
            Some(expected) => {
                return Ok(LogoutOutcome::IdentityMismatch {
                    expected: expected.into(),
                    active,
                })
            }
            None => match credentials.username() {
                Some(configured) if configured == active.user_id => true,
                configured => prompt.confirm(&Question::LogoutAccount {
                    active: &active,
                    configured,
                })?,
            },
        };

        if !proceed {
            return Ok(LogoutOutcome::Declined);
        }

        let conflicts = match self.guard.scan() {
            Ok(report) => report,
            Err(err) => {
                log::warn!("Unable to inspect running processes: {err}");
                ConflictReport::default()
            }
        };

        if conflicts.has_conflicts()
            && !prompt.confirm(&Question::ContinueDespiteConflicts(&conflicts))?
        {
            return Ok(LogoutOutcome::Declined);
        }

        for attempt in 1..=LOGOUT_ATTEMPTS {
            log::debug!("Logout attempt {attempt}/{LOGOUT_ATTEMPTS}");
            self.portal.submit_logout();

            if self.state() == SessionState::Disconnected {
                return Ok(LogoutOutcome::LoggedOut {
                    user: active,
                    attempts: attempt,
                });
            }

            if attempt < LOGOUT_ATTEMPTS {
                thread::sleep(self.settings.logout_retry_delay);
            }
        }

        Ok(LogoutOutcome::Failed {
            user: active,
            attempts: LOGOUT_ATTEMPTS,
        })
    }
}
