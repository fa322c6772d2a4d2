use serde::Deserialize;

/// The portal wraps every selfservice answer in a `rows` array, the first row
/// being the record we asked for.
#[derive(Deserialize, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Rows<T> {
    #[serde(default)]
    pub rows: Vec<T>,
}

impl<T> Rows<T> {
    pub fn first(self) -> Option<T> {
        self.rows.into_iter().next()
    }
}

#[derive(Deserialize, Debug)]
pub struct UserInfoRow {
    #[serde(rename = "fullname")]
    pub full_name: String,

    #[serde(rename = "username")]
    pub user_id: String,

    // Tenths of a cent
    #[serde(rename = "account_balance")]
    pub account_balance: i64,
}

#[derive(Deserialize, Debug)]
pub struct VolumeRow {
    #[serde(rename = "total_time")]
    pub total_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub full_name: String,
    pub user_id: String,
    pub balance_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageInfo {
    pub total_used_seconds: i64,
}

impl From<UserInfoRow> for UserInfo {
    fn from(row: UserInfoRow) -> Self {
        Self {
            full_name: row.full_name,
            user_id: row.user_id,
            balance_cents: row.account_balance / 10,
        }
    }
}

impl From<VolumeRow> for UsageInfo {
    fn from(row: VolumeRow) -> Self {
        Self {
            total_used_seconds: row.total_time,
        }
    }
}

impl std::fmt::Display for UserInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.full_name, self.user_id)
    }
}

/// Credentials as resolved for a single invocation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub const USERNAME_PLACEHOLDER: &str = "xxxx";
pub const PASSWORD_PLACEHOLDER: &str = "****";

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn has_username(&self) -> bool {
        !(self.username.is_empty() || self.username == USERNAME_PLACEHOLDER)
    }

    pub fn has_password(&self) -> bool {
        !(self.password.is_empty() || self.password == PASSWORD_PLACEHOLDER)
    }

    /// The configured username, if it is neither empty nor the placeholder.
    pub fn username(&self) -> Option<&str> {
        self.has_username().then_some(self.username.as_str())
    }

    pub fn clear_password(&mut self) {
        self.password.clear();
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
