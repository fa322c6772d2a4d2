//! Monthly tariff of the campus network.
//!
//! The first [`FREE_SECONDS`] of a month are free, every [`PRICE`] seconds after
//! that cost one cent, and nothing accrues past [`CAP_SECONDS`].

use crate::api::{UsageInfo, UserInfo};
use crate::utils::Hms;

/// Seconds of usage bought by one cent.
pub const PRICE: i64 = 180;
pub const FREE_SECONDS: i64 = 30 * 3600;
pub const CAP_SECONDS: i64 = 130 * 3600;

/// Where the account stands relative to the monthly cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The cap is reached, no further charges this month.
    Capped,
    /// The balance runs out before the cap; usable seconds left.
    BalanceLimited { remaining_seconds: i64 },
    /// The balance covers the rest of the month; seconds until the cap.
    Headroom { seconds_to_cap: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingStatus {
    pub balance_cents: i64,
    pub used_seconds: i64,
    pub monthly_consumed_cents: i64,
    pub projection: Projection,
}

impl BillingStatus {
    pub fn cap_reached(&self) -> bool {
        self.projection == Projection::Capped
    }

    pub fn used(&self) -> Hms {
        Hms::from_seconds(self.used_seconds)
    }

    pub fn balance_yuan(&self) -> f64 {
        cents_to_yuan(self.balance_cents)
    }

    pub fn monthly_consumed_yuan(&self) -> f64 {
        cents_to_yuan(self.monthly_consumed_cents)
    }
}

pub fn cents_to_yuan(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Charged seconds so far this month.
pub fn paid_seconds(total_used: i64) -> i64 {
    (total_used - FREE_SECONDS).clamp(0, CAP_SECONDS - FREE_SECONDS)
}

pub fn monthly_consumed_cents(total_used: i64) -> i64 {
    paid_seconds(total_used) / PRICE
}

pub fn compute(balance_cents: i64, total_used: i64) -> BillingStatus {
    BillingStatus {
        balance_cents,
        used_seconds: total_used,
        monthly_consumed_cents: monthly_consumed_cents(total_used),
        projection: project(balance_cents, total_used),
    }
}

/// `compute` from the two portal records.
pub fn status(user: &UserInfo, usage: &UsageInfo) -> BillingStatus {
    compute(user.balance_cents, usage.total_used_seconds)
}

fn project(balance_cents: i64, total_used: i64) -> Projection {
    // Sitting exactly on the cap counts as capped, there is nothing left to pay for.
    if total_used >= CAP_SECONDS {
        return Projection::Capped;
    }

    let time_left_to_cap = CAP_SECONDS - FREE_SECONDS.max(total_used);
    let cost_to_cap = time_left_to_cap / PRICE;

    if balance_cents <= cost_to_cap {
        Projection::BalanceLimited {
            remaining_seconds: balance_cents
                .saturating_mul(PRICE)
                .saturating_add((FREE_SECONDS - total_used).max(0))
                .max(0),
        }
    } else {
        Projection::Headroom {
            seconds_to_cap: time_left_to_cap,
        }
    }
}
