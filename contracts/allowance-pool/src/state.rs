use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, StdResult, Storage, Uint128};
use cw_storage_plus::{Item, Map};
use shared::{remaining_under_cap, Window};

#[cw_serde]
pub struct Config {
    /// The only principal allowed to fund the pool and manage beneficiaries
    pub grantor: Addr,
    /// CW20 token holding the pool
    pub token: Addr,
    /// Length of every accounting window (seconds)
    pub window_seconds: u64,
}

#[cw_serde]
pub struct AllowanceRecord {
    /// Cap replenished every window
    pub quota_per_period: Uint128,
    /// Claimed so far in the current window (may exceed a lowered quota)
    pub spent_this_period: Uint128,
    /// Start of the current window (seconds)
    pub window_start: u64,
    /// Enrolled flag; revoked records are removed, not deactivated
    pub active: bool,
}

impl AllowanceRecord {
    pub fn new(quota_per_period: Uint128, now: u64) -> Self {
        AllowanceRecord {
            quota_per_period,
            spent_this_period: Uint128::zero(),
            window_start: now,
            active: true,
        }
    }

    pub fn window(&self, window_seconds: u64) -> Window {
        Window::new(self.window_start, window_seconds)
    }

    /// Quota still claimable at `now`, as if an elapsed window had already
    /// rolled over. Does not mutate the record.
    pub fn remaining(&self, now: u64, window_seconds: u64) -> Uint128 {
        if !self.active {
            return Uint128::zero();
        }
        if self.window(window_seconds).is_elapsed(now) {
            return self.quota_per_period;
        }
        remaining_under_cap(self.quota_per_period, self.spent_this_period)
    }

    /// Starts a fresh window at `now` if the current one has elapsed.
    /// Returns whether a rollover happened. Idle windows are not banked.
    pub fn roll_over(&mut self, now: u64, window_seconds: u64) -> bool {
        if !self.window(window_seconds).is_elapsed(now) {
            return false;
        }
        self.window_start = now;
        self.spent_this_period = Uint128::zero();
        true
    }
}

/// Configuration storage
pub const CONFIG: Item<Config> = Item::new("config");

/// Allowance records indexed by beneficiary
pub const ALLOWANCES: Map<&Addr, AllowanceRecord> = Map::new("allowances");

/// Loads the caller's record, treating inactive records as absent.
pub fn load_active(
    storage: &dyn Storage,
    beneficiary: &Addr,
) -> StdResult<Option<AllowanceRecord>> {
    Ok(ALLOWANCES
        .may_load(storage, beneficiary)?
        .filter(|record| record.active))
}
