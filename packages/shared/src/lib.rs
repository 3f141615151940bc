// Shared window and quota arithmetic for the allowance contracts

use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint128;

/// A fixed-length accounting window, in seconds since epoch.
#[cw_serde]
#[derive(Copy)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    /// Window beginning at `start` and lasting `length` seconds.
    /// A window whose end would overflow `u64` never elapses.
    pub fn new(start: u64, length: u64) -> Self {
        Window {
            start,
            end: start.saturating_add(length),
        }
    }

    pub fn is_elapsed(&self, now: u64) -> bool {
        now >= self.end
    }

    /// Seconds left until the window closes, zero once elapsed.
    pub fn seconds_remaining(&self, now: u64) -> u64 {
        self.end.saturating_sub(now)
    }
}

/// Unused part of `cap`, floored at zero when `used` overshoots it.
pub fn remaining_under_cap(cap: Uint128, used: Uint128) -> Uint128 {
    cap.saturating_sub(used)
}
