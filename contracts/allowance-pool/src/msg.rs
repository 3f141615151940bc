use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Uint128};
use shared::Window;

#[cw_serde]
pub struct InstantiateMsg {
    /// Principal that funds the pool and manages beneficiaries
    pub grantor: String,
    /// CW20 token contract holding the pool
    pub token: String,
    /// Length of the recurring allowance window (seconds)
    pub window_seconds: u64,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Pull `amount` from the grantor into the pool (grantor, needs a CW20 allowance)
    Fund { amount: Uint128 },
    /// Create or update a beneficiary's per-window quota (grantor)
    Configure {
        beneficiary: String,
        quota_per_period: Uint128,
    },
    /// Remove a beneficiary and its spend history (grantor)
    Revoke { beneficiary: String },
    /// Withdraw from the caller's own allowance
    Claim { amount: Uint128 },
}

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Grantor, token and window length
    #[returns(ConfigResponse)]
    Config {},

    /// Amount the beneficiary could claim right now
    #[returns(RemainingQuotaResponse)]
    RemainingQuota { beneficiary: String },

    /// Stored allowance record with its current window
    #[returns(AllowanceResponse)]
    Allowance { beneficiary: String },

    /// All beneficiaries, ascending by address
    #[returns(BeneficiariesResponse)]
    Beneficiaries {
        start_after: Option<String>,
        limit: Option<u32>,
    },

    /// Pool balance and what the grantor still allows the contract to pull
    #[returns(PoolResponse)]
    Pool {},
}

// Response types

#[cw_serde]
pub struct ConfigResponse {
    pub grantor: Addr,
    pub token: Addr,
    pub window_seconds: u64,
}

#[cw_serde]
pub struct RemainingQuotaResponse {
    pub beneficiary: Addr,
    pub remaining: Uint128,
}

#[cw_serde]
pub struct AllowanceResponse {
    pub beneficiary: Addr,
    pub quota_per_period: Uint128,
    pub spent_this_period: Uint128,
    pub window: Window,
    /// True when the next claim will start a new window
    pub window_elapsed: bool,
    /// Seconds until the current window closes, zero once elapsed
    pub seconds_remaining: u64,
    pub remaining: Uint128,
}

#[cw_serde]
pub struct BeneficiariesResponse {
    pub beneficiaries: Vec<AllowanceResponse>,
}

#[cw_serde]
pub struct PoolResponse {
    pub token: Addr,
    pub balance: Uint128,
    pub grantor_allowance: Uint128,
}
