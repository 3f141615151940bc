use cosmwasm_std::{
    entry_point, to_json_binary, Addr, Api, Binary, Deps, DepsMut, Env, Event, MessageInfo,
    Order, Reply, Response, StdError, StdResult, Storage, SubMsg, SubMsgResult, Uint128, WasmMsg,
};
use cw2::{ensure_from_older_version, get_contract_version, set_contract_version};
use cw20::{
    AllowanceResponse as Cw20AllowanceResponse, BalanceResponse as Cw20BalanceResponse,
    Cw20ExecuteMsg, Cw20QueryMsg,
};
use cw_storage_plus::Bound;

use crate::error::ContractError;
use crate::msg::{
    AllowanceResponse, BeneficiariesResponse, ConfigResponse, ExecuteMsg, InstantiateMsg,
    MigrateMsg, PoolResponse, QueryMsg, RemainingQuotaResponse,
};
use crate::state::{load_active, AllowanceRecord, Config, ALLOWANCES, CONFIG};

const CONTRACT_NAME: &str = "crates.io:allowance-pool";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const FUND_REPLY_ID: u64 = 1;
pub const CLAIM_REPLY_ID: u64 = 2;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 30;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    let grantor = validate_config_addr(deps.api, "grantor", &msg.grantor)?;
    let token = validate_config_addr(deps.api, "token", &msg.token)?;
    if msg.window_seconds == 0 {
        return Err(ContractError::InvalidConfiguration {
            reason: "window_seconds must be greater than zero".to_string(),
        });
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let config = Config {
        grantor,
        token,
        window_seconds: msg.window_seconds,
    };
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("grantor", config.grantor)
        .add_attribute("token", config.token)
        .add_attribute("window_seconds", config.window_seconds.to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Fund { amount } => execute_fund(deps, env, info, amount),
        ExecuteMsg::Configure {
            beneficiary,
            quota_per_period,
        } => execute_configure(deps, env, info, beneficiary, quota_per_period),
        ExecuteMsg::Revoke { beneficiary } => execute_revoke(deps, info, beneficiary),
        ExecuteMsg::Claim { amount } => execute_claim(deps, env, info, amount),
    }
}

/// Fails with `Unauthorized` unless `sender` is the grantor.
pub fn assert_grantor(storage: &dyn Storage, sender: &Addr) -> Result<Config, ContractError> {
    let config = CONFIG.load(storage)?;
    if *sender != config.grantor {
        return Err(ContractError::Unauthorized {});
    }
    Ok(config)
}

pub fn execute_fund(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    amount: Uint128,
) -> Result<Response, ContractError> {
    let config = assert_grantor(deps.storage, &info.sender)?;

    if amount.is_zero() {
        return Err(ContractError::InvalidArgument {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    let pull = WasmMsg::Execute {
        contract_addr: config.token.to_string(),
        msg: to_json_binary(&Cw20ExecuteMsg::TransferFrom {
            owner: info.sender.to_string(),
            recipient: env.contract.address.to_string(),
            amount,
        })?,
        funds: vec![],
    };

    Ok(Response::new()
        .add_submessage(SubMsg::reply_on_error(pull, FUND_REPLY_ID))
        .add_event(
            Event::new("funded")
                .add_attribute("from", info.sender.as_str())
                .add_attribute("amount", amount),
        )
        .add_attribute("method", "fund")
        .add_attribute("grantor", info.sender)
        .add_attribute("amount", amount))
}

pub fn execute_configure(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    beneficiary: String,
    quota_per_period: Uint128,
) -> Result<Response, ContractError> {
    assert_grantor(deps.storage, &info.sender)?;
    let beneficiary_addr = validate_beneficiary(deps.api, &beneficiary)?;

    let record = match load_active(deps.storage, &beneficiary_addr)? {
        Some(mut record) => {
            record.quota_per_period = quota_per_period;
            record
        }
        None => AllowanceRecord::new(quota_per_period, env.block.time.seconds()),
    };
    ALLOWANCES.save(deps.storage, &beneficiary_addr, &record)?;

    Ok(Response::new()
        .add_event(
            Event::new("allowance_configured")
                .add_attribute("beneficiary", beneficiary_addr.as_str())
                .add_attribute("quota", quota_per_period),
        )
        .add_attribute("method", "configure")
        .add_attribute("beneficiary", beneficiary_addr)
        .add_attribute("quota_per_period", quota_per_period)
        .add_attribute("window_start", record.window_start.to_string()))
}

pub fn execute_revoke(
    deps: DepsMut,
    info: MessageInfo,
    beneficiary: String,
) -> Result<Response, ContractError> {
    assert_grantor(deps.storage, &info.sender)?;
    let beneficiary_addr = validate_beneficiary(deps.api, &beneficiary)?;

    if load_active(deps.storage, &beneficiary_addr)?.is_none() {
        return Err(ContractError::NotFound { beneficiary });
    }
    ALLOWANCES.remove(deps.storage, &beneficiary_addr);

    Ok(Response::new()
        .add_event(Event::new("revoked").add_attribute("beneficiary", beneficiary_addr.as_str()))
        .add_attribute("method", "revoke")
        .add_attribute("beneficiary", beneficiary_addr))
}

/// Pays `amount` out of the caller's own allowance.
///
/// The debit is saved before the token transfer is handed to the host, and
/// the transfer is the only message in the response, so anything the token
/// triggers on the way back in sees the reduced quota. A failed transfer
/// surfaces through `reply` and reverts the debit with the rest of the
/// transaction.
pub fn execute_claim(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    amount: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let now = env.block.time.seconds();

    let mut record =
        load_active(deps.storage, &info.sender)?.ok_or_else(|| ContractError::NotFound {
            beneficiary: info.sender.to_string(),
        })?;

    if amount.is_zero() {
        return Err(ContractError::InvalidArgument {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    if record.roll_over(now, config.window_seconds) {
        deps.api
            .debug(&format!("allowance-pool: new window for {} at {}", info.sender, now));
    }

    let available = record.remaining(now, config.window_seconds);
    if amount > available {
        return Err(ContractError::ExceedsAllowance {
            requested: amount,
            available,
        });
    }

    record.spent_this_period = record.spent_this_period.checked_add(amount)?;
    ALLOWANCES.save(deps.storage, &info.sender, &record)?;

    let payout = WasmMsg::Execute {
        contract_addr: config.token.to_string(),
        msg: to_json_binary(&Cw20ExecuteMsg::Transfer {
            recipient: info.sender.to_string(),
            amount,
        })?,
        funds: vec![],
    };

    Ok(Response::new()
        .add_event(
            Event::new("claimed")
                .add_attribute("beneficiary", info.sender.as_str())
                .add_attribute("amount", amount),
        )
        .add_attribute("method", "claim")
        .add_attribute("beneficiary", info.sender)
        .add_attribute("amount", amount)
        .add_attribute("remaining", available.checked_sub(amount)?)
        .add_submessage(SubMsg::reply_on_error(payout, CLAIM_REPLY_ID)))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(_deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    match (msg.id, msg.result) {
        (FUND_REPLY_ID, SubMsgResult::Err(err)) => Err(ContractError::TransferFailed {
            reason: format!("pulling funds from grantor: {err}"),
        }),
        (CLAIM_REPLY_ID, SubMsgResult::Err(err)) => Err(ContractError::TransferFailed {
            reason: format!("paying out claim: {err}"),
        }),
        (FUND_REPLY_ID | CLAIM_REPLY_ID, SubMsgResult::Ok(_)) => Ok(Response::new()),
        (id, _) => Err(ContractError::UnknownReplyId { id }),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let stored = get_contract_version(deps.storage)?;
    ensure_from_older_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION).map_err(|err| {
        ContractError::InvalidMigration {
            reason: err.to_string(),
        }
    })?;

    Ok(Response::new()
        .add_attribute("method", "migrate")
        .add_attribute("from_version", stored.version)
        .add_attribute("to_version", CONTRACT_VERSION))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::RemainingQuota { beneficiary } => {
            to_json_binary(&query_remaining_quota(deps, env, beneficiary)?)
        }
        QueryMsg::Allowance { beneficiary } => {
            to_json_binary(&query_allowance(deps, env, beneficiary)?)
        }
        QueryMsg::Beneficiaries { start_after, limit } => {
            to_json_binary(&query_beneficiaries(deps, env, start_after, limit)?)
        }
        QueryMsg::Pool {} => to_json_binary(&query_pool(deps, env)?),
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        grantor: config.grantor,
        token: config.token,
        window_seconds: config.window_seconds,
    })
}

fn query_remaining_quota(
    deps: Deps,
    env: Env,
    beneficiary: String,
) -> StdResult<RemainingQuotaResponse> {
    let config = CONFIG.load(deps.storage)?;
    let beneficiary_addr = deps.api.addr_validate(&beneficiary)?;

    let remaining = load_active(deps.storage, &beneficiary_addr)?
        .map(|record| record.remaining(env.block.time.seconds(), config.window_seconds))
        .unwrap_or_default();

    Ok(RemainingQuotaResponse {
        beneficiary: beneficiary_addr,
        remaining,
    })
}

fn query_allowance(deps: Deps, env: Env, beneficiary: String) -> StdResult<AllowanceResponse> {
    let config = CONFIG.load(deps.storage)?;
    let beneficiary_addr = deps.api.addr_validate(&beneficiary)?;

    let record = load_active(deps.storage, &beneficiary_addr)?
        .ok_or_else(|| StdError::not_found(format!("allowance for {beneficiary}")))?;

    Ok(allowance_to_response(
        beneficiary_addr,
        &record,
        env.block.time.seconds(),
        config.window_seconds,
    ))
}

fn query_beneficiaries(
    deps: Deps,
    env: Env,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<BeneficiariesResponse> {
    let config = CONFIG.load(deps.storage)?;
    let now = env.block.time.seconds();
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;

    let start_addr = start_after
        .map(|addr| deps.api.addr_validate(&addr))
        .transpose()?;
    let min = start_addr.as_ref().map(|addr| Bound::exclusive(addr));

    let beneficiaries = ALLOWANCES
        .range(deps.storage, min, None, Order::Ascending)
        .filter(|item| !matches!(item, Ok((_, record)) if !record.active))
        .take(limit)
        .map(|item| {
            let (addr, record) = item?;
            Ok(allowance_to_response(addr, &record, now, config.window_seconds))
        })
        .collect::<StdResult<Vec<_>>>()?;

    Ok(BeneficiariesResponse { beneficiaries })
}

fn query_pool(deps: Deps, env: Env) -> StdResult<PoolResponse> {
    let config = CONFIG.load(deps.storage)?;

    let balance: Cw20BalanceResponse = deps.querier.query_wasm_smart(
        config.token.as_str(),
        &Cw20QueryMsg::Balance {
            address: env.contract.address.to_string(),
        },
    )?;
    let allowance: Cw20AllowanceResponse = deps.querier.query_wasm_smart(
        config.token.as_str(),
        &Cw20QueryMsg::Allowance {
            owner: config.grantor.to_string(),
            spender: env.contract.address.to_string(),
        },
    )?;

    Ok(PoolResponse {
        token: config.token,
        balance: balance.balance,
        grantor_allowance: allowance.allowance,
    })
}

fn allowance_to_response(
    beneficiary: Addr,
    record: &AllowanceRecord,
    now: u64,
    window_seconds: u64,
) -> AllowanceResponse {
    let window = record.window(window_seconds);
    AllowanceResponse {
        beneficiary,
        quota_per_period: record.quota_per_period,
        spent_this_period: record.spent_this_period,
        window,
        window_elapsed: window.is_elapsed(now),
        seconds_remaining: window.seconds_remaining(now),
        remaining: record.remaining(now, window_seconds),
    }
}

fn validate_config_addr(api: &dyn Api, field: &str, raw: &str) -> Result<Addr, ContractError> {
    if raw.trim().is_empty() {
        return Err(ContractError::InvalidConfiguration {
            reason: format!("{field} must be set"),
        });
    }
    api.addr_validate(raw)
        .map_err(|err| ContractError::InvalidConfiguration {
            reason: format!("{field}: {err}"),
        })
}

fn validate_beneficiary(api: &dyn Api, raw: &str) -> Result<Addr, ContractError> {
    if raw.trim().is_empty() {
        return Err(ContractError::InvalidArgument {
            reason: "beneficiary must be set".to_string(),
        });
    }
    api.addr_validate(raw)
        .map_err(|err| ContractError::InvalidArgument {
            reason: format!("beneficiary: {err}"),
        })
}
