//! Error types for the Hardcap sale.
use thiserror::Error;

use crate::types::{Address, Amount, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("sale opens at {opens_at}, now {now}")] NotOpenYet { opens_at: Timestamp, now: Timestamp },
    #[error("sale closed at {closed_at}, now {now}")] Closed { closed_at: Timestamp, now: Timestamp },
    #[error("assignment opens at {opens_at}, now {now}")] AssignmentNotOpen { opens_at: Timestamp, now: Timestamp },
    #[error("sale already finalized")] Finalized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("zero amount")] ZeroAmount,
    #[error("purchase below minimum: {got} < {min}")] BelowMinimum { got: Amount, min: Amount },
    #[error("batch size mismatch: {recipients} recipients, {amounts} amounts")] LengthMismatch { recipients: usize, amounts: usize },
    #[error("batch exceeds capacity: requested {requested}, remaining {remaining}")] BatchExceedsCapacity { requested: Amount, remaining: Amount },
    #[error("allocation exceeds cap: {total} > {cap}")] ExceedsCap { total: Amount, cap: Amount },
    #[error("sold out")] SoldOut,
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("{0} is not the assigner")] NotAssigner(Address),
    #[error("{0} is not the operator")] NotOperator(Address),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("reserve holder already set")] ReserveHolderAlreadySet,
    #[error("reserve holder not set")] ReserveHolderNotSet,
    #[error("already finalized")] AlreadyFinalized,
    #[error("not finalizable before {closing_time} unless sold out, now {now}")] NotFinalizable { closing_time: Timestamp, now: Timestamp },
    #[error("snapshot inconsistent: {0}")] InconsistentSnapshot(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("minting finished")] MintingFinished,
    #[error("minting already finished")] AlreadyFinished,
    #[error("transfers disabled until minting finishes")] TransfersDisabled,
    #[error("{caller} is not the ledger owner")] NotOwner { caller: Address },
    #[error("insufficient balance for {holder}: have {have}, need {need}")] InsufficientBalance { holder: Address, have: Amount, need: Amount },
    #[error("mint ceiling exceeded: {supply} > {ceiling}")] CeilingExceeded { supply: Amount, ceiling: Amount },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rate table is empty")] EmptyRateTable,
    #[error("tier {index}: threshold not above previous")] ThresholdsNotIncreasing { index: usize },
    #[error("tier {index}: rate not below previous")] RatesNotDecreasing { index: usize },
    #[error("tier {index}: zero rate")] ZeroRate { index: usize },
    #[error("invalid schedule: {0}")] InvalidSchedule(String),
    #[error("invalid weights: team {team_bps} + platform {platform_bps} bps")] InvalidWeights { team_bps: u64, platform_bps: u64 },
    #[error("{0} address is zero")] ZeroAddress(&'static str),
    #[error("arithmetic overflow in {0}")] Overflow(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {0} bytes")] InvalidLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    #[error(transparent)] Window(#[from] WindowError),
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] Authorization(#[from] AuthorizationError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Config(#[from] ConfigError),
}
