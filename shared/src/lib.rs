//! Wheel core for ArbCasino: the weighted outcome generator, the daily spin
//! ledger and reward settlement. Pure, no I/O; persistence and token transfers
//! belong to the caller.

pub mod constants;
pub mod rate_limit;
pub mod reward_settlement;
pub mod shared_wheel_game;
pub mod spin_ledger;
pub mod token;
pub mod validation;

pub use ethers_core::types::{Address, U256};
pub use reward_settlement::{ClaimTarget, Settlement, SettlementError};
pub use shared_wheel_game::{SegmentName, SpinOutcome, WheelOutcomeGenerator, WheelTable};
pub use spin_ledger::{Clock, DailySpinLedger, SpinError, SpinReceipt, SystemClock, UserSpinState};
pub use token::{TokenBalances, TokenType};
