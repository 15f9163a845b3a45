//! Shared-expense engine: splits expenses, aggregates member balances and
//! plans the transfers that settle a group.
//!
//! Everything here is a pure function over immutable inputs. Groups and
//! expenses come from an external store; splits, balances and settlement
//! plans are recomputed on every query and never persisted.
//!
//! ```rust
//! use engine::{Currency, Expense, Member, Money, compute_balances, compute_settlement_transfers};
//!
//! let members: Vec<Member> = ["a@x.com", "b@x.com", "c@x.com"]
//!     .iter()
//!     .map(|e| Member::new(e).unwrap())
//!     .collect();
//! let dinner = Expense::equal("e1", Money::new(90_00), Currency::Eur, members[0].clone());
//!
//! let balances = compute_balances(&[dinner], &members).unwrap();
//! assert_eq!(balances.get(&members[0]), Some(Money::new(60_00)));
//!
//! let plan = compute_settlement_transfers(&balances);
//! assert_eq!(plan.transfers.len(), 2);
//! ```

pub use access::{Capability, Role, Session};
pub use balances::{Balances, compute_balances};
pub use currency::Currency;
pub use error::EngineError;
pub use expense::{Expense, SplitMethod};
pub use group::{Group, MIN_GROUP_TEXT_LEN};
pub use member::Member;
pub use money::Money;
pub use settlement::{
    BalanceDriftWarning, Settlement, SettlementStrategy, SettlementTransfer, apply_transfers,
    compute_direct_transfers, compute_settlement_transfers, plan_settlement, settle_all,
};
pub use split::{Split, compute_split};

mod access;
mod balances;
mod currency;
mod error;
mod expense;
pub mod forms;
mod group;
mod member;
mod money;
mod settlement;
mod split;

pub type ResultEngine<T> = Result<T, EngineError>;
