//! Settlement planning: turning balances into suggested payments.
//!
//! Two plans are available:
//!
//! - [`compute_settlement_transfers`] nets everybody against everybody with
//!   a greedy largest-creditor/largest-debtor matching. It needs at most
//!   `n - 1` transfers for `n` non-zero balances.
//! - [`compute_direct_transfers`] keeps debts between the people who
//!   actually shared an expense, netting only within each pair.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BinaryHeap},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{
    Balances, EngineError, Expense, Member, Money, ResultEngine, balances::compute_balances,
    split::compute_split,
};

/// A suggested payment of `amount` from `from` to `to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementTransfer {
    pub from: Member,
    pub to: Member,
    pub amount: Money,
}

impl SettlementTransfer {
    #[must_use]
    pub fn new(from: Member, to: Member, amount: Money) -> Self {
        Self { from, to, amount }
    }
}

/// Balances handed to the optimizer did not sum to zero.
///
/// The residual was removed from `absorbed_by`, the member with the largest
/// balance magnitude, so the plan could still be built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceDriftWarning {
    pub residual: Money,
    pub absorbed_by: Member,
}

impl fmt::Display for BalanceDriftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "balances were off by {}, corrected on {}",
            self.residual, self.absorbed_by
        )
    }
}

/// A transfer plan, plus the drift correction applied to build it, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    pub transfers: Vec<SettlementTransfer>,
    pub drift: Option<BalanceDriftWarning>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStrategy {
    /// Greedy netting across the whole group.
    Simplified,
    /// Pairwise netting between members who shared expenses.
    Direct,
    /// Simplified, unless the direct plan is strictly shorter.
    #[default]
    Auto,
}

impl SettlementStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simplified => "simplified",
            Self::Direct => "direct",
            Self::Auto => "auto",
        }
    }
}

impl TryFrom<&str> for SettlementStrategy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simplified" => Ok(Self::Simplified),
            "direct" => Ok(Self::Direct),
            "auto" => Ok(Self::Auto),
            other => Err(EngineError::KeyNotFound(format!("settlement strategy {other}"))),
        }
    }
}

/// Heap entry: largest magnitude first, then smallest member id.
#[derive(Debug, PartialEq, Eq)]
struct Position {
    magnitude: Money,
    member: Member,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude
            .cmp(&other.magnitude)
            .then_with(|| other.member.cmp(&self.member))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Builds a transfer plan that brings every balance to zero.
///
/// Creditors and debtors are matched largest-first (ties broken by member
/// id); each step moves `min(credit, |debt|)` and puts any remainder back.
///
/// If the balances do not sum to zero, the residual is taken off the
/// largest-magnitude balance first and reported as a
/// [`BalanceDriftWarning`]. Drift never makes settlement fail.
#[must_use]
pub fn compute_settlement_transfers(balances: &Balances) -> Settlement {
    let mut amounts: Vec<(Member, Money)> = balances
        .iter()
        .map(|(member, amount)| (member.clone(), amount))
        .collect();

    let residual = balances.total();
    let drift = if residual.is_zero() {
        None
    } else {
        absorb_residual(&mut amounts, residual)
    };

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (member, amount) in amounts {
        if amount.is_positive() {
            creditors.push(Position {
                magnitude: amount,
                member,
            });
        } else if amount.is_negative() {
            debtors.push(Position {
                magnitude: amount.abs(),
                member,
            });
        }
    }

    let mut transfers = Vec::new();
    while let (Some(creditor), Some(debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.magnitude.min(debtor.magnitude);
        transfers.push(SettlementTransfer::new(
            debtor.member.clone(),
            creditor.member.clone(),
            amount,
        ));
        if creditor.magnitude > amount {
            creditors.push(Position {
                magnitude: creditor.magnitude - amount,
                member: creditor.member,
            });
        }
        if debtor.magnitude > amount {
            debtors.push(Position {
                magnitude: debtor.magnitude - amount,
                member: debtor.member,
            });
        }
    }

    Settlement { transfers, drift }
}

fn absorb_residual(
    amounts: &mut [(Member, Money)],
    residual: Money,
) -> Option<BalanceDriftWarning> {
    let (member, amount) = amounts.iter_mut().max_by(|(ma, a), (mb, b)| {
        a.abs().cmp(&b.abs()).then_with(|| mb.cmp(ma))
    })?;
    *amount = amount.saturating_sub(residual);
    tracing::warn!(%residual, member = %member, "balances drifted from zero, correcting");
    Some(BalanceDriftWarning {
        residual,
        absorbed_by: member.clone(),
    })
}

/// Nets debts pair by pair: for every unsettled expense each participant
/// owes the payer their share, and opposite debts between the same two
/// members cancel out. Returns one transfer per pair with a non-zero net,
/// ordered by `(from, to)`.
pub fn compute_direct_transfers(
    expenses: &[Expense],
    members: &[Member],
) -> ResultEngine<Vec<SettlementTransfer>> {
    // Keyed (lo, hi) by member id; positive means lo owes hi.
    let mut pairs: BTreeMap<(Member, Member), Money> = BTreeMap::new();
    for expense in expenses.iter().filter(|e| !e.settled) {
        let split = compute_split(expense, members)?;
        for (member, position) in split.iter() {
            if member == &expense.payer || !position.is_negative() {
                continue;
            }
            let owed = position.abs();
            let (key, signed) = if member < &expense.payer {
                ((member.clone(), expense.payer.clone()), owed)
            } else {
                ((expense.payer.clone(), member.clone()), -owed)
            };
            let net = pairs.entry(key).or_default();
            *net = net
                .checked_add(signed)
                .ok_or_else(|| EngineError::overflow(&expense.id))?;
        }
    }

    let mut transfers: Vec<SettlementTransfer> = pairs
        .into_iter()
        .filter(|(_, net)| !net.is_zero())
        .map(|((lo, hi), net)| {
            if net.is_positive() {
                SettlementTransfer::new(lo, hi, net)
            } else {
                SettlementTransfer::new(hi, lo, net.abs())
            }
        })
        .collect();
    transfers.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
    Ok(transfers)
}

/// Computes balances and a settlement plan for `expenses` with the chosen
/// strategy.
pub fn plan_settlement(
    expenses: &[Expense],
    members: &[Member],
    strategy: SettlementStrategy,
) -> ResultEngine<Settlement> {
    let balances = compute_balances(expenses, members)?;
    let plan = match strategy {
        SettlementStrategy::Simplified => compute_settlement_transfers(&balances),
        SettlementStrategy::Direct => Settlement {
            transfers: compute_direct_transfers(expenses, members)?,
            drift: None,
        },
        SettlementStrategy::Auto => {
            let simplified = compute_settlement_transfers(&balances);
            let direct = compute_direct_transfers(expenses, members)?;
            if direct.len() < simplified.transfers.len() {
                Settlement {
                    transfers: direct,
                    drift: None,
                }
            } else {
                simplified
            }
        }
    };
    tracing::debug!(?strategy, transfers = plan.transfers.len(), "settlement planned");
    Ok(plan)
}

/// Returns the balances after every transfer is paid: the payer's balance
/// goes up, the receiver's goes down.
pub fn apply_transfers(
    balances: &Balances,
    transfers: &[SettlementTransfer],
) -> ResultEngine<Balances> {
    let mut result = balances.clone();
    for transfer in transfers {
        for member in [&transfer.from, &transfer.to] {
            if result.get(member).is_none() {
                return Err(EngineError::KeyNotFound(member.to_string()));
            }
        }
        let overflow = || {
            EngineError::InvalidAmount(format!(
                "transfer of {} from {} to {} overflows a balance",
                transfer.amount, transfer.from, transfer.to
            ))
        };
        result
            .checked_add(&transfer.from, transfer.amount)
            .ok_or_else(overflow)?;
        result
            .checked_add(&transfer.to, -transfer.amount)
            .ok_or_else(overflow)?;
    }
    Ok(result)
}

/// Marks every unsettled expense as settled, which clears all debts of the
/// group. Returns the ids of the expenses that changed, in input order.
pub fn settle_all(expenses: &mut [Expense]) -> Vec<String> {
    let settled: Vec<String> = expenses
        .iter_mut()
        .filter(|e| !e.settled)
        .map(|expense| {
            expense.settled = true;
            expense.id.clone()
        })
        .collect();
    tracing::info!(settled = settled.len(), "expenses marked as settled");
    settled
}
