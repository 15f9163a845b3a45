//! Split computation for a single expense.
//!
//! A split maps every group member to a signed position: the payer is
//! credited the full amount, every participant is debited their share. The
//! positions of one expense always sum to exactly zero.

use std::collections::BTreeSet;

use crate::{EngineError, Expense, Member, Money, ResultEngine, SplitMethod};

/// Signed per-member positions for one expense, in group member order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    expense_id: String,
    entries: Vec<(Member, Money)>,
}

impl Split {
    #[must_use]
    pub fn expense_id(&self) -> &str {
        &self.expense_id
    }

    /// Position of `member`, or `None` if they are not in the group.
    #[must_use]
    pub fn get(&self, member: &Member) -> Option<Money> {
        self.entries
            .iter()
            .find_map(|(m, amount)| (m == member).then_some(*amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Member, Money)> {
        self.entries.iter().map(|(m, amount)| (m, *amount))
    }

    /// Sum of all positions; zero for every split the engine returns.
    #[must_use]
    pub fn total(&self) -> Money {
        Money::wide_sum(self.entries.iter().map(|(_, amount)| *amount))
    }

    fn position_mut(&mut self, member: &Member) -> Option<&mut Money> {
        self.entries
            .iter_mut()
            .find_map(|(m, amount)| (m == member).then_some(amount))
    }
}

/// Computes the signed split of `expense` over `members`.
///
/// - **Equal**: every included member owes `amount / n` truncated to minor
///   units. The remainder goes to the payer's share, or to the first
///   included member (group order) when the payer is excluded.
/// - **Exact**: every member owes their declared share. A gap within the
///   currency tolerance between the shares and the amount is absorbed by
///   the payer's own position.
///
/// Fails with [`EngineError::InvalidSplit`] when the expense cannot be split
/// as declared, and with [`EngineError::SplitIntegrity`] if the result would
/// not sum to zero.
pub fn compute_split(expense: &Expense, members: &[Member]) -> ResultEngine<Split> {
    let id = expense.id.as_str();
    if !expense.amount.is_positive() {
        return Err(EngineError::invalid_split(id, "amount must be greater than 0"));
    }
    if !members.contains(&expense.payer) {
        return Err(EngineError::invalid_split_for(
            id,
            &expense.payer,
            "payer is not a group member",
        ));
    }

    let mut split = Split {
        expense_id: id.to_string(),
        entries: members.iter().map(|m| (m.clone(), Money::ZERO)).collect(),
    };

    match &expense.method {
        SplitMethod::Equal { excluded } => split_equal(&mut split, expense, members, excluded)?,
        SplitMethod::Exact { shares } => {
            for (member, share) in shares {
                if !members.contains(member) {
                    return Err(EngineError::invalid_split_for(
                        id,
                        member,
                        "share assigned to a non-member",
                    ));
                }
                if share.is_negative() {
                    return Err(EngineError::invalid_split_for(
                        id,
                        member,
                        "share must not be negative",
                    ));
                }
            }
            let declared = Money::checked_sum(shares.values().copied())
                .ok_or_else(|| EngineError::overflow(id))?;
            if !declared.is_positive() {
                return Err(EngineError::invalid_split(
                    id,
                    "at least one member must carry a share",
                ));
            }
            let residual = expense.amount - declared;
            if residual.abs().minor() > expense.currency.split_tolerance() {
                return Err(EngineError::invalid_split(
                    id,
                    format!(
                        "total split ({}) must match expense amount ({})",
                        declared.format_in(expense.currency),
                        expense.amount.format_in(expense.currency)
                    ),
                ));
            }
            for (member, share) in shares {
                debit(&mut split, member, *share);
            }
            debit(&mut split, &expense.payer, residual);
        }
    }
    credit(&mut split, &expense.payer, expense.amount);

    let residual = split.total();
    if !residual.is_zero() {
        tracing::error!(expense = id, %residual, "split does not sum to zero");
        return Err(EngineError::SplitIntegrity {
            expense: id.to_string(),
            residual,
        });
    }
    Ok(split)
}

fn split_equal(
    split: &mut Split,
    expense: &Expense,
    members: &[Member],
    excluded: &BTreeSet<Member>,
) -> ResultEngine<()> {
    let id = expense.id.as_str();
    if let Some(stranger) = excluded.iter().find(|m| !members.contains(m)) {
        return Err(EngineError::invalid_split_for(
            id,
            stranger,
            "excluded member is not in the group",
        ));
    }

    let included: Vec<&Member> = members.iter().filter(|m| !excluded.contains(*m)).collect();
    let Some(first) = included.first() else {
        return Err(EngineError::invalid_split(
            id,
            "at least one person must be included in the split",
        ));
    };

    let count = included.len() as i64;
    let share = Money::new(expense.amount.minor() / count);
    let remainder = Money::new(expense.amount.minor() - share.minor() * count);
    for member in &included {
        debit(split, member, share);
    }

    let remainder_to = if included.contains(&&expense.payer) {
        &expense.payer
    } else {
        *first
    };
    debit(split, remainder_to, remainder);
    Ok(())
}

fn credit(split: &mut Split, member: &Member, amount: Money) {
    if let Some(position) = split.position_mut(member) {
        *position += amount;
    }
}

fn debit(split: &mut Split, member: &Member, amount: Money) {
    if let Some(position) = split.position_mut(member) {
        *position -= amount;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::Currency;

    fn m(email: &str) -> Member {
        Member::new(email).unwrap()
    }

    fn group() -> Vec<Member> {
        vec![m("a@x.com"), m("b@x.com"), m("c@x.com")]
    }

    fn positions(split: &Split) -> Vec<i64> {
        split.iter().map(|(_, amount)| amount.minor()).collect()
    }

    #[test]
    fn equal_split_even_amount() {
        let expense = Expense::equal("e1", Money::new(9000), Currency::Eur, m("a@x.com"));
        let split = compute_split(&expense, &group()).unwrap();
        assert_eq!(positions(&split), [6000, -3000, -3000]);
        assert_eq!(split.expense_id(), "e1");
    }

    #[test]
    fn equal_split_remainder_goes_to_payer() {
        let expense = Expense::equal("e1", Money::new(10000), Currency::Eur, m("b@x.com"));
        let split = compute_split(&expense, &group()).unwrap();
        assert_eq!(positions(&split), [-3333, 6666, -3333]);
        assert!(split.total().is_zero());
    }

    #[test]
    fn equal_split_remainder_to_first_included_when_payer_excluded() {
        let expense = Expense::equal("e1", Money::new(1001), Currency::Eur, m("a@x.com"))
            .excluding([m("a@x.com")]);
        let split = compute_split(&expense, &group()).unwrap();
        assert_eq!(positions(&split), [1001, -501, -500]);
    }

    #[test]
    fn equal_split_requires_someone_included() {
        let expense =
            Expense::equal("e1", Money::new(100), Currency::Eur, m("a@x.com")).excluding(group());
        let err = compute_split(&expense, &group()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidSplit { ref expense, .. } if expense == "e1"));
    }

    #[test]
    fn equal_split_rejects_unknown_excluded_member() {
        let expense = Expense::equal("e1", Money::new(100), Currency::Eur, m("a@x.com"))
            .excluding([m("z@x.com")]);
        let err = compute_split(&expense, &group()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidSplit { member: Some(ref member), .. } if member.as_str() == "z@x.com"
        ));
    }

    #[test]
    fn payer_must_be_member() {
        let expense = Expense::equal("e1", Money::new(100), Currency::Eur, m("z@x.com"));
        assert!(compute_split(&expense, &group()).is_err());
    }

    #[test]
    fn amount_must_be_positive() {
        let expense = Expense::equal("e1", Money::ZERO, Currency::Eur, m("a@x.com"));
        assert!(compute_split(&expense, &group()).is_err());
    }

    #[test]
    fn exact_split_debits_declared_shares() {
        let shares = BTreeMap::from([
            (m("a@x.com"), Money::new(5000)),
            (m("b@x.com"), Money::new(3000)),
            (m("c@x.com"), Money::new(2000)),
        ]);
        let expense = Expense::exact("e2", Money::new(10000), Currency::Eur, m("a@x.com"), shares);
        let split = compute_split(&expense, &group()).unwrap();
        assert_eq!(positions(&split), [5000, -3000, -2000]);
    }

    #[test]
    fn exact_split_payer_absorbs_tolerated_gap() {
        let shares = BTreeMap::from([
            (m("b@x.com"), Money::new(3000)),
            (m("c@x.com"), Money::new(6995)),
        ]);
        let expense = Expense::exact("e2", Money::new(10000), Currency::Eur, m("a@x.com"), shares);
        let split = compute_split(&expense, &group()).unwrap();
        assert_eq!(positions(&split), [9995, -3000, -6995]);
    }

    #[test]
    fn exact_split_rejects_gap_beyond_tolerance() {
        let shares = BTreeMap::from([(m("b@x.com"), Money::new(9989))]);
        let expense = Expense::exact("e2", Money::new(10000), Currency::Eur, m("a@x.com"), shares);
        assert!(matches!(
            compute_split(&expense, &group()),
            Err(EngineError::InvalidSplit { .. })
        ));
    }

    #[test]
    fn exact_split_rejects_negative_and_foreign_shares() {
        let negative = BTreeMap::from([
            (m("b@x.com"), Money::new(-100)),
            (m("c@x.com"), Money::new(200)),
        ]);
        let expense = Expense::exact("e3", Money::new(100), Currency::Eur, m("a@x.com"), negative);
        assert!(compute_split(&expense, &group()).is_err());

        let foreign = BTreeMap::from([(m("z@x.com"), Money::new(100))]);
        let expense = Expense::exact("e3", Money::new(100), Currency::Eur, m("a@x.com"), foreign);
        assert!(compute_split(&expense, &group()).is_err());
    }

    #[test]
    fn jpy_has_no_tolerance() {
        let shares = BTreeMap::from([(m("b@x.com"), Money::new(999))]);
        let expense = Expense::exact("e4", Money::new(1000), Currency::Jpy, m("a@x.com"), shares);
        assert!(compute_split(&expense, &group()).is_err());
    }

    #[test]
    fn overflowing_exact_shares_are_rejected() {
        let big = Money::new(i64::MAX / 2 + 10);
        let shares = BTreeMap::from([(m("b@x.com"), big), (m("c@x.com"), big)]);
        let expense = Expense::exact("huge", Money::new(i64::MAX), Currency::Eur, m("a@x.com"), shares);
        assert_eq!(
            compute_split(&expense, &group()).unwrap_err(),
            EngineError::AmountOverflow {
                expense: "huge".to_string()
            }
        );
    }
}
