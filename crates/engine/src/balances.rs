use crate::{EngineError, Expense, Member, Money, ResultEngine, split::compute_split};

/// Net per-member balances of a group: positive is owed, negative owes.
///
/// Every group member is present, in group order, even with a zero balance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    entries: Vec<(Member, Money)>,
}

impl Balances {
    /// Every member starting at zero.
    #[must_use]
    pub fn zeroed(members: &[Member]) -> Self {
        Self {
            entries: members.iter().map(|m| (m.clone(), Money::ZERO)).collect(),
        }
    }

    /// Balances supplied from elsewhere (e.g. a remote API). Later entries
    /// for the same member are added to the first one, saturating at the
    /// `i64` bounds.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Member, Money)>,
    {
        let mut balances = Self::default();
        for (member, amount) in entries {
            match balances.entry_mut(&member) {
                Some(balance) => *balance = balance.saturating_add(amount),
                None => balances.entries.push((member, amount)),
            }
        }
        balances
    }

    #[must_use]
    pub fn get(&self, member: &Member) -> Option<Money> {
        self.entries
            .iter()
            .find_map(|(m, amount)| (m == member).then_some(*amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Member, Money)> {
        self.entries.iter().map(|(m, amount)| (m, *amount))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every balance. Zero for balances computed by the engine.
    #[must_use]
    pub fn total(&self) -> Money {
        Money::wide_sum(self.entries.iter().map(|(_, amount)| *amount))
    }

    /// `true` when the member's balance is below one minor unit, which the
    /// display layer shows as "settled up". The stored value is untouched.
    #[must_use]
    pub fn is_settled(&self, member: &Member) -> bool {
        self.get(member).is_none_or(Money::is_zero)
    }

    /// `true` when every member is settled.
    #[must_use]
    pub fn all_settled(&self) -> bool {
        self.entries.iter().all(|(_, amount)| amount.is_zero())
    }

    pub(crate) fn entry_mut(&mut self, member: &Member) -> Option<&mut Money> {
        self.entries
            .iter_mut()
            .find_map(|(m, amount)| (m == member).then_some(amount))
    }

    /// Adds `amount` to `member`, appending the member if absent. `None` on
    /// overflow, leaving the balance untouched.
    pub(crate) fn checked_add(&mut self, member: &Member, amount: Money) -> Option<()> {
        match self.entry_mut(member) {
            Some(balance) => *balance = balance.checked_add(amount)?,
            None => self.entries.push((member.clone(), amount)),
        }
        Some(())
    }
}

/// Aggregates the splits of every unsettled expense into net balances.
///
/// Settled expenses are skipped. The first expense that cannot be split
/// aborts the aggregation; the error carries that expense's id so the
/// caller never sees balances built from a partial expense set.
pub fn compute_balances(expenses: &[Expense], members: &[Member]) -> ResultEngine<Balances> {
    let mut balances = Balances::zeroed(members);
    for expense in expenses.iter().filter(|e| !e.settled) {
        let split = compute_split(expense, members).inspect_err(|err| {
            tracing::debug!(expense = %expense.id, %err, "balance aggregation aborted");
        })?;
        for (member, amount) in split.iter() {
            if balances.checked_add(member, amount).is_none() {
                tracing::warn!(expense = %expense.id, %member, "balance overflow");
                return Err(EngineError::overflow(&expense.id));
            }
        }
    }
    Ok(balances)
}
