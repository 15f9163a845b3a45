use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{Currency, Member, Money};

/// How an expense is divided among the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitMethod {
    /// Even shares among every group member not listed in `excluded`.
    Equal { excluded: BTreeSet<Member> },
    /// Declared per-member shares, summing to the expense amount.
    Exact { shares: BTreeMap<Member, Money> },
}

impl SplitMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal { .. } => "equal",
            Self::Exact { .. } => "exact",
        }
    }
}

/// A single payment made by one member on behalf of the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    pub payer: Member,
    pub method: SplitMethod,
    pub created_at: DateTime<Utc>,
    /// Settled expenses are history only and never count toward balances.
    pub settled: bool,
}

impl Expense {
    /// An expense split evenly across the whole group.
    #[must_use]
    pub fn equal(id: &str, amount: Money, currency: Currency, payer: Member) -> Self {
        Self::with_method(
            id,
            amount,
            currency,
            payer,
            SplitMethod::Equal {
                excluded: BTreeSet::new(),
            },
        )
    }

    /// An expense split by declared per-member amounts.
    #[must_use]
    pub fn exact(
        id: &str,
        amount: Money,
        currency: Currency,
        payer: Member,
        shares: BTreeMap<Member, Money>,
    ) -> Self {
        Self::with_method(id, amount, currency, payer, SplitMethod::Exact { shares })
    }

    fn with_method(
        id: &str,
        amount: Money,
        currency: Currency,
        payer: Member,
        method: SplitMethod,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            amount,
            currency,
            payer,
            method,
            created_at: Utc::now(),
            settled: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    /// Leaves the given members out of an equal split. No effect on exact
    /// splits.
    #[must_use]
    pub fn excluding<I>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = Member>,
    {
        if let SplitMethod::Equal { excluded } = &mut self.method {
            excluded.extend(members);
        }
        self
    }

    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn settled(mut self, settled: bool) -> Self {
        self.settled = settled;
        self
    }
}
