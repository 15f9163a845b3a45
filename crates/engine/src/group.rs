use crate::{
    Balances, Capability, Currency, EngineError, Expense, Member, ResultEngine, Session, Split,
    balances::compute_balances, split::compute_split,
};

/// Minimum length of a group name or description, after trimming.
pub const MIN_GROUP_TEXT_LEN: usize = 3;

/// A named set of members sharing expenses in one currency.
///
/// Members keep insertion order, which is also the display order and the
/// order every split and balance is reported in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub currency: Currency,
    members: Vec<Member>,
}

impl Group {
    /// Creates a new group owned by the session user, who becomes its first
    /// member.
    pub fn create(
        session: &Session,
        id: &str,
        name: &str,
        description: &str,
        currency: Currency,
    ) -> ResultEngine<Self> {
        session.require(Capability::CreateGroups)?;
        let name = normalize_group_text(name, "name").map_err(EngineError::InvalidGroup)?;
        let description =
            normalize_group_text(description, "description").map_err(EngineError::InvalidGroup)?;
        tracing::debug!(group = id, user = %session.user, "creating group");
        Ok(Self {
            id: id.to_string(),
            name,
            description,
            currency,
            members: vec![session.user.clone()],
        })
    }

    /// Rebuilds a group from stored data. Member order is preserved;
    /// duplicates are rejected.
    pub fn from_parts(
        id: &str,
        name: &str,
        description: &str,
        currency: Currency,
        members: Vec<Member>,
    ) -> ResultEngine<Self> {
        let mut group = Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            currency,
            members: Vec::with_capacity(members.len()),
        };
        for member in members {
            if group.contains(&member) {
                return Err(EngineError::ExistingKey(member.to_string()));
            }
            group.members.push(member);
        }
        Ok(group)
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, member: &Member) -> bool {
        self.members.contains(member)
    }

    /// Adds members by email and returns the ones that were not already in
    /// the group, in the order given.
    pub fn add_members(&mut self, session: &Session, emails: &[&str]) -> ResultEngine<Vec<Member>> {
        session.require(Capability::UpdateGroups)?;
        let parsed = emails
            .iter()
            .map(|email| Member::new(email))
            .collect::<ResultEngine<Vec<_>>>()?;

        let mut added = Vec::new();
        for member in parsed {
            if self.contains(&member) {
                continue;
            }
            self.members.push(member.clone());
            added.push(member);
        }
        if !added.is_empty() {
            tracing::info!(group = %self.id, added = added.len(), "members added");
        }
        Ok(added)
    }

    /// Splits one expense of this group, checking its currency first.
    pub fn split(&self, expense: &Expense) -> ResultEngine<Split> {
        self.ensure_currency(expense)?;
        compute_split(expense, &self.members)
    }

    /// Net balances of this group's members over the given expenses.
    pub fn balances(&self, expenses: &[Expense]) -> ResultEngine<Balances> {
        self.check_currency(expenses)?;
        compute_balances(expenses, &self.members)
    }

    /// Fails on the first expense not in the group currency.
    pub fn check_currency(&self, expenses: &[Expense]) -> ResultEngine<()> {
        expenses
            .iter()
            .try_for_each(|expense| self.ensure_currency(expense))
    }

    pub fn ensure_currency(&self, expense: &Expense) -> ResultEngine<()> {
        if expense.currency != self.currency {
            return Err(EngineError::ExpenseCurrency {
                expense: expense.id.clone(),
                expected: self.currency,
                found: expense.currency,
            });
        }
        Ok(())
    }
}

/// Trims a group name/description and enforces the minimum length.
/// Returns the user-facing message on failure.
pub(crate) fn normalize_group_text(value: &str, label: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < MIN_GROUP_TEXT_LEN {
        let mut label = label.to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        return Err(format!(
            "{label} must be at least {MIN_GROUP_TEXT_LEN} characters long"
        ));
    }
    Ok(trimmed.to_string())
}
