//! Validation of user-entered forms before anything reaches the engine.
//!
//! Each form collects every failing field at once, keyed by the field name
//! the front-end renders the message next to. A draft that validates is
//! guaranteed to split cleanly, so form errors never surface later as
//! aggregation failures.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use chrono::Utc;

use crate::{
    Capability, EngineError, Expense, Group, Member, Money, Role, Session, SplitMethod,
    group::normalize_group_text, split::compute_split,
};

/// Key under which errors not tied to a single field are reported.
pub const FORM_FIELD: &str = "form";

/// Field name → user-facing message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }

    fn require(session: &Session, capability: Capability) -> Result<(), FieldErrors> {
        session.require(capability).map_err(|err| {
            let mut errors = FieldErrors::default();
            errors.insert(FORM_FIELD, err.to_string());
            errors
        })
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, (field, message)) in self.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DraftMethod {
    #[default]
    Equal,
    Exact,
}

/// The add-expense form as typed by the user.
#[derive(Clone, Debug, Default)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: String,
    /// Payer email.
    pub paid_by: String,
    pub method: DraftMethod,
    /// Emails left out of an equal split.
    pub excluded: Vec<String>,
    /// `(email, amount)` pairs for an exact split; blank amounts count as 0.
    pub split_details: Vec<(String, String)>,
}

impl ExpenseDraft {
    /// Validates the draft against `group` and builds the expense.
    ///
    /// The session needs [`Capability::AddExpenses`]; without it only the
    /// `form` error is reported. Zero-amount exact entries are dropped from
    /// the resulting shares.
    pub fn validate(&self, session: &Session, group: &Group, id: &str) -> Result<Expense, FieldErrors> {
        FieldErrors::require(session, Capability::AddExpenses)?;
        let mut errors = FieldErrors::default();
        let currency = group.currency;

        let description = self.description.trim();
        if description.is_empty() {
            errors.insert("description", "Description is required");
        }

        let amount = match Money::parse(&self.amount, currency) {
            Ok(amount) if amount.is_positive() => Some(amount),
            _ => {
                errors.insert("amount", "Amount must be greater than 0");
                None
            }
        };

        let payer = if self.paid_by.trim().is_empty() {
            errors.insert("paidBy", "Payer is required");
            None
        } else {
            match Member::new(&self.paid_by) {
                Ok(payer) if group.contains(&payer) => Some(payer),
                _ => {
                    errors.insert("paidBy", "Payer must be a group member");
                    None
                }
            }
        };

        let method = match self.method {
            DraftMethod::Equal => self.equal_method(group, &mut errors),
            DraftMethod::Exact => self.exact_method(group, amount, &mut errors),
        };

        let (Some(amount), Some(payer), Some(method)) = (amount, payer, method) else {
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let expense = Expense {
            id: id.to_string(),
            description: description.to_string(),
            amount,
            currency,
            payer,
            method,
            created_at: Utc::now(),
            settled: false,
        };

        if let Err(err) = compute_split(&expense, group.members()) {
            errors.insert("split", split_error_message(err));
        }
        errors.into_result(|| expense)
    }

    fn equal_method(&self, group: &Group, errors: &mut FieldErrors) -> Option<SplitMethod> {
        let mut excluded = BTreeSet::new();
        for email in &self.excluded {
            match Member::new(email) {
                Ok(member) if group.contains(&member) => {
                    excluded.insert(member);
                }
                _ => {
                    errors.insert("split", format!("{} is not a group member", email.trim()));
                    return None;
                }
            }
        }
        if excluded.len() >= group.members().len() {
            errors.insert("split", "At least one person must be included in the split");
            return None;
        }
        Some(SplitMethod::Equal { excluded })
    }

    fn exact_method(
        &self,
        group: &Group,
        amount: Option<Money>,
        errors: &mut FieldErrors,
    ) -> Option<SplitMethod> {
        let currency = group.currency;
        let mut shares = BTreeMap::new();
        for (email, raw) in &self.split_details {
            let member = match Member::new(email) {
                Ok(member) if group.contains(&member) => member,
                _ => {
                    errors.insert("split", format!("{} is not a group member", email.trim()));
                    return None;
                }
            };
            let share = if raw.trim().is_empty() {
                Money::ZERO
            } else {
                match Money::parse(raw, currency) {
                    Ok(share) if !share.is_negative() => share,
                    _ => {
                        errors.insert("split", format!("Invalid amount for {member}"));
                        return None;
                    }
                }
            };
            let entry = shares.entry(member).or_insert(Money::ZERO);
            let Some(sum) = entry.checked_add(share) else {
                errors.insert("split", "Split amounts are too large");
                return None;
            };
            *entry = sum;
        }

        let Some(total) = Money::checked_sum(shares.values().copied()) else {
            errors.insert("split", "Split amounts are too large");
            return None;
        };
        if let Some(amount) = amount
            && (amount - total).abs().minor() > currency.split_tolerance()
        {
            errors.insert(
                "split",
                format!(
                    "Total split ({}) must match expense amount ({})",
                    total.format_in(currency),
                    amount.format_in(currency)
                ),
            );
            return None;
        }

        shares.retain(|_, share| share.is_positive());
        Some(SplitMethod::Exact { shares })
    }
}

/// Message shown under the split field. Only user-correctable split errors
/// are shown verbatim.
fn split_error_message(err: EngineError) -> String {
    match err {
        EngineError::InvalidSplit { reason, .. } => reason,
        other => {
            tracing::error!(err = %other, "draft failed to split");
            "The expense could not be split".to_string()
        }
    }
}

/// The create-group form.
#[derive(Clone, Debug, Default)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
}

impl GroupDraft {
    /// Returns the trimmed `(name, description)`.
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = normalize_group_text(&self.name, "name")
            .map_err(|message| errors.insert("name", message))
            .ok();
        let description = normalize_group_text(&self.description, "description")
            .map_err(|message| errors.insert("description", message))
            .ok();
        match (name, description) {
            (Some(name), Some(description)) => Ok((name, description)),
            _ => Err(errors),
        }
    }
}

/// Parses the add-member input of a group card.
pub fn parse_member_invite(email: &str) -> Result<Member, FieldErrors> {
    let mut errors = FieldErrors::default();
    if email.trim().is_empty() {
        errors.insert("email", "Email is required");
        return Err(errors);
    }
    Member::new(email).map_err(|err| {
        errors.insert("email", err.to_string());
        errors
    })
}

/// The manage-users form.
#[derive(Clone, Debug, Default)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    /// `"Select"` or empty when nothing was picked.
    pub role: String,
}

impl UserDraft {
    /// Requires [`Capability::ManageUsers`] on the session.
    pub fn validate(&self, session: &Session) -> Result<(String, Member, Role), FieldErrors> {
        FieldErrors::require(session, Capability::ManageUsers)?;
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name", "Name is required");
        }

        let email = if self.email.trim().is_empty() {
            errors.insert("email", "Email is required");
            None
        } else {
            Member::new(&self.email)
                .map_err(|err| errors.insert("email", err.to_string()))
                .ok()
        };

        let role = Role::try_from(self.role.as_str())
            .map_err(|_| errors.insert("role", "Role is required"))
            .ok();

        match (email, role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok((name.to_string(), email, role)),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;

    fn admin() -> Session {
        Session::new(Member::new("a@x.com").unwrap(), Role::Admin)
    }

    fn viewer() -> Session {
        Session::new(Member::new("c@x.com").unwrap(), Role::Viewer)
    }

    fn group() -> Group {
        let members = ["a@x.com", "b@x.com", "c@x.com"]
            .iter()
            .map(|e| Member::new(e).unwrap())
            .collect();
        Group::from_parts("g1", "Trip", "Summer", Currency::Eur, members).unwrap()
    }

    fn draft(amount: &str) -> ExpenseDraft {
        ExpenseDraft {
            description: "Dinner".to_string(),
            amount: amount.to_string(),
            paid_by: "a@x.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_equal_draft_builds_expense() {
        let expense = draft("90").validate(&viewer(), &group(), "e1").unwrap();
        assert_eq!(expense.amount, Money::new(9000));
        assert_eq!(expense.description, "Dinner");
        assert!(matches!(expense.method, SplitMethod::Equal { ref excluded } if excluded.is_empty()));
    }

    #[test]
    fn reports_every_missing_field() {
        let errors = ExpenseDraft::default().validate(&viewer(), &group(), "e1").unwrap_err();
        assert_eq!(errors.get("description"), Some("Description is required"));
        assert_eq!(errors.get("amount"), Some("Amount must be greater than 0"));
        assert_eq!(errors.get("paidBy"), Some("Payer is required"));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let errors = draft("-5").validate(&viewer(), &group(), "e1").unwrap_err();
        assert_eq!(errors.get("amount"), Some("Amount must be greater than 0"));
    }

    #[test]
    fn equal_draft_needs_someone_included() {
        let mut d = draft("30");
        d.excluded = vec!["a@x.com".into(), "b@x.com".into(), "c@x.com".into()];
        let errors = d.validate(&viewer(), &group(), "e1").unwrap_err();
        assert_eq!(
            errors.get("split"),
            Some("At least one person must be included in the split")
        );
    }

    #[test]
    fn exact_draft_checks_total_within_tolerance() {
        let mut d = draft("100");
        d.method = DraftMethod::Exact;
        d.split_details = vec![
            ("a@x.com".into(), "50".into()),
            ("b@x.com".into(), "30".into()),
            ("c@x.com".into(), "".into()),
        ];
        let errors = d.validate(&viewer(), &group(), "e1").unwrap_err();
        assert_eq!(
            errors.get("split"),
            Some("Total split (80.00 EUR) must match expense amount (100.00 EUR)")
        );

        d.split_details[2].1 = "19.95".into();
        let expense = d.validate(&viewer(), &group(), "e1").unwrap();
        let SplitMethod::Exact { shares } = expense.method else {
            panic!("expected exact split");
        };
        assert_eq!(shares.len(), 3);
    }

    #[test]
    fn exact_draft_drops_zero_entries() {
        let mut d = draft("50");
        d.method = DraftMethod::Exact;
        d.split_details = vec![("b@x.com".into(), "50".into()), ("c@x.com".into(), "0".into())];
        let expense = d.validate(&viewer(), &group(), "e1").unwrap();
        let SplitMethod::Exact { shares } = expense.method else {
            panic!("expected exact split");
        };
        assert_eq!(shares.len(), 1);
    }

    #[test]
    fn group_draft_requires_three_chars() {
        let errors = GroupDraft {
            name: " ab ".into(),
            description: "ok!".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters long"));
        assert_eq!(errors.get("description"), None);
    }

    #[test]
    fn member_invite_and_user_draft() {
        assert!(parse_member_invite("").is_err());
        assert_eq!(parse_member_invite(" B@X.com").unwrap().as_str(), "b@x.com");

        let errors = UserDraft {
            name: "".into(),
            email: "".into(),
            role: "Select".into(),
        }
        .validate(&admin())
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("role"), Some("Role is required"));

        let (name, email, role) = UserDraft {
            name: "Bea".into(),
            email: "bea@x.com".into(),
            role: "viewer".into(),
        }
        .validate(&admin())
        .unwrap();
        assert_eq!((name.as_str(), email.as_str(), role), ("Bea", "bea@x.com", Role::Viewer));
    }

    #[test]
    fn user_management_needs_admin() {
        let draft = UserDraft {
            name: "Bea".into(),
            email: "bea@x.com".into(),
            role: "viewer".into(),
        };
        let manager = Session::new(Member::new("m@x.com").unwrap(), Role::Manager);
        let errors = draft.validate(&manager).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get(FORM_FIELD).is_some_and(|m| m.contains("manage_users")));
    }

    #[test]
    fn huge_exact_shares_are_a_field_error() {
        let mut d = draft("10");
        d.method = DraftMethod::Exact;
        d.split_details = vec![
            ("b@x.com".into(), "90000000000000000".into()),
            ("c@x.com".into(), "90000000000000000".into()),
        ];
        let errors = d.validate(&viewer(), &group(), "e1").unwrap_err();
        assert_eq!(errors.get("split"), Some("Split amounts are too large"));
    }

    #[test]
    fn split_integrity_failures_still_reject_the_draft() {
        let integrity = EngineError::SplitIntegrity {
            expense: "e1".to_string(),
            residual: Money::new(1),
        };
        assert_eq!(split_error_message(integrity), "The expense could not be split");
        let invalid = EngineError::InvalidSplit {
            expense: "e1".to_string(),
            member: None,
            reason: "payer is not a group member".to_string(),
        };
        assert_eq!(split_error_message(invalid), "payer is not a group member");
    }
}
