//! Mapping between API records and engine types.
//!
//! Both expense schemas end up as the same engine `Expense`; nothing past
//! this module knows the legacy one exists.

use std::collections::{BTreeMap, BTreeSet};

use api_types::{
    balance::{BalancesResponse, MemberAmount, SplitResponse},
    expense::{CanonicalExpense, ExpenseRecord, LegacyExpense, LegacySplitType, SplitMethod},
    group::GroupRecord,
    settlement::{DriftView, SettlementResponse, TransferView},
};
use engine::{
    Balances, Currency, EngineError, Expense, Group, Member, Money, ResultEngine, Settlement,
    SettlementStrategy, Split,
};

/// Builds the engine group; records without a currency use `fallback`.
pub fn group_from_record(record: &GroupRecord, fallback: Currency) -> ResultEngine<Group> {
    let currency = match record.currency_code() {
        Some(code) => Currency::try_from(code)?,
        None => fallback,
    };
    let members = record
        .members_email
        .iter()
        .map(|email| Member::new(email))
        .collect::<ResultEngine<Vec<_>>>()?;
    Group::from_parts(
        &record.id,
        &record.name,
        &record.description,
        currency,
        members,
    )
}

pub fn expense_from_record(record: &ExpenseRecord, group: &Group) -> ResultEngine<Expense> {
    match record {
        ExpenseRecord::Canonical(e) => from_canonical(e, group.currency),
        ExpenseRecord::Legacy(e) => from_legacy(e, group),
    }
}

fn from_canonical(record: &CanonicalExpense, currency: Currency) -> ResultEngine<Expense> {
    let amount = Money::from_major(record.amount, currency)?;
    let payer = Member::new(&record.payer_email)?;
    let expense = match record.split_method {
        SplitMethod::Equal => {
            let excluded = parse_members(record.excluded_emails.iter().map(String::as_str))?;
            Expense::equal(&record.id, amount, currency, payer).excluding(excluded)
        }
        SplitMethod::Exact => {
            let shares = collect_shares(
                &record.id,
                record
                    .split_details
                    .iter()
                    .map(|d| (d.email.as_str(), d.amount)),
                currency,
            )?;
            Expense::exact(&record.id, amount, currency, payer, shares)
        }
    };
    Ok(expense
        .description(&record.description)
        .created_at(record.created_at.unwrap_or_default())
        .settled(record.settled))
}

fn from_legacy(record: &LegacyExpense, group: &Group) -> ResultEngine<Expense> {
    let currency = group.currency;
    let amount = Money::from_major(record.amount, currency)?;
    let payer = Member::new(&record.payer)?;
    let expense = match record.split_type {
        LegacySplitType::Equal => {
            // Records without participants were split across the whole group.
            let participants: BTreeSet<Member> =
                parse_members(record.participants.iter().map(String::as_str))?;
            let excluded = group
                .members()
                .iter()
                .filter(|m| !participants.is_empty() && !participants.contains(*m))
                .cloned()
                .collect::<Vec<_>>();
            Expense::equal(&record.id, amount, currency, payer).excluding(excluded)
        }
        LegacySplitType::Unequal => {
            let shares = collect_shares(
                &record.id,
                record
                    .splits
                    .iter()
                    .map(|s| (s.user_id.as_str(), s.amount)),
                currency,
            )?;
            Expense::exact(&record.id, amount, currency, payer, shares)
        }
    };
    Ok(expense
        .description(&record.title)
        .created_at(record.date.unwrap_or_default())
        .settled(record.settled))
}

fn parse_members<'a>(emails: impl Iterator<Item = &'a str>) -> ResultEngine<BTreeSet<Member>> {
    emails.map(Member::new).collect()
}

/// Builds exact shares, summing repeated emails and dropping zero amounts.
fn collect_shares<'a>(
    expense_id: &str,
    details: impl Iterator<Item = (&'a str, f64)>,
    currency: Currency,
) -> ResultEngine<BTreeMap<Member, Money>> {
    let mut shares = BTreeMap::new();
    for (email, amount) in details {
        let member = Member::new(email)?;
        let amount = Money::from_major(amount, currency)?;
        let share = shares.entry(member).or_insert(Money::ZERO);
        *share = share
            .checked_add(amount)
            .ok_or_else(|| EngineError::AmountOverflow {
                expense: expense_id.to_string(),
            })?;
    }
    shares.retain(|_, share: &mut Money| !share.is_zero());
    Ok(shares)
}

fn member_amounts<'a>(
    entries: impl Iterator<Item = (&'a Member, Money)>,
    currency: Currency,
) -> Vec<MemberAmount> {
    entries
        .map(|(member, amount)| MemberAmount {
            email: member.to_string(),
            amount: amount.to_major(currency),
            settled: amount.is_zero(),
        })
        .collect()
}

pub fn split_response(split: &Split, currency: Currency) -> SplitResponse {
    SplitResponse {
        expense_id: split.expense_id().to_string(),
        currency: currency.code().to_string(),
        positions: member_amounts(split.iter(), currency),
    }
}

pub fn balances_response(group: &Group, balances: &Balances, include_settled: bool) -> BalancesResponse {
    let currency = group.currency;
    let entries = balances
        .iter()
        .filter(|(member, _)| include_settled || !balances.is_settled(member));
    BalancesResponse {
        group_id: group.id.clone(),
        currency: currency.code().to_string(),
        balances: member_amounts(entries, currency),
        all_settled: balances.all_settled(),
    }
}

pub fn settlement_response(
    group: &Group,
    settlement: &Settlement,
    strategy: SettlementStrategy,
) -> SettlementResponse {
    let currency = group.currency;
    SettlementResponse {
        group_id: group.id.clone(),
        currency: currency.code().to_string(),
        strategy: strategy.as_str().to_string(),
        transfers: settlement
            .transfers
            .iter()
            .map(|t| TransferView {
                from: t.from.to_string(),
                to: t.to.to_string(),
                amount: t.amount.to_major(currency),
            })
            .collect(),
        drift: settlement.drift.as_ref().map(|d| DriftView {
            residual: d.residual.to_major(currency),
            absorbed_by: d.absorbed_by.to_string(),
        }),
    }
}
