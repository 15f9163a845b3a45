use api_types::{
    settlement::{CheckResponse, ExpenseFailure, SettledResponse},
    snapshot::GroupSnapshot,
};
use engine::{EngineError, Expense, Group};

use crate::{
    client::Client,
    error::{AppError, Result},
    settings::{Cli, Command, Settings},
};

mod client;
mod convert;
mod error;
mod report;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, settings) = settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "sharesplit={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut snapshot = load_snapshot(&cli, &settings).await?;
    let group = convert::group_from_record(&snapshot.group, settings.currency)?;
    tracing::debug!(
        group = %group.id,
        members = group.members().len(),
        expenses = snapshot.expenses.len(),
        "snapshot loaded"
    );

    let output = match &cli.command {
        Command::Settle {
            mark_settled: true,
            ..
        } => {
            let response = settle_all(&group, &mut snapshot)?;
            store_settled(&cli, &settings, &snapshot).await?;
            render(&settings, &response, report::settled)?
        }
        command => run(command, &settings, &group, &snapshot)?,
    };
    print!("{output}");
    Ok(())
}

fn remote<'a>(cli: &'a Cli, settings: &Settings) -> Result<(Client, &'a str)> {
    let base_url = settings
        .base_url
        .as_deref()
        .ok_or_else(|| AppError::Input("either --input or --base-url is required".to_string()))?;
    let group_id = cli
        .group
        .as_deref()
        .ok_or_else(|| AppError::Input("--group is required with --base-url".to_string()))?;
    Ok((Client::new(base_url)?, group_id))
}

async fn load_snapshot(cli: &Cli, settings: &Settings) -> Result<GroupSnapshot> {
    if let Some(path) = &cli.input {
        let raw = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let (client, group_id) = remote(cli, settings)?;
    let group = client.group(group_id).await?;
    let expenses = client.expenses(group_id).await?;
    Ok(GroupSnapshot { group, expenses })
}

/// Writes the settled snapshot back to `--input`, or asks the API to settle
/// the group.
async fn store_settled(cli: &Cli, settings: &Settings, snapshot: &GroupSnapshot) -> Result<()> {
    if let Some(path) = &cli.input {
        let mut raw = serde_json::to_string_pretty(snapshot)?;
        raw.push('\n');
        std::fs::write(path, raw)?;
        tracing::info!(path = %path.display(), "snapshot updated");
        return Ok(());
    }

    let (client, group_id) = remote(cli, settings)?;
    client.settle_group(group_id).await?;
    tracing::info!(group = group_id, "group settled");
    Ok(())
}

/// Marks every unsettled expense of the snapshot as settled.
fn settle_all(group: &Group, snapshot: &mut GroupSnapshot) -> Result<SettledResponse> {
    let mut expenses = expenses(snapshot, group)?;
    group.check_currency(&expenses)?;
    let settled = engine::settle_all(&mut expenses);
    for record in &mut snapshot.expenses {
        if settled.iter().any(|id| id == record.id()) {
            record.mark_settled();
        }
    }
    let balances = group.balances(&expenses)?;
    Ok(SettledResponse {
        group_id: group.id.clone(),
        settled,
        all_settled: balances.all_settled(),
    })
}

fn expenses(snapshot: &GroupSnapshot, group: &Group) -> Result<Vec<Expense>> {
    snapshot
        .expenses
        .iter()
        .map(|record| convert::expense_from_record(record, group).map_err(AppError::from))
        .collect()
}

fn run(
    command: &Command,
    settings: &Settings,
    group: &Group,
    snapshot: &GroupSnapshot,
) -> Result<String> {
    let currency = group.currency;
    match command {
        Command::Split { expense } => {
            let record = snapshot
                .expenses
                .iter()
                .find(|record| record.id() == expense)
                .ok_or_else(|| EngineError::KeyNotFound(format!("expense {expense}")))?;
            let expense = convert::expense_from_record(record, group)?;
            let split = group.split(&expense)?;
            let response = convert::split_response(&split, currency);
            render(settings, &response, |r| report::split(r, currency))
        }
        Command::Balances { all } => {
            let balances = group.balances(&expenses(snapshot, group)?)?;
            let response = convert::balances_response(group, &balances, *all);
            render(settings, &response, |r| report::balances(r, currency))
        }
        Command::Settle { .. } => {
            let strategy = settings.strategy;
            let expenses = expenses(snapshot, group)?;
            group.check_currency(&expenses)?;
            let plan = engine::plan_settlement(&expenses, group.members(), strategy)?;
            let response = convert::settlement_response(group, &plan, strategy);
            render(settings, &response, |r| report::settlement(r, currency))
        }
        Command::Check => {
            let response = check(group, snapshot);
            render(settings, &response, report::check)
        }
    }
}

/// Splits every expense on its own, collecting failures instead of stopping
/// at the first one.
fn check(group: &Group, snapshot: &GroupSnapshot) -> CheckResponse {
    let failures = snapshot
        .expenses
        .iter()
        .filter_map(|record| {
            let result = convert::expense_from_record(record, group)
                .and_then(|expense| group.split(&expense));
            let err = result.err()?;
            tracing::debug!(expense = record.id(), %err, "expense failed");
            let member = match &err {
                EngineError::InvalidSplit { member, .. } => member.as_ref().map(ToString::to_string),
                _ => None,
            };
            Some(ExpenseFailure {
                expense_id: record.id().to_string(),
                member,
                message: err.to_string(),
            })
        })
        .collect();
    CheckResponse {
        group_id: group.id.clone(),
        checked: snapshot.expenses.len(),
        failures,
    }
}

fn render<T: serde::Serialize>(
    settings: &Settings,
    response: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String> {
    if settings.json {
        let mut out = serde_json::to_string_pretty(response)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(text(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GroupSnapshot {
        serde_json::from_str(
            r#"{
                "group": {"_id": "g1", "name": "Trip", "currency": "EUR",
                          "membersEmail": ["a@x.com", "b@x.com", "c@x.com"]},
                "expenses": [
                    {"_id": "e1", "description": "Dinner", "amount": 100, "payerEmail": "a@x.com",
                     "splitMethod": "equal"},
                    {"_id": "e2", "title": "Taxi", "amount": 20, "payer": "z@x.com",
                     "splitType": "EQUAL"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn settings(json: bool) -> Settings {
        Settings {
            json,
            ..Settings::default()
        }
    }

    #[test]
    fn check_reports_every_failing_expense() {
        let snapshot = snapshot();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();
        let response = check(&group, &snapshot);
        assert_eq!(response.checked, 2);
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].expense_id, "e2");
        assert_eq!(response.failures[0].member.as_deref(), Some("z@x.com"));
    }

    #[test]
    fn balances_fail_naming_the_broken_expense() {
        let snapshot = snapshot();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();
        let err = run(
            &Command::Balances { all: false },
            &settings(false),
            &group,
            &snapshot,
        )
        .unwrap_err();
        assert!(err.to_string().contains("\"e2\""));
    }

    #[test]
    fn split_command_renders_json() {
        let snapshot = snapshot();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();
        let out = run(
            &Command::Split {
                expense: "e1".to_string(),
            },
            &settings(true),
            &group,
            &snapshot,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["expenseId"], "e1");
        assert_eq!(value["positions"][0]["amount"], 66.66);
        assert_eq!(value["positions"][1]["amount"], -33.33);
    }

    #[test]
    fn unknown_expense_is_reported() {
        let snapshot = snapshot();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();
        let err = run(
            &Command::Split {
                expense: "nope".to_string(),
            },
            &settings(false),
            &group,
            &snapshot,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::KeyNotFound(_))));
    }

    #[test]
    fn demo_trip_settles_with_two_transfers() {
        let snapshot: GroupSnapshot =
            serde_json::from_str(include_str!("../../../demos/trip.json")).unwrap();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();
        let out = run(
            &Command::Settle {
                strategy: None,
                mark_settled: false,
            },
            &settings(false),
            &group,
            &snapshot,
        )
        .unwrap();
        assert!(out.contains("c@x.com pays a@x.com 80.00 EUR"));
        assert!(out.contains("b@x.com pays a@x.com 40.00 EUR"));
    }

    #[test]
    fn settle_all_marks_records_and_clears_balances() {
        let mut snapshot: GroupSnapshot =
            serde_json::from_str(include_str!("../../../demos/trip.json")).unwrap();
        let group = convert::group_from_record(&snapshot.group, engine::Currency::Eur).unwrap();

        let response = settle_all(&group, &mut snapshot).unwrap();
        assert_eq!(response.settled, ["e1", "e2", "e3"]);
        assert!(response.all_settled);
        assert!(snapshot.expenses.iter().all(|record| record.is_settled()));

        let out = run(
            &Command::Balances { all: false },
            &settings(false),
            &group,
            &snapshot,
        )
        .unwrap();
        assert_eq!(out, "All settled up!\n");
    }
}
