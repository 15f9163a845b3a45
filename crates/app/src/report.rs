//! Plain-text rendering of command results.
use std::fmt::Write;

use api_types::{
    balance::{BalancesResponse, MemberAmount, SplitResponse},
    settlement::{CheckResponse, SettledResponse, SettlementResponse},
};
use engine::Currency;

fn amount(value: f64, currency: Currency) -> String {
    format!(
        "{value:.prec$} {code}",
        prec = usize::from(currency.minor_units()),
        code = currency.code()
    )
}

fn position_line(out: &mut String, position: &MemberAmount, currency: Currency) {
    let line = if position.settled {
        format!("  {}: settled up", position.email)
    } else if position.amount > 0.0 {
        format!(
            "  {} gets back {}",
            position.email,
            amount(position.amount, currency)
        )
    } else {
        format!(
            "  {} owes {}",
            position.email,
            amount(-position.amount, currency)
        )
    };
    let _ = writeln!(out, "{line}");
}

pub fn split(response: &SplitResponse, currency: Currency) -> String {
    let mut out = format!("Expense {}\n", response.expense_id);
    for position in &response.positions {
        position_line(&mut out, position, currency);
    }
    out
}

pub fn balances(response: &BalancesResponse, currency: Currency) -> String {
    if response.all_settled {
        return "All settled up!\n".to_string();
    }
    let mut out = format!("Balances for {}\n", response.group_id);
    for position in &response.balances {
        position_line(&mut out, position, currency);
    }
    out
}

pub fn settlement(response: &SettlementResponse, currency: Currency) -> String {
    if response.transfers.is_empty() {
        return "All settled up!\n".to_string();
    }
    let mut out = format!(
        "Settle {} ({}, {} transfers)\n",
        response.group_id,
        response.strategy,
        response.transfers.len()
    );
    for transfer in &response.transfers {
        let _ = writeln!(
            out,
            "  {} pays {} {}",
            transfer.from,
            transfer.to,
            amount(transfer.amount, currency)
        );
    }
    if let Some(drift) = &response.drift {
        let _ = writeln!(
            out,
            "  note: balances were off by {}, corrected on {}",
            amount(drift.residual, currency),
            drift.absorbed_by
        );
    }
    out
}

pub fn settled(response: &SettledResponse) -> String {
    let mut out = format!(
        "Marked {} expenses of {} as settled\n",
        response.settled.len(),
        response.group_id
    );
    if response.all_settled {
        out.push_str("All settled up!\n");
    }
    out
}

pub fn check(response: &CheckResponse) -> String {
    if response.failures.is_empty() {
        return format!("{} expenses checked, no problems\n", response.checked);
    }
    let mut out = format!(
        "{} expenses checked, {} failed\n",
        response.checked,
        response.failures.len()
    );
    for failure in &response.failures {
        let _ = match &failure.member {
            Some(member) => writeln!(
                out,
                "  {} ({member}): {}",
                failure.expense_id, failure.message
            ),
            None => writeln!(out, "  {}: {}", failure.expense_id, failure.message),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_types::settlement::{DriftView, ExpenseFailure, TransferView};

    fn position(email: &str, amount: f64) -> MemberAmount {
        MemberAmount {
            email: email.to_string(),
            amount,
            settled: amount == 0.0,
        }
    }

    #[test]
    fn balances_use_gets_back_and_owes() {
        let response = BalancesResponse {
            group_id: "g1".to_string(),
            currency: "EUR".to_string(),
            balances: vec![
                position("a@x.com", 66.66),
                position("b@x.com", -33.33),
                position("c@x.com", 0.0),
            ],
            all_settled: false,
        };
        let text = balances(&response, Currency::Eur);
        assert!(text.contains("a@x.com gets back 66.66 EUR"));
        assert!(text.contains("b@x.com owes 33.33 EUR"));
        assert!(text.contains("c@x.com: settled up"));
    }

    #[test]
    fn settled_group_prints_a_single_line() {
        let response = BalancesResponse {
            group_id: "g1".to_string(),
            currency: "JPY".to_string(),
            balances: Vec::new(),
            all_settled: true,
        };
        assert_eq!(balances(&response, Currency::Jpy), "All settled up!\n");
    }

    #[test]
    fn settlement_lists_transfers_and_drift() {
        let response = SettlementResponse {
            group_id: "g1".to_string(),
            currency: "JPY".to_string(),
            strategy: "simplified".to_string(),
            transfers: vec![TransferView {
                from: "c@x.com".to_string(),
                to: "a@x.com".to_string(),
                amount: 3000.0,
            }],
            drift: Some(DriftView {
                residual: 1.0,
                absorbed_by: "a@x.com".to_string(),
            }),
        };
        let text = settlement(&response, Currency::Jpy);
        assert!(text.contains("c@x.com pays a@x.com 3000 JPY"));
        assert!(text.contains("off by 1 JPY, corrected on a@x.com"));
    }

    #[test]
    fn settled_group_reports_count() {
        let response = SettledResponse {
            group_id: "g1".to_string(),
            settled: vec!["e1".to_string(), "e3".to_string()],
            all_settled: true,
        };
        assert_eq!(
            settled(&response),
            "Marked 2 expenses of g1 as settled\nAll settled up!\n"
        );
    }

    #[test]
    fn check_names_failing_expenses() {
        let response = CheckResponse {
            group_id: "g1".to_string(),
            checked: 3,
            failures: vec![ExpenseFailure {
                expense_id: "e2".to_string(),
                member: Some("z@x.com".to_string()),
                message: "payer is not a group member".to_string(),
            }],
        };
        let text = check(&response);
        assert!(text.starts_with("3 expenses checked, 1 failed"));
        assert!(text.contains("e2 (z@x.com): payer is not a group member"));
    }
}
