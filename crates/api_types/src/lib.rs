use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod group {
    use super::*;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct PaymentStatus {
        pub currency: Option<String>,
    }

    /// A group as returned by `GET /groups/{id}`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GroupRecord {
        #[serde(rename = "_id", alias = "id")]
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub description: String,
        /// Top-level currency code; older records only carry
        /// `paymentStatus.currency`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub currency: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub payment_status: Option<PaymentStatus>,
        /// Member emails in display order.
        #[serde(default)]
        pub members_email: Vec<String>,
    }

    impl GroupRecord {
        /// Currency code of the group, if the record carries one.
        pub fn currency_code(&self) -> Option<&str> {
            self.currency.as_deref().or_else(|| {
                self.payment_status
                    .as_ref()
                    .and_then(|status| status.currency.as_deref())
            })
        }
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SplitMethod {
        Equal,
        Exact,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SplitDetail {
        pub email: String,
        pub amount: f64,
    }

    /// Current expense schema.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CanonicalExpense {
        #[serde(rename = "_id", alias = "id", default)]
        pub id: String,
        pub description: String,
        pub amount: f64,
        #[serde(alias = "paidBy")]
        pub payer_email: String,
        pub split_method: SplitMethod,
        /// Equal split only.
        #[serde(default)]
        pub excluded_emails: Vec<String>,
        /// Exact split only.
        #[serde(default)]
        pub split_details: Vec<SplitDetail>,
        #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
        pub created_at: Option<DateTime<Utc>>,
        #[serde(default, alias = "isSettled")]
        pub settled: bool,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum LegacySplitType {
        Equal,
        Unequal,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LegacySplit {
        pub user_id: String,
        pub amount: f64,
    }

    /// Older expense schema (`title`/`payer`/`splits`), still returned for
    /// expenses created before the split-method rework.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LegacyExpense {
        #[serde(rename = "_id", alias = "id", default)]
        pub id: String,
        pub title: String,
        pub amount: f64,
        pub payer: String,
        /// Members included in an `EQUAL` split.
        #[serde(default)]
        pub participants: Vec<String>,
        pub split_type: LegacySplitType,
        /// Per-member amounts of an `UNEQUAL` split.
        #[serde(default)]
        pub splits: Vec<LegacySplit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<DateTime<Utc>>,
        #[serde(default)]
        pub settled: bool,
    }

    /// Either expense schema, as found in `GET /expenses/{groupId}`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum ExpenseRecord {
        Canonical(CanonicalExpense),
        Legacy(LegacyExpense),
    }

    impl ExpenseRecord {
        pub fn id(&self) -> &str {
            match self {
                Self::Canonical(e) => &e.id,
                Self::Legacy(e) => &e.id,
            }
        }

        pub fn is_settled(&self) -> bool {
            match self {
                Self::Canonical(e) => e.settled,
                Self::Legacy(e) => e.settled,
            }
        }

        pub fn mark_settled(&mut self) {
            match self {
                Self::Canonical(e) => e.settled = true,
                Self::Legacy(e) => e.settled = true,
            }
        }
    }
}

pub mod snapshot {
    use super::*;
    use crate::{expense::ExpenseRecord, group::GroupRecord};

    /// A group with its expenses, as stored in a snapshot file.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct GroupSnapshot {
        pub group: GroupRecord,
        #[serde(default)]
        pub expenses: Vec<ExpenseRecord>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct MemberAmount {
        pub email: String,
        /// Signed major units: positive gets back, negative owes.
        pub amount: f64,
        pub settled: bool,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SplitResponse {
        pub expense_id: String,
        pub currency: String,
        pub positions: Vec<MemberAmount>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BalancesResponse {
        pub group_id: String,
        pub currency: String,
        pub balances: Vec<MemberAmount>,
        pub all_settled: bool,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransferView {
        pub from: String,
        pub to: String,
        pub amount: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DriftView {
        pub residual: f64,
        pub absorbed_by: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SettlementResponse {
        pub group_id: String,
        pub currency: String,
        pub strategy: String,
        pub transfers: Vec<TransferView>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub drift: Option<DriftView>,
    }

    /// Result of settling a whole group.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SettledResponse {
        pub group_id: String,
        /// Ids of the expenses marked as settled.
        pub settled: Vec<String>,
        pub all_settled: bool,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseFailure {
        pub expense_id: String,
        pub member: Option<String>,
        pub message: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CheckResponse {
        pub group_id: String,
        pub checked: usize,
        pub failures: Vec<ExpenseFailure>,
    }
}

#[cfg(test)]
mod tests {
    use super::{expense::*, group::*};

    #[test]
    fn canonical_and_legacy_expenses_both_parse() {
        let raw = r#"[
            {"_id": "e1", "description": "Dinner", "amount": 90, "payerEmail": "a@x.com",
             "splitMethod": "equal", "excludedEmails": [], "createdAt": "2025-03-01T19:00:00.000Z"},
            {"_id": "e2", "title": "Taxi", "amount": 30.5, "payer": "b@x.com",
             "participants": ["a@x.com", "b@x.com"], "splitType": "EQUAL", "splits": [],
             "date": "2025-03-02T10:00:00+01:00"}
        ]"#;
        let records: Vec<ExpenseRecord> = serde_json::from_str(raw).unwrap();
        assert!(matches!(&records[0], ExpenseRecord::Canonical(e) if e.payer_email == "a@x.com"));
        assert!(matches!(&records[1], ExpenseRecord::Legacy(e) if e.split_type == LegacySplitType::Equal));
        assert_eq!(records[1].id(), "e2");
    }

    #[test]
    fn marking_settled_keeps_the_schema() {
        let raw = r#"{"_id": "e2", "title": "Taxi", "amount": 30.5, "payer": "b@x.com",
            "splitType": "EQUAL"}"#;
        let mut record: ExpenseRecord = serde_json::from_str(raw).unwrap();
        assert!(!record.is_settled());
        record.mark_settled();
        assert!(record.is_settled());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["title"], "Taxi");
        assert_eq!(value["settled"], true);
    }

    #[test]
    fn paid_by_alias_is_accepted() {
        let raw = r#"{"id": "e3", "description": "Tickets", "amount": 100, "paidBy": "c@x.com",
            "splitMethod": "exact", "splitDetails": [{"email": "a@x.com", "amount": 100}],
            "isSettled": true}"#;
        let ExpenseRecord::Canonical(e) = serde_json::from_str(raw).unwrap() else {
            panic!("expected canonical record");
        };
        assert_eq!(e.payer_email, "c@x.com");
        assert_eq!(e.split_method, SplitMethod::Exact);
        assert!(e.settled);
    }

    #[test]
    fn group_currency_falls_back_to_payment_status() {
        let raw = r#"{"_id": "g1", "name": "Trip", "membersEmail": ["a@x.com"],
            "paymentStatus": {"currency": "INR", "amount": 0}}"#;
        let group: GroupRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(group.currency_code(), Some("INR"));

        let bare: GroupRecord = serde_json::from_str(r#"{"_id": "g2", "name": "Flat"}"#).unwrap();
        assert_eq!(bare.currency_code(), None);
    }
}
