//! Entities exchanged with the ZenMoney diff protocol.
//!
//! # Design
//! Field names follow the wire format (camelCase). Values the server may send
//! as `null` are `Option`s, so "no balance reported" never collapses into a
//! zero balance; unset `Option`s are left out of request bodies. Entity
//! structs are `#[serde(default)]`: the server omits fields freely in partial
//! payloads (suggestions, forced refreshes), and a missing required field
//! decodes to its type's default instead of failing the whole response.
//!
//! Suggestion input is a `TransactionDraft`, which carries only the fields
//! the caller knows, so no placeholder id or date reaches the server.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EntityType;

/// A currency with its rate against the user's base currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Instrument {
    pub id: i32,
    pub changed: i64,
    pub title: String,
    pub short_title: String,
    pub symbol: String,
    pub rate: f64,
}

/// A bank or other financial institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub id: i32,
    pub changed: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub www: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub changed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    pub currency: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_start_day: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_forecast_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_balance_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_renewal_date: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Cash,
    Ccard,
    Checking,
    Loan,
    Deposit,
    Emoney,
    Debt,
}

/// Recurrence unit used by accounts (payoff/end-date offsets) and reminders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub changed: i64,
    pub user: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<i32>,
    #[serde(rename = "type")]
    pub kind: AccountType,
    pub title: String,
    #[serde(rename = "syncID", skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,
    pub in_balance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings: Option<bool>,
    pub enable_correction: bool,
    #[serde(rename = "enableSMS")]
    pub enable_sms: bool,
    pub archive: bool,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capitalization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date_offset: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date_offset_interval: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_step: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_interval: Option<Interval>,
}

/// A transaction category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub changed: i64,
    pub user: i32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<i64>,
    pub show_income: bool,
    pub show_outcome: bool,
    pub budget_income: bool,
    pub budget_outcome: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Merchant {
    pub id: Uuid,
    pub changed: i64,
    pub user: i32,
    pub title: String,
}

/// Planned income and outcome for one category and month. A `None` tag is
/// the budget for uncategorized operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Budget {
    pub changed: i64,
    pub user: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Uuid>,
    pub date: NaiveDate,
    pub income: f64,
    pub income_lock: bool,
    pub outcome: f64,
    pub outcome_lock: bool,
}

/// A recurring planned operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub changed: i64,
    pub user: i32,
    pub income_instrument: i32,
    pub income_account: Uuid,
    pub income: f64,
    pub outcome_instrument: i32,
    pub outcome_account: Uuid,
    pub outcome: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<i32>>,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub notify: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMarkerState {
    #[default]
    Planned,
    Processed,
    Deleted,
}

/// One scheduled occurrence of a `Reminder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReminderMarker {
    pub id: Uuid,
    pub changed: i64,
    pub user: i32,
    pub income_instrument: i32,
    pub income_account: Uuid,
    pub income: f64,
    pub outcome_instrument: i32,
    pub outcome_account: Uuid,
    pub outcome: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub date: NaiveDate,
    pub reminder: Uuid,
    pub state: ReminderMarkerState,
    pub notify: bool,
}

/// A money movement. Transfers carry both an income and an outcome side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub changed: i64,
    pub created: i64,
    pub user: i32,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<bool>,
    pub income_instrument: i32,
    pub income_account: Uuid,
    pub income: f64,
    pub outcome_instrument: i32,
    pub outcome_account: Uuid,
    pub outcome: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_marker: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_income_instrument: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_outcome: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_outcome_instrument: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "incomeBankID", skip_serializing_if = "Option::is_none")]
    pub income_bank_id: Option<String>,
    #[serde(rename = "outcomeBankID", skip_serializing_if = "Option::is_none")]
    pub outcome_bank_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

/// Partial transaction sent to the suggestion endpoint. Only the fields that
/// are set go on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_account: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_account: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcc: Option<i32>,
}

impl TransactionDraft {
    pub fn with_payee(payee: impl Into<String>) -> Self {
        Self {
            payee: Some(payee.into()),
            ..Self::default()
        }
    }
}

impl From<&Transaction> for TransactionDraft {
    /// Ask for suggestions on a transaction that already exists.
    fn from(tx: &Transaction) -> Self {
        Self {
            id: Some(tx.id),
            payee: tx.payee.clone(),
            original_payee: tx.original_payee.clone(),
            comment: tx.comment.clone(),
            merchant: tx.merchant,
            tag: tx.tag.clone(),
            income: Some(tx.income),
            outcome: Some(tx.outcome),
            income_account: Some(tx.income_account),
            outcome_account: Some(tx.outcome_account),
            date: Some(tx.date),
            mcc: tx.mcc,
        }
    }
}

/// A record of an object removed on the server or by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deletion {
    pub id: String,
    pub object: EntityType,
    #[serde(default)]
    pub stamp: i64,
    #[serde(default)]
    pub user: i32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn instrument_decodes_partial_payload() {
        let instrument: Instrument = serde_json::from_value(json!({
            "id": 1,
            "shortTitle": "USD",
            "rate": 74.5,
            "changed": 1642300700
        }))
        .unwrap();
        assert_eq!(instrument.id, 1);
        assert_eq!(instrument.short_title, "USD");
        assert_eq!(instrument.rate, 74.5);
        assert!(instrument.title.is_empty());
    }

    #[test]
    fn account_null_balance_stays_absent() {
        let account: Account = serde_json::from_value(json!({
            "id": "7f0c2d2e-58c5-4f6e-8a7b-3c1d2e3f4a5b",
            "type": "ccard",
            "title": "Visa",
            "balance": null,
            "syncID": ["1234"],
            "enableSMS": true
        }))
        .unwrap();
        assert_eq!(account.kind, AccountType::Ccard);
        assert_eq!(account.balance, None);
        assert_eq!(account.sync_id, Some(vec!["1234".to_string()]));
        assert!(account.enable_sms);
    }

    #[test]
    fn account_zero_balance_is_reported() {
        let account: Account = serde_json::from_value(json!({ "balance": 0.0 })).unwrap();
        assert_eq!(account.balance, Some(0.0));
    }

    #[test]
    fn transaction_uses_wire_names() {
        let tx = Transaction {
            payee: Some("McDonalds".to_string()),
            income_bank_id: Some("bank-1".to_string()),
            reminder_marker: None,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            ..Transaction::default()
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["payee"], "McDonalds");
        assert_eq!(value["incomeBankID"], "bank-1");
        assert_eq!(value["date"], "2024-01-15");
        assert!(value.get("reminderMarker").is_none());
        assert!(value.get("comment").is_none());
    }

    #[test]
    fn draft_from_transaction_keeps_identity_and_amounts() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            payee: Some("Starbucks".to_string()),
            outcome: 4.5,
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            ..Transaction::default()
        };
        let value = serde_json::to_value(TransactionDraft::from(&tx)).unwrap();
        assert_eq!(value["id"], json!(tx.id));
        assert_eq!(value["outcome"], 4.5);
        assert_eq!(value["date"], "2024-03-02");
        assert!(value.get("merchant").is_none());
    }

    #[test]
    fn deletion_names_entity_type() {
        let deletion: Deletion = serde_json::from_value(json!({
            "id": "a1",
            "object": "reminderMarker",
            "stamp": 1700000000,
            "user": 5
        }))
        .unwrap();
        assert_eq!(deletion.object, EntityType::ReminderMarker);
    }

    #[test]
    fn deletion_without_object_is_rejected() {
        let result = serde_json::from_value::<Deletion>(json!({ "id": "a1", "stamp": 1 }));
        assert!(result.is_err());
    }
}
