//! Request and response envelopes of the `diff/` endpoint.
//!
//! # Design
//! A `Request` names the client's clock, the last server timestamp the
//! client has seen (0 for a full sync) and, optionally, entity types to
//! refresh in full. It can also carry local changes for upload. A `Response`
//! carries the new server timestamp plus one sequence per entity type; an
//! absent or `null` sequence means "no changes of that type". Upload and
//! response sequences are omitted from JSON when empty.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Account, Budget, Company, Deletion, Instrument, Merchant, Reminder, ReminderMarker, Tag,
    Transaction, User,
};

/// A synchronizable resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Instrument,
    Company,
    User,
    Account,
    Tag,
    Merchant,
    Budget,
    Reminder,
    ReminderMarker,
    Transaction,
}

impl EntityType {
    pub const ALL: [EntityType; 10] = [
        EntityType::Instrument,
        EntityType::Company,
        EntityType::User,
        EntityType::Account,
        EntityType::Tag,
        EntityType::Merchant,
        EntityType::Budget,
        EntityType::Reminder,
        EntityType::ReminderMarker,
        EntityType::Transaction,
    ];

    /// Wire name of the entity type.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Instrument => "instrument",
            EntityType::Company => "company",
            EntityType::User => "user",
            EntityType::Account => "account",
            EntityType::Tag => "tag",
            EntityType::Merchant => "merchant",
            EntityType::Budget => "budget",
            EntityType::Reminder => "reminder",
            EntityType::ReminderMarker => "reminderMarker",
            EntityType::Transaction => "transaction",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `diff/` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Client clock, seconds since the Unix epoch.
    pub current_client_timestamp: i64,
    /// Last server timestamp seen by the client; 0 requests everything.
    pub server_timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub force_fetch: Vec<EntityType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instrument: Vec<Instrument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub company: Vec<Company>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account: Vec<Account>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merchant: Vec<Merchant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub budget: Vec<Budget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminder: Vec<Reminder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminder_marker: Vec<ReminderMarker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transaction: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletion: Vec<Deletion>,
}

impl Request {
    /// Request the entire dataset.
    pub fn full(now: i64) -> Self {
        Self::since(now, 0)
    }

    /// Request every change after `server_timestamp`.
    pub fn since(now: i64, server_timestamp: i64) -> Self {
        Self {
            current_client_timestamp: now,
            server_timestamp,
            ..Self::default()
        }
    }

    /// Request a full refresh of `entity_types` alongside the regular diff.
    pub fn force(now: i64, entity_types: &[EntityType]) -> Self {
        Self {
            current_client_timestamp: now,
            force_fetch: entity_types.to_vec(),
            ..Self::default()
        }
    }

    /// Check timestamp sanity before the request leaves the process.
    ///
    /// A non-zero server timestamp may not be ahead of the client clock.
    pub fn validate(&self) -> Result<()> {
        if self.current_client_timestamp < 0 || self.server_timestamp < 0 {
            return Err(Error::invalid_request("timestamps must not be negative"));
        }
        if self.server_timestamp != 0 && self.server_timestamp > self.current_client_timestamp {
            return Err(Error::invalid_request(format!(
                "server timestamp {} is ahead of client timestamp {}",
                self.server_timestamp, self.current_client_timestamp
            )));
        }
        Ok(())
    }
}

/// Body of a `diff/` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Response {
    pub server_timestamp: i64,

    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub instrument: Vec<Instrument>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub company: Vec<Company>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub user: Vec<User>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub account: Vec<Account>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Tag>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub merchant: Vec<Merchant>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub budget: Vec<Budget>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub reminder: Vec<Reminder>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub reminder_marker: Vec<ReminderMarker>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub transaction: Vec<Transaction>,
    #[serde(deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub deletion: Vec<Deletion>,
}

impl Response {
    /// The server timestamp as a point in time, for threading into
    /// `sync_since`.
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.server_timestamp, 0)
    }

    /// True when the response carries no entities at all.
    pub fn is_empty(&self) -> bool {
        self.instrument.is_empty()
            && self.company.is_empty()
            && self.user.is_empty()
            && self.account.is_empty()
            && self.tag.is_empty()
            && self.merchant.is_empty()
            && self.budget.is_empty()
            && self.reminder.is_empty()
            && self.reminder_marker.is_empty()
            && self.transaction.is_empty()
            && self.deletion.is_empty()
    }
}

/// Decode a sequence the server may send as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entity_type_wire_names() {
        for entity in EntityType::ALL {
            let value = serde_json::to_value(entity).unwrap();
            assert_eq!(value, json!(entity.as_str()));
        }
        assert_eq!(EntityType::ReminderMarker.to_string(), "reminderMarker");
    }

    #[test]
    fn full_request_serializes_minimal_body() {
        let body = serde_json::to_value(Request::full(1700000000)).unwrap();
        assert_eq!(
            body,
            json!({ "currentClientTimestamp": 1700000000, "serverTimestamp": 0 })
        );
    }

    #[test]
    fn force_request_lists_entity_types() {
        let req = Request::force(1700000000, &[EntityType::Transaction, EntityType::Account]);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["forceFetch"], json!(["transaction", "account"]));
        assert_eq!(body["serverTimestamp"], 0);
    }

    #[test]
    fn validate_rejects_server_ahead_of_client() {
        let err = Request::since(100, 200).validate().unwrap_err();
        assert!(err.is_invalid_request());
        assert!(Request::since(200, 200).validate().is_ok());
        assert!(Request::full(0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_timestamps() {
        assert!(Request::since(-1, 0).validate().unwrap_err().is_invalid_request());
    }

    #[test]
    fn response_missing_sequences_are_empty() {
        let resp: Response = serde_json::from_value(json!({ "serverTimestamp": 42 })).unwrap();
        assert_eq!(resp.server_timestamp, 42);
        assert!(resp.is_empty());
        assert_eq!(resp.server_time().unwrap().timestamp(), 42);
    }

    #[test]
    fn response_null_sequences_are_empty() {
        let resp: Response = serde_json::from_value(json!({
            "serverTimestamp": 42,
            "instrument": null,
            "deletion": null,
            "transaction": [{ "payee": "McDonalds" }]
        }))
        .unwrap();
        assert!(resp.instrument.is_empty());
        assert!(resp.deletion.is_empty());
        assert_eq!(resp.transaction.len(), 1);
    }

    #[test]
    fn response_reminder_marker_uses_camel_case_key() {
        let resp: Response = serde_json::from_value(json!({
            "serverTimestamp": 1,
            "reminderMarker": [{ "state": "processed" }]
        }))
        .unwrap();
        assert_eq!(resp.reminder_marker.len(), 1);
        assert!(!resp.is_empty());
    }
}
