use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::audit_logs;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = audit_logs)]
pub struct AuditLogEntity {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, PartialEq)]
#[diesel(table_name = audit_logs)]
pub struct InsertAuditLogEntity {
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: String,
    pub detail: serde_json::Value,
}

impl InsertAuditLogEntity {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity: impl Into<String>,
        entity_id: impl ToString,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            entity: entity.into(),
            entity_id: entity_id.to_string(),
            detail,
        }
    }
}
