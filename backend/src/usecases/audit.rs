use std::sync::Arc;

use tourops_core::domain::{
    entities::audit_logs::InsertAuditLogEntity, repositories::audit_logs::AuditLogRepository,
};
use tracing::warn;

/// Fire-and-forget audit sink. Failures are logged and swallowed.
pub struct AuditTrail<A>
where
    A: AuditLogRepository + Send + Sync + 'static,
{
    audit_repo: Arc<A>,
}

impl<A> AuditTrail<A>
where
    A: AuditLogRepository + Send + Sync + 'static,
{
    pub fn new(audit_repo: Arc<A>) -> Self {
        Self { audit_repo }
    }

    pub async fn record(&self, entry: InsertAuditLogEntity) {
        let action = entry.action.clone();
        let entity_id = entry.entity_id.clone();
        if let Err(err) = self.audit_repo.record(entry).await {
            warn!(
                action = %action,
                entity_id = %entity_id,
                db_error = ?err,
                "audit: failed to record entry"
            );
        }
    }
}
