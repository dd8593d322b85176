use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::audit_logs::InsertAuditLogEntity;

#[automock]
#[async_trait]
pub trait AuditLogRepository {
    async fn record(&self, entry: InsertAuditLogEntity) -> Result<()>;
}
