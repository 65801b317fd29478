use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ids, user::User};
pub use crate::types::TicketStatus;
use crate::entities::change_status;

/// One audit entry of a ticket's status history. Entries are only ever
/// appended; nothing updates or removes them except deleting the ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub id: Uuid,
    pub user_change: User,
    pub date_change_status: DateTime<Utc>,
    pub status: TicketStatus,
}

impl ChangeStatus {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        ticket_id: Uuid,
        actor_id: Uuid,
        status: TicketStatus,
    ) -> Result<Self, DbErr> {
        let ticket_row_id = ids::ticket_id_by_uuid(db, ticket_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))?;
        let actor = User::find_by_id(db, actor_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let actor_row_id = ids::user_id_by_uuid(db, actor_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let active = change_status::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            ticket_id: Set(ticket_row_id),
            user_id: Set(actor_row_id),
            status: Set(status),
            date_change_status: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        Ok(Self {
            id: model.uuid,
            user_change: actor,
            date_change_status: model.date_change_status.into(),
            status: model.status,
        })
    }

    /// Newest first; entries written within the same instant keep insertion
    /// order reversed.
    pub async fn find_by_ticket_id<C: ConnectionTrait>(
        db: &C,
        ticket_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(ticket_row_id) = ids::ticket_id_by_uuid(db, ticket_id).await? else {
            return Ok(Vec::new());
        };

        let models = change_status::Entity::find()
            .filter(change_status::Column::TicketId.eq(ticket_row_id))
            .order_by_desc(change_status::Column::DateChangeStatus)
            .order_by_desc(change_status::Column::Id)
            .all(db)
            .await?;

        let mut actor_ids: Vec<i64> = models.iter().map(|model| model.user_id).collect();
        actor_ids.sort_unstable();
        actor_ids.dedup();
        let actors = User::find_by_row_ids(db, &actor_ids).await?;

        models
            .into_iter()
            .map(|model| {
                let user_change = actors
                    .get(&model.user_id)
                    .cloned()
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
                Ok(Self {
                    id: model.uuid,
                    user_change,
                    date_change_status: model.date_change_status.into(),
                    status: model.status,
                })
            })
            .collect()
    }

    pub(crate) async fn delete_by_ticket_row_id<C: ConnectionTrait>(
        db: &C,
        ticket_row_id: i64,
    ) -> Result<u64, DbErr> {
        let result = change_status::Entity::delete_many()
            .filter(change_status::Column::TicketId.eq(ticket_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
