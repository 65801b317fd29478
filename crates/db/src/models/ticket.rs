use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{change_status::ChangeStatus, ids, page::Page, user::User};
pub use crate::types::{Priority, TicketStatus};
use crate::entities::ticket;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Ticket not found")]
    NotFound,
    #[error("User not found")]
    UserNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub number: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub date: DateTime<Utc>,
    pub user: User,
    pub assigned_user: Option<User>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithChanges {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub changes: Vec<ChangeStatus>,
}

impl std::ops::Deref for TicketWithChanges {
    type Target = Ticket;
    fn deref(&self) -> &Self::Target {
        &self.ticket
    }
}

#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub number: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
}

/// Conjunctive search criteria; `None` leaves a field unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub number: Option<i64>,
    pub title: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub owner_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
}

impl Ticket {
    fn assemble(model: ticket::Model, users: &HashMap<i64, User>) -> Result<Self, DbErr> {
        let user = users
            .get(&model.user_id)
            .cloned()
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let assigned_user = match model.assigned_user_id {
            Some(row_id) => Some(
                users
                    .get(&row_id)
                    .cloned()
                    .ok_or(DbErr::RecordNotFound("User not found".to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            number: model.number,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            date: model.date.into(),
            user,
            assigned_user,
            updated_at: model.updated_at.into(),
        })
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<ticket::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut user_ids: Vec<i64> = models
            .iter()
            .flat_map(|model| std::iter::once(model.user_id).chain(model.assigned_user_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = User::find_by_row_ids(db, &user_ids).await?;

        models
            .into_iter()
            .map(|model| Self::assemble(model, &users))
            .collect()
    }

    async fn from_model<C: ConnectionTrait>(db: &C, model: ticket::Model) -> Result<Self, DbErr> {
        let mut tickets = Self::from_models(db, vec![model]).await?;
        tickets
            .pop()
            .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))
    }

    async fn find_model<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<ticket::Model>, DbErr> {
        ticket::Entity::find()
            .filter(ticket::Column::Uuid.eq(id))
            .one(db)
            .await
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user.id == user_id
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        match Self::find_model(db, id).await? {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn with_changes<C: ConnectionTrait>(
        self,
        db: &C,
    ) -> Result<TicketWithChanges, DbErr> {
        let changes = ChangeStatus::find_by_ticket_id(db, self.id).await?;
        Ok(TicketWithChanges {
            ticket: self,
            changes,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        owner_id: Uuid,
        data: &CreateTicket,
        ticket_id: Uuid,
    ) -> Result<Self, TicketError> {
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(TicketError::UserNotFound)?;

        let now = Utc::now();
        let active = ticket::ActiveModel {
            uuid: Set(ticket_id),
            number: Set(data.number),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(TicketStatus::New),
            priority: Set(data.priority),
            date: Set(now.into()),
            user_id: Set(owner_row_id),
            assigned_user_id: Set(None),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    /// Rewrites the editable fields only. Owner, date, number, status and
    /// assignment are left as stored.
    pub async fn update_details<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        title: String,
        description: Option<String>,
        priority: Priority,
    ) -> Result<Self, TicketError> {
        let record = Self::find_model(db, id)
            .await?
            .ok_or(TicketError::NotFound)?;

        let mut active: ticket::ActiveModel = record.into();
        active.title = Set(title);
        active.description = Set(description);
        active.priority = Set(priority);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Sets the status; moving to `Assigned` also binds `actor_id` as the
    /// assigned technician.
    pub async fn apply_status<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        status: TicketStatus,
        actor_id: Uuid,
    ) -> Result<Self, TicketError> {
        let record = Self::find_model(db, id)
            .await?
            .ok_or(TicketError::NotFound)?;

        let mut active: ticket::ActiveModel = record.into();
        active.status = Set(status);
        if status == TicketStatus::Assigned {
            let actor_row_id = ids::user_id_by_uuid(db, actor_id)
                .await?
                .ok_or(TicketError::UserNotFound)?;
            active.assigned_user_id = Set(Some(actor_row_id));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(row_id) = ids::ticket_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        ChangeStatus::delete_by_ticket_row_id(db, row_id).await?;
        let result = ticket::Entity::delete_many()
            .filter(ticket::Column::Id.eq(row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Newest first, paged. An owner or assignee that does not exist matches
    /// nothing.
    pub async fn search<C: ConnectionTrait>(
        db: &C,
        filter: &TicketFilter,
        page: u64,
        size: u64,
    ) -> Result<Page<Self>, DbErr> {
        let mut condition = Condition::all();

        if let Some(number) = filter.number {
            condition = condition.add(ticket::Column::Number.eq(number));
        }
        if let Some(title) = filter
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
        {
            let pattern = format!("%{}%", title.to_lowercase());
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((ticket::Entity, ticket::Column::Title))))
                    .like(pattern),
            );
        }
        if let Some(status) = filter.status {
            condition = condition.add(ticket::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            condition = condition.add(ticket::Column::Priority.eq(priority));
        }
        if let Some(owner_id) = filter.owner_id {
            let Some(row_id) = ids::user_id_by_uuid(db, owner_id).await? else {
                return Ok(Page::empty(page, size));
            };
            condition = condition.add(ticket::Column::UserId.eq(row_id));
        }
        if let Some(assigned_user_id) = filter.assigned_user_id {
            let Some(row_id) = ids::user_id_by_uuid(db, assigned_user_id).await? else {
                return Ok(Page::empty(page, size));
            };
            condition = condition.add(ticket::Column::AssignedUserId.eq(row_id));
        }

        let paginator = ticket::Entity::find()
            .filter(condition)
            .order_by_desc(ticket::Column::Date)
            .order_by_desc(ticket::Column::Id)
            .paginate(db, size);
        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page).await?;

        Ok(Page {
            content: Self::from_models(db, models).await?,
            page,
            size,
            total_elements: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Status of every ticket, one row each.
    pub async fn find_all_statuses<C: ConnectionTrait>(db: &C) -> Result<Vec<TicketStatus>, DbErr> {
        ticket::Entity::find()
            .select_only()
            .column(ticket::Column::Status)
            .into_tuple()
            .all(db)
            .await
    }
}
