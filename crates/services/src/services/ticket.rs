use std::str::FromStr;

use db::{
    DbErr, DbPool, TransactionTrait,
    models::{
        change_status::ChangeStatus,
        page::{Page, checked_offset},
        ticket::{
            CreateTicket, Priority, Ticket, TicketError, TicketFilter, TicketStatus,
            TicketWithChanges,
        },
        user::{Profile, User},
    },
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Placeholder the clients send for "no constraint" in path-encoded filters.
pub const UNINFORMED: &str = "uninformed";

const TICKET_NUMBER_LIMIT: i64 = 9999;

#[derive(Debug, Error)]
pub enum TicketServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Register not found id: {0}")]
    NotFound(Uuid),
    #[error("Ticket {0} belongs to another user")]
    Forbidden(Uuid),
}

pub type Result<T> = std::result::Result<T, TicketServiceError>;

fn validation(message: impl Into<String>) -> TicketServiceError {
    TicketServiceError::Validation(vec![message.into()])
}

/// Body of `POST`/`PUT /api/ticket`. Only title, description and priority are
/// ever copied onto a stored ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketPayload {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
}

impl TicketPayload {
    fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    fn description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .map(str::to_string)
    }

    fn priority(&self) -> std::result::Result<Option<Priority>, String> {
        match self
            .priority
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            Some(raw) => Priority::from_str(raw)
                .map(Some)
                .map_err(|_| format!("Invalid priority: {raw}")),
            None => Ok(None),
        }
    }
}

/// Raw path segments of the search endpoint.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub page: u64,
    pub count: u64,
    pub number: i64,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assigned: bool,
}

fn informed(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNINFORMED) {
        None
    } else {
        Some(trimmed)
    }
}

pub fn parse_status(raw: &str) -> Result<TicketStatus> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation("Status no information"));
    }
    TicketStatus::from_str(trimmed).map_err(|_| validation(format!("Invalid status: {trimmed}")))
}

impl SearchParams {
    /// Builds the conjunctive filter for `actor`. Customers are always scoped
    /// to their own tickets; technicians only when `assigned` is set.
    pub fn to_filter(&self, actor: &User) -> Result<TicketFilter> {
        let mut filter = TicketFilter::default();

        if self.number > 0 {
            filter.number = Some(self.number);
        } else {
            let mut errors = Vec::new();
            filter.title = informed(&self.title).map(str::to_string);
            if let Some(raw) = informed(&self.status) {
                match TicketStatus::from_str(raw) {
                    Ok(status) => filter.status = Some(status),
                    Err(_) => errors.push(format!("Invalid status: {raw}")),
                }
            }
            if let Some(raw) = informed(&self.priority) {
                match Priority::from_str(raw) {
                    Ok(priority) => filter.priority = Some(priority),
                    Err(_) => errors.push(format!("Invalid priority: {raw}")),
                }
            }
            if !errors.is_empty() {
                return Err(TicketServiceError::Validation(errors));
            }
            if actor.profile == Profile::Technician && self.assigned {
                filter.assigned_user_id = Some(actor.id);
            }
        }

        if actor.profile == Profile::Customer {
            filter.owner_id = Some(actor.id);
        }

        Ok(filter)
    }
}

/// Ticket counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub amount_new: u64,
    pub amount_resolved: u64,
    pub amount_approved: u64,
    pub amount_disapproved: u64,
    pub amount_assigned: u64,
    pub amount_closed: u64,
}

impl TicketSummary {
    pub fn tally(statuses: impl IntoIterator<Item = TicketStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            let counter = match status {
                TicketStatus::New => &mut summary.amount_new,
                TicketStatus::Resolved => &mut summary.amount_resolved,
                TicketStatus::Approved => &mut summary.amount_approved,
                TicketStatus::Disapproved => &mut summary.amount_disapproved,
                TicketStatus::Assigned => &mut summary.amount_assigned,
                TicketStatus::Closed => &mut summary.amount_closed,
            };
            *counter += 1;
        }
        summary
    }
}

#[derive(Clone)]
pub struct TicketService {
    max_page_size: u64,
}

impl TicketService {
    pub fn new(max_page_size: u64) -> Self {
        Self {
            max_page_size: max_page_size.max(1),
        }
    }

    /// Clamped page size, rejecting pages whose row offset cannot be expressed.
    fn page_size(&self, page: u64, count: u64) -> Result<u64> {
        let size = count.clamp(1, self.max_page_size);
        checked_offset(page, size)
            .map(|_| size)
            .ok_or_else(|| validation("Invalid page"))
    }

    fn generate_number() -> i64 {
        rand::thread_rng().gen_range(0..TICKET_NUMBER_LIMIT)
    }

    /// Customers may only touch tickets they own.
    pub fn ensure_visible(actor: &User, ticket: &Ticket) -> Result<()> {
        if actor.profile == Profile::Customer && !ticket.is_owned_by(actor.id) {
            return Err(TicketServiceError::Forbidden(ticket.id));
        }
        Ok(())
    }

    async fn load_visible(&self, pool: &DbPool, actor: &User, id: Uuid) -> Result<Ticket> {
        let ticket = Ticket::find_by_id(pool, id)
            .await?
            .ok_or(TicketServiceError::NotFound(id))?;
        Self::ensure_visible(actor, &ticket)?;
        Ok(ticket)
    }

    pub async fn create(
        &self,
        pool: &DbPool,
        actor: &User,
        payload: &TicketPayload,
    ) -> Result<Ticket> {
        let mut errors = Vec::new();
        if payload.title().is_none() {
            errors.push("Title no information".to_string());
        }
        let priority = payload.priority().unwrap_or_else(|err| {
            errors.push(err);
            None
        });
        let Some(title) = payload.title().filter(|_| errors.is_empty()) else {
            return Err(TicketServiceError::Validation(errors));
        };

        let data = CreateTicket {
            number: Self::generate_number(),
            title: title.to_string(),
            description: payload.description(),
            priority: priority.unwrap_or_default(),
        };
        let ticket = Ticket::create(pool, actor.id, &data, Uuid::new_v4()).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            number = ticket.number,
            user = %actor.email,
            "Ticket created"
        );
        Ok(ticket)
    }

    pub async fn update(
        &self,
        pool: &DbPool,
        actor: &User,
        payload: &TicketPayload,
    ) -> Result<Ticket> {
        let mut errors = Vec::new();
        if payload.id.is_none() {
            errors.push("Id no information".to_string());
        }
        if payload.title().is_none() {
            errors.push("Title no information".to_string());
        }
        let priority = payload.priority().unwrap_or_else(|err| {
            errors.push(err);
            None
        });
        let (Some(id), Some(title), true) = (payload.id, payload.title(), errors.is_empty()) else {
            return Err(TicketServiceError::Validation(errors));
        };

        let current = self.load_visible(pool, actor, id).await?;
        let ticket = Ticket::update_details(
            pool,
            id,
            title.to_string(),
            payload.description(),
            priority.unwrap_or(current.priority),
        )
        .await?;

        tracing::debug!(ticket_id = %id, user = %actor.email, "Ticket updated");
        Ok(ticket)
    }

    pub async fn with_changes(
        &self,
        pool: &DbPool,
        actor: &User,
        ticket: Ticket,
    ) -> Result<TicketWithChanges> {
        Self::ensure_visible(actor, &ticket)?;
        Ok(ticket.with_changes(pool).await?)
    }

    pub async fn delete(&self, pool: &DbPool, actor: &User, ticket: &Ticket) -> Result<()> {
        Self::ensure_visible(actor, ticket)?;
        let txn = pool.begin().await?;
        Ticket::delete(&txn, ticket.id).await?;
        txn.commit().await?;

        tracing::info!(ticket_id = %ticket.id, user = %actor.email, "Ticket deleted");
        Ok(())
    }

    /// Technicians see every ticket, customers their own, newest first.
    pub async fn list(
        &self,
        pool: &DbPool,
        actor: &User,
        page: u64,
        count: u64,
    ) -> Result<Page<Ticket>> {
        let filter = TicketFilter {
            owner_id: (actor.profile == Profile::Customer).then_some(actor.id),
            ..Default::default()
        };
        let size = self.page_size(page, count)?;
        Ok(Ticket::search(pool, &filter, page, size).await?)
    }

    pub async fn search(
        &self,
        pool: &DbPool,
        actor: &User,
        params: &SearchParams,
    ) -> Result<Page<Ticket>> {
        let size = self.page_size(params.page, params.count)?;
        let filter = params.to_filter(actor)?;
        Ok(Ticket::search(pool, &filter, params.page, size).await?)
    }

    /// Applies the status and appends the audit entry atomically. Any status
    /// may follow any other.
    pub async fn change_status(
        &self,
        pool: &DbPool,
        actor: &User,
        id: Uuid,
        raw_status: &str,
    ) -> Result<TicketWithChanges> {
        let status = parse_status(raw_status)?;
        self.load_visible(pool, actor, id).await?;

        let txn = pool.begin().await?;
        let ticket = Ticket::apply_status(&txn, id, status, actor.id).await?;
        ChangeStatus::create(&txn, id, actor.id, status).await?;
        txn.commit().await?;

        tracing::info!(
            ticket_id = %id,
            status = %status,
            user = %actor.email,
            "Ticket status changed"
        );
        Ok(ticket.with_changes(pool).await?)
    }

    pub async fn summary(&self, pool: &DbPool) -> Result<TicketSummary> {
        let statuses = Ticket::find_all_statuses(pool).await?;
        Ok(TicketSummary::tally(statuses))
    }
}
