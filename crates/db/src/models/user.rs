use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{ids, page::Page};
pub use crate::types::Profile;
use crate::entities::{change_status, ticket, user};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    NotFound,
    #[error("E-mail already registered")]
    EmailTaken,
}

/// Public view of an account. The password hash never leaves this module
/// except through [`User::find_credentials_by_email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile: Option<Profile>,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            email: model.email,
            profile: model.profile,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn has_profile(&self, profiles: &[Profile]) -> bool {
        profiles.contains(&self.profile)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim()))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Returns the user together with the stored password hash.
    pub async fn find_credentials_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim()))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let password = model.password.clone();
            (Self::from_model(model), password)
        }))
    }

    pub(crate) async fn find_by_row_ids<C: ConnectionTrait>(
        db: &C,
        row_ids: &[i64],
    ) -> Result<HashMap<i64, Self>, DbErr> {
        if row_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records = user::Entity::find()
            .filter(user::Column::Id.is_in(row_ids.to_vec()))
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| (model.id, Self::from_model(model)))
            .collect())
    }

    pub async fn find_page<C: ConnectionTrait>(
        db: &C,
        page: u64,
        size: u64,
    ) -> Result<Page<Self>, DbErr> {
        let paginator = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .paginate(db, size);
        let totals = paginator.num_items_and_pages().await?;
        let records = paginator.fetch_page(page).await?;

        Ok(Page {
            content: records.into_iter().map(Self::from_model).collect(),
            page,
            size,
            total_elements: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateUser) -> Result<Self, UserError> {
        let email = data.email.trim().to_string();
        if Self::find_by_email(db, &email).await?.is_some() {
            return Err(UserError::EmailTaken);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            email: Set(email),
            password: Set(data.password_hash.clone()),
            profile: Set(data.profile),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Self, UserError> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::NotFound)?;

        let mut active: user::ActiveModel = record.clone().into();
        if let Some(email) = data.email.as_deref().map(str::trim) {
            if email != record.email {
                if Self::find_by_email(db, email).await?.is_some() {
                    return Err(UserError::EmailTaken);
                }
                active.email = Set(email.to_string());
            }
        }
        if let Some(password_hash) = data.password_hash.clone() {
            active.password = Set(password_hash);
        }
        if let Some(profile) = data.profile {
            active.profile = Set(profile);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Whether a ticket is owned by, or a status change was written by, this
    /// account.
    pub async fn has_history<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool, DbErr> {
        let Some(row_id) = ids::user_id_by_uuid(db, id).await? else {
            return Ok(false);
        };
        let owned = ticket::Entity::find()
            .filter(ticket::Column::UserId.eq(row_id))
            .count(db)
            .await?;
        if owned > 0 {
            return Ok(true);
        }
        let changes = change_status::Entity::find()
            .filter(change_status::Column::UserId.eq(row_id))
            .count(db)
            .await?;
        Ok(changes > 0)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = user::Entity::delete_many()
            .filter(user::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn new_user(email: &str, profile: Profile) -> CreateUser {
        CreateUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            profile,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let db = setup_db().await;

        let user = User::create(&db, &new_user("a@helpdesk.com", Profile::Customer))
            .await
            .unwrap();
        assert_eq!(user.profile, Profile::Customer);

        let err = User::create(&db, &new_user(" a@helpdesk.com ", Profile::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn credentials_lookup_returns_stored_hash() {
        let db = setup_db().await;
        User::create(&db, &new_user("tech@helpdesk.com", Profile::Technician))
            .await
            .unwrap();

        let (user, hash) = User::find_credentials_by_email(&db, "tech@helpdesk.com")
            .await
            .unwrap()
            .expect("credentials");
        assert_eq!(user.email, "tech@helpdesk.com");
        assert_eq!(hash, "hash");
        assert!(
            User::find_credentials_by_email(&db, "nobody@helpdesk.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_changes_only_provided_fields() {
        let db = setup_db().await;
        let user = User::create(&db, &new_user("c@helpdesk.com", Profile::Customer))
            .await
            .unwrap();
        User::create(&db, &new_user("taken@helpdesk.com", Profile::Customer))
            .await
            .unwrap();

        let updated = User::update(
            &db,
            user.id,
            &UpdateUser {
                profile: Some(Profile::Technician),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.email, "c@helpdesk.com");
        assert_eq!(updated.profile, Profile::Technician);

        let err = User::update(
            &db,
            user.id,
            &UpdateUser {
                email: Some("taken@helpdesk.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));

        let err = User::update(&db, Uuid::new_v4(), &UpdateUser::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }

    #[tokio::test]
    async fn find_page_orders_by_email() {
        let db = setup_db().await;
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            User::create(&db, &new_user(email, Profile::Customer))
                .await
                .unwrap();
        }

        let page = User::find_page(&db, 0, 2).await.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        let emails: Vec<_> = page.content.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);

        let page = User::find_page(&db, 1, 2).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].email, "c@x.com");
    }
}
