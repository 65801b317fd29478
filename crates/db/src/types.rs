use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum Profile {
    #[sea_orm(string_value = "ADMIN")]
    #[serde(alias = "ROLE_ADMIN")]
    #[strum(to_string = "ADMIN", serialize = "ROLE_ADMIN")]
    Admin,
    #[sea_orm(string_value = "TECHNICIAN")]
    #[serde(alias = "ROLE_TECHNICIAN")]
    #[strum(to_string = "TECHNICIAN", serialize = "ROLE_TECHNICIAN")]
    Technician,
    #[sea_orm(string_value = "CUSTOMER")]
    #[serde(alias = "ROLE_CUSTOMER")]
    #[strum(to_string = "CUSTOMER", serialize = "ROLE_CUSTOMER")]
    Customer,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TicketStatus {
    #[default]
    #[sea_orm(string_value = "New")]
    New,
    #[sea_orm(string_value = "Assigned")]
    Assigned,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Disapproved")]
    Disapproved,
    #[sea_orm(string_value = "Resolved")]
    Resolved,
    #[sea_orm(string_value = "Closed")]
    Closed,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Priority {
    #[sea_orm(string_value = "High")]
    High,
    #[default]
    #[sea_orm(string_value = "Normal")]
    Normal,
    #[sea_orm(string_value = "Low")]
    Low,
}
