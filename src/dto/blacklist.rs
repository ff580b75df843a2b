use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::BlacklistEntry;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddBlacklistRequest {
    pub phone: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlacklistList {
    pub items: Vec<BlacklistEntry>,
}
