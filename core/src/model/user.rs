// src/model/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Marketplace role. A tagged enum rather than free-form strings: adding a
/// role forces every match over it to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Patient,
  Pharmacist,
  Driver,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::Patient => "patient",
      Role::Pharmacist => "pharmacist",
      Role::Driver => "driver",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "patient" => Ok(Role::Patient),
      "pharmacist" => Ok(Role::Pharmacist),
      "driver" => Ok(Role::Driver),
      "admin" => Ok(Role::Admin),
      other => Err(format!("unknown role '{}'", other)),
    }
  }
}

/// Directory record for any actor. Pharmacists carry the id of the pharmacy
/// they own; `active` gates drivers out of assignment and broadcast.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub role: Role,
  pub pharmacy_id: Option<Uuid>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}
