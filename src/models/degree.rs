use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::require_text;
use crate::engine::credential;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DegreeStatus {
    Pending,
    Approved,
    Revoked,
}

impl fmt::Display for DegreeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DegreeStatus::Pending => "pending",
            DegreeStatus::Approved => "approved",
            DegreeStatus::Revoked => "revoked",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Degree {
    pub id: String,
    pub student_email: String,
    pub degree_title: String,
    pub college_name: String,
    pub graduation_date: String,
    pub status: DegreeStatus,
    /// Plaintext secret, or `blake3:<hex>` in hashed mode. Never serialized.
    #[serde(skip_serializing, default)]
    pub access_password: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Certificate view released by a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub degree_id: String,
    pub student_email: String,
    pub degree_title: String,
    pub college_name: String,
    pub graduation_date: String,
    pub status: DegreeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDegreeRequest {
    pub student_email: String,
    pub degree_title: String,
    pub college_name: String,
    pub graduation_date: String,
    /// Generated when absent.
    pub access_password: Option<String>,
}

impl NewDegreeRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_text("degree_title", &self.degree_title)?;
        require_text("college_name", &self.college_name)?;
        NaiveDate::parse_from_str(self.graduation_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("graduation_date must be YYYY-MM-DD: {:?}", self.graduation_date))?;
        if let Some(password) = &self.access_password {
            credential::check_supplied_password(password)?;
        }
        Ok(())
    }
}

/// Returned once on creation or password reset; the only time the plaintext
/// secret leaves the service in hashed mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedDegree {
    pub degree: Degree,
    pub access_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDegreeStatusRequest {
    pub status: DegreeStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub access_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub access_password: String,
}
