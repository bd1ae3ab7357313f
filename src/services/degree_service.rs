use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::engine::credential::{self, CredentialPolicy};
use crate::error::{AccessDenied, AppError};
use crate::models::{
    Certificate, CreatedDegree, Degree, DegreeStatus, NewDegreeRequest, normalize_email,
};

#[derive(Clone)]
pub struct DegreeService {
    db: SqlitePool,
    policy: CredentialPolicy,
}

impl DegreeService {
    pub fn new(db: SqlitePool, policy: CredentialPolicy) -> Self {
        Self { db, policy }
    }

    /// Creates a pending degree. The plaintext password is handed back once.
    pub async fn create(&self, req: NewDegreeRequest) -> Result<CreatedDegree, AppError> {
        req.validate().map_err(AppError::BadRequest)?;
        let student_email = normalize_email(&req.student_email).map_err(AppError::BadRequest)?;

        let password = self.choose_password(req.access_password);
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let degree = Degree {
            access_password: credential::seal_password(self.policy.mode, &id, &password),
            id,
            student_email,
            degree_title: req.degree_title.trim().to_string(),
            college_name: req.college_name.trim().to_string(),
            graduation_date: req.graduation_date.trim().to_string(),
            status: DegreeStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        };

        repository::insert_degree(&self.db, &degree).await?;
        info!("created degree {} for {}", degree.id, degree.student_email);

        Ok(CreatedDegree {
            degree,
            access_password: password,
        })
    }

    pub async fn update_status(&self, id: &str, next: DegreeStatus) -> Result<Degree, AppError> {
        let current = self.find(id).await?;
        let updated = credential::transition_degree(&current, next)
            .inspect_err(|e| warn!("status change refused for degree {}: {}", id, e))?;

        if !repository::update_degree_status(&self.db, &updated, current.status).await? {
            return Err(AppError::Conflict(format!(
                "degree {} changed while being updated",
                id
            )));
        }
        info!("degree {} moved {} -> {}", id, current.status, updated.status);
        Ok(updated)
    }

    pub async fn reset_password(
        &self,
        id: &str,
        requested: Option<String>,
    ) -> Result<CreatedDegree, AppError> {
        if let Some(password) = &requested {
            credential::check_supplied_password(password).map_err(AppError::BadRequest)?;
        }
        let mut degree = self.find(id).await?;

        let password = self.choose_password(requested);
        let sealed = credential::seal_password(self.policy.mode, &degree.id, &password);
        if !repository::update_degree_password(&self.db, &degree.id, &sealed).await? {
            return Err(AppError::NotFound);
        }
        degree.access_password = sealed;
        info!("access password reset for degree {}", degree.id);

        Ok(CreatedDegree {
            degree,
            access_password: password,
        })
    }

    /// A missing degree and a wrong password look the same to the caller.
    pub async fn unlock(&self, id: &str, supplied_password: &str) -> Result<Certificate, AppError> {
        let Some(degree) = repository::find_degree_by_id(&self.db, id).await? else {
            warn!("certificate unlock denied");
            return Err(AccessDenied.into());
        };
        let certificate = credential::unlock(&degree, supplied_password).inspect_err(|_| {
            warn!("certificate unlock denied");
        })?;
        info!("certificate released for degree {}", degree.id);
        Ok(certificate)
    }

    pub async fn list(&self, student_email: Option<&str>) -> Result<Vec<Degree>, AppError> {
        let student_email = student_email
            .map(normalize_email)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let degrees = repository::fetch_degrees(&self.db, student_email.as_deref()).await?;
        Ok(degrees)
    }

    fn choose_password(&self, requested: Option<String>) -> String {
        match requested {
            Some(password) => password.trim().to_string(),
            None => credential::generate_access_password(&self.policy),
        }
    }

    async fn find(&self, id: &str) -> Result<Degree, AppError> {
        repository::find_degree_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)
    }
}
