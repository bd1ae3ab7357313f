use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::services::{DegreeService, EnrollmentService, TranscriptService};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub enrollments: EnrollmentService,
    pub transcripts: TranscriptService,
    pub degrees: DegreeService,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &AppConfig) -> Self {
        Self {
            enrollments: EnrollmentService::new(db.clone(), config.admission),
            transcripts: TranscriptService::new(db.clone()),
            degrees: DegreeService::new(db.clone(), config.credential.clone()),
            db,
        }
    }
}
