pub mod degree_service;
pub mod enrollment_service;
pub mod transcript_service;

pub use degree_service::DegreeService;
pub use enrollment_service::EnrollmentService;
pub use transcript_service::TranscriptService;
