//! Academic record engine: pure decision functions over plain records.
//!
//! Nothing in here touches the database or the environment. The services
//! layer loads the inputs, calls into these modules, and persists whatever
//! they return.

pub mod admission;
pub mod credential;
pub mod grade_scale;
pub mod lifecycle;
pub mod transcript;
