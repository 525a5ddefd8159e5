//! Client for the university portal: login, enrollment hand-off and catalog.

pub mod auth;
pub mod catalog;
pub mod crypto;
pub mod errors;
pub mod html;
pub mod models;
pub mod session;

pub use auth::{Credentials, EnrollmentEntry, authenticate};
pub use catalog::load_catalog;
pub use errors::PortalError;
pub use models::{AvailableCourse, CatalogMap, CourseInfo, TargetCourseSet};
pub use session::{PortalSession, SessionSettings};
