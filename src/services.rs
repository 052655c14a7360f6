pub mod audit_service;
pub mod auth;
pub mod rate_limit_service;
pub mod rbac_service;
pub mod student_service;
pub mod tenancy_service;
