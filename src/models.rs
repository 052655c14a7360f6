pub mod audit;
pub mod auth;
pub mod billing;
pub mod rbac;
pub mod students;
pub mod tenancy;
