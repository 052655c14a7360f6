pub mod audit;
pub mod auth;
pub mod public;
pub mod rbac;
pub mod students;
pub mod tenancy;
pub mod webhooks;
