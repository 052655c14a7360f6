pub mod auth;
pub mod provenance;
pub mod rate_limit;
pub mod rbac;
pub mod tenancy;
