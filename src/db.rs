pub mod user_repo;
pub use user_repo::UserRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod audit_repo;
pub use audit_repo::{AuditQueryRepository, AuditSink, PgAuditSink};
pub mod rate_limit_repo;
pub use rate_limit_repo::{CounterStore, PgCounterStore, WindowSample};
pub mod students_repo;
pub use students_repo::StudentRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
