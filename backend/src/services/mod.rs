pub mod rate_limiter;
pub mod spin_service;

pub use rate_limiter::check_rate_limit;
pub use spin_service::SpinService;
