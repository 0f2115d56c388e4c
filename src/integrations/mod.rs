//! External tools driven from the dashboard

pub mod ssd;
