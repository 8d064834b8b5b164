pub mod activity;
pub mod comparison;
pub mod record;
pub mod scenario;
pub mod suggestion;
