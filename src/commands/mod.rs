
pub mod config;
pub mod setup;
pub mod check;
pub mod info;
pub mod analyze;
pub mod make_stack;
