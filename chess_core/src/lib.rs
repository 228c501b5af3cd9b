pub mod engine;
pub mod logic;
pub mod session;
pub mod worker;
