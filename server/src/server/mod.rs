pub mod apis;
pub mod instance;
