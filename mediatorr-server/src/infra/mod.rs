pub mod app_state;
pub mod errors;
pub mod settings;
pub mod startup;
