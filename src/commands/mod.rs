pub mod config;
pub mod console;
mod run;

pub use config::Config;
pub use run::run;
