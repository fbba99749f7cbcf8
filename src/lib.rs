pub mod config;
pub mod error;
pub mod events;
pub mod fault_log;
pub mod queue;
pub mod render;
pub mod scan;
pub mod platform {
    pub mod buttons;
    pub mod panel;
}
pub mod tasks {
    pub mod controller;
}

pub use error::Error;
