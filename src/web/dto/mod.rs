pub mod account;
pub mod lessons;
pub mod modules;
pub mod notifications;
pub mod progress;
pub mod stats;
pub mod submissions;
pub mod uploads;
