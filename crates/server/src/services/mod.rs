pub mod credentials;
pub mod progress;
pub mod stats;
