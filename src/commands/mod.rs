pub mod check;
pub mod jobs;
pub mod run;

// Re-export command functions for convenience
pub use check::check;
pub use jobs::jobs;
pub use run::run;
