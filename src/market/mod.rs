pub mod alerts;
pub mod history;
pub mod indicators;
pub mod state;
