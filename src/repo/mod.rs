pub mod migrations;
pub mod notes;
