pub mod flows;
pub mod run;
pub mod setup;
pub mod ui;
