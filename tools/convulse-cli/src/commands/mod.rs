pub mod check;
pub mod layout;
pub mod prefs;
pub mod run;
