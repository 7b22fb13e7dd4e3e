pub(crate) mod config;
pub(crate) mod login;
pub(crate) mod run;
