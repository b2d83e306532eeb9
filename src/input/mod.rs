pub mod error;
pub mod event;
pub mod manager;
pub mod option;
pub mod output;
pub mod profile;
pub mod source;
pub mod translator;
