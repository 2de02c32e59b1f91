pub mod accounts;
pub mod entries;
pub mod export;
pub mod review;
pub mod settings;
