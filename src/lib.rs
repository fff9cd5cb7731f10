pub mod api;
pub mod app;
pub mod assets;
pub mod auth;
pub mod catalog;
pub mod choice;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod output;
pub mod parser;
pub mod records;
pub mod session;

#[cfg(test)]
mod tests;
