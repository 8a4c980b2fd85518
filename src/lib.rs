pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod dashboard_html;
pub mod data_store;
pub mod env_loader;
pub mod excel_writer;
pub mod filters;
pub mod inference_client;
pub mod models;
pub mod sentiment;
pub mod server;
pub mod word_freq;
