pub mod cli;
pub mod fetcher;
