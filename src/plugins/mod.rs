pub mod http;
pub mod registry;
pub mod series;
pub mod status;
pub mod terminal;
