pub mod api_connection;
pub mod cli;
pub mod gateway;
pub mod history;
