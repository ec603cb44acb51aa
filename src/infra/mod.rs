pub mod sql_api;
