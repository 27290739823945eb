pub mod api;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod mcp_server;
pub mod params;
pub mod pipeline;
pub mod providers;
pub mod records;
pub mod service;
pub mod storage;
pub mod supabase;
pub mod tools;
pub mod url_validation;
