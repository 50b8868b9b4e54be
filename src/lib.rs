pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod query_service;
pub mod storage;
pub mod traffic_analysis;
pub mod web_interface;
