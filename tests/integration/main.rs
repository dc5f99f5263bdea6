//! Integration tests for the Bookshelf server

mod api_routes;
mod common;
mod live_api;
