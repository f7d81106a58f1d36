pub mod middleware;
pub mod rest;
