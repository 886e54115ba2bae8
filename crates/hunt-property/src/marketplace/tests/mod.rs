mod common;
mod memory;
mod service;
