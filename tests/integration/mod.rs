//! Integration tests for the recsync seeding engine

mod cli_commands;
mod config_integration;
mod purge_pipeline;
mod seed_pipeline;
mod test_utils;
