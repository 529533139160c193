//! Core domain types and logic.

pub mod error;
pub mod event;
pub mod position;
pub mod algo;
pub mod algo_stack;
pub mod node;
pub mod strategy;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod moving_average;
pub mod feed;
pub mod portfolio;
pub mod execution;
pub mod statistics;
pub mod backtest;
pub mod universe;
pub mod config_validation;
