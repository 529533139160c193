//! Port traits for the collaborators driven by the replay loop.
//!
//! Every pipeline handler answers with a [`HandlerResult`]: `Ok(Some(_))`
//! carries the successor, `Ok(None)` is a deliberate decline that the loop
//! skips over, and `Err(_)` is a genuine failure that aborts the run.

pub mod config_port;
pub mod data_port;
pub mod execution_port;
pub mod portfolio_port;
pub mod statistic_port;
pub mod strategy_port;

use crate::domain::error::ReplayError;

pub type HandlerResult<T> = Result<Option<T>, ReplayError>;
