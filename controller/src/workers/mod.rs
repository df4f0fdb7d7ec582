//! Background workers

pub mod poller;
pub mod warm_start;
