#![forbid(unsafe_code)]

mod failpoints;
mod rows;
mod schema;
mod time;

pub(super) use failpoints::Failpoints;
pub(super) use rows::*;
pub(super) use schema::install_schema;
pub(super) use time::now_ms;
