//! Now-serving display board for childcare checkout pickups.
//!
//! A [`board::BoardController`] polls a checkout data source over HTTP,
//! keeps the called children in most-recent-first order and drives a
//! [`ui::Renderer`] with the current child, the previously called list and
//! their elapsed-time labels.

pub mod board;
pub mod cli;
pub mod core;
pub mod source;
pub mod ui;
