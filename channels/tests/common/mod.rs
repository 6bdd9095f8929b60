#![allow(dead_code)]

use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;

#[derive(Debug)]
pub struct Boom;

impl std::fmt::Display for Boom {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("boom")
  }
}

impl std::error::Error for Boom {}
