#![forbid(unsafe_code)]

use super::super::StoreError;
use std::collections::HashMap;

/// Armed failpoints, parsed from `StoreConfig::failpoints`.
///
/// An entry is `name` or `name:N`; the point fires on its N-th hit within one
/// call (the first hit when no count is given).
#[derive(Clone, Debug, Default)]
pub struct Failpoints {
    armed: HashMap<String, usize>,
}

impl Failpoints {
    pub fn parse(entries: &[String]) -> Result<Self, StoreError> {
        let mut armed = HashMap::new();
        for entry in entries {
            let entry = entry.trim();
            let (name, hit) = match entry.split_once(':') {
                Some((name, count)) => {
                    let hit = count.trim().parse::<usize>().map_err(|_| {
                        StoreError::Config(format!("failpoint {entry:?} has a bad count"))
                    })?;
                    (name.trim(), hit)
                }
                None => (entry, 1),
            };
            if name.is_empty() || hit == 0 {
                return Err(StoreError::Config(format!("invalid failpoint {entry:?}")));
            }
            armed.insert(name.to_string(), hit);
        }
        Ok(Self { armed })
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    /// Fails when `name` is armed for its `hit`-th occurrence.
    pub(in crate::store) fn check(&self, name: &str, hit: usize) -> Result<(), StoreError> {
        if self.armed.get(name) == Some(&hit) {
            tracing::debug!(failpoint = name, hit, "failpoint triggered");
            return Err(StoreError::Failpoint(format!("{name}:{hit}")));
        }
        Ok(())
    }
}
