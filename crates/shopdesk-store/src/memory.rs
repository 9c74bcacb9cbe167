// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process [`KeyValueStore`] with Redis-like semantics.
//!
//! Used for single-node deployments and tests. Expiry is checked lazily on
//! access; all operations on the map happen under one lock, so
//! [`KeyValueStore::admit`] is atomic.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use shopdesk_core::{
    AdapterType, Admission, BatchOp, BoundedCounter, HealthStatus, KeyValueStore, PluginAdapter,
    ShopdeskError,
};
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live keys, for tests and diagnostics.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn wrong_type(key: &str) -> ShopdeskError {
    ShopdeskError::Store {
        message: format!("WRONGTYPE operation against key '{key}'"),
        source: None,
    }
}

fn live_entry<'a>(
    map: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if map.get(key).is_some_and(|e| !e.is_live(now)) {
        map.remove(key);
    }
    map.get_mut(key)
}

fn read_counter(map: &mut HashMap<String, Entry>, key: &str, now: Instant) -> Result<u64, ShopdeskError> {
    match live_entry(map, key, now) {
        None => Ok(0),
        Some(Entry {
            value: Value::Text(s),
            ..
        }) => s.parse().map_err(|_| ShopdeskError::Store {
            message: format!("value at '{key}' is not an integer"),
            source: None,
        }),
        Some(_) => Err(wrong_type(key)),
    }
}

fn incr(map: &mut HashMap<String, Entry>, key: &str, now: Instant) -> Result<u64, ShopdeskError> {
    let next = read_counter(map, key, now)? + 1;
    match live_entry(map, key, now) {
        Some(entry) => entry.value = Value::Text(next.to_string()),
        None => {
            map.insert(
                key.to_string(),
                Entry {
                    value: Value::Text(next.to_string()),
                    expires_at: None,
                },
            );
        }
    }
    Ok(next)
}

fn expire(map: &mut HashMap<String, Entry>, key: &str, ttl: Duration, now: Instant) {
    if let Some(entry) = live_entry(map, key, now) {
        entry.expires_at = Some(now + ttl);
    }
}

/// Resolves Redis-style inclusive `start..=stop` indexes against `len`.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        self.lock().clear();
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ShopdeskError> {
        let mut map = self.lock();
        match live_entry(&mut map, key, Instant::now()) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, ShopdeskError> {
        let mut map = self.lock();
        let now = Instant::now();
        Ok(keys
            .iter()
            .map(|key| match live_entry(&mut map, key, now) {
                Some(Entry {
                    value: Value::Text(s),
                    ..
                }) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ShopdeskError> {
        self.lock().insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ShopdeskError> {
        let mut map = self.lock();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    async fn admit(&self, counters: &[BoundedCounter]) -> Result<Admission, ShopdeskError> {
        let mut map = self.lock();
        let now = Instant::now();
        for (index, counter) in counters.iter().enumerate() {
            let count = read_counter(&mut map, &counter.key, now)?;
            if count >= counter.limit {
                return Ok(Admission::Rejected {
                    index,
                    count,
                    limit: counter.limit,
                });
            }
        }
        for counter in counters {
            incr(&mut map, &counter.key, now)?;
            expire(&mut map, &counter.key, counter.ttl, now);
        }
        Ok(Admission::Admitted)
    }

    async fn execute(&self, ops: Vec<BatchOp>) -> Result<(), ShopdeskError> {
        let mut map = self.lock();
        let now = Instant::now();
        for op in ops {
            match op {
                BatchOp::Incr { key } => {
                    incr(&mut map, &key, now)?;
                }
                BatchOp::Expire { key, ttl } => expire(&mut map, &key, ttl, now),
                BatchOp::LPush { key, value } => match live_entry(&mut map, &key, now) {
                    Some(Entry {
                        value: Value::List(list),
                        ..
                    }) => list.push_front(value),
                    Some(_) => return Err(wrong_type(&key)),
                    None => {
                        map.insert(
                            key,
                            Entry {
                                value: Value::List(VecDeque::from([value])),
                                expires_at: None,
                            },
                        );
                    }
                },
                BatchOp::LTrim { key, start, stop } => {
                    if let Some(entry) = live_entry(&mut map, &key, now) {
                        let Value::List(list) = &mut entry.value else {
                            return Err(wrong_type(&key));
                        };
                        match resolve_range(list.len(), start, stop) {
                            Some((from, to)) => {
                                list.truncate(to + 1);
                                list.drain(..from);
                            }
                            None => list.clear(),
                        }
                        if list.is_empty() {
                            map.remove(&key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ShopdeskError> {
        let mut map = self.lock();
        match live_entry(&mut map, key, Instant::now()) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(_) => Err(wrong_type(key)),
        }
    }
}
