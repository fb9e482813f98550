use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use ulid::Ulid;

use crate::config::Config;
use crate::model::*;
use crate::wal::Wal;

use super::{ReservationStore, StoreError};

fn sorted_by_start(mut rows: Vec<Reservation>) -> Vec<Reservation> {
    rows.sort_by_key(|r| (r.span.start, r.id));
    rows
}

#[derive(Default)]
struct StoreState {
    reservations: HashMap<Ulid, Reservation>,
    badminton: LocationIndex,
    table_tennis: LocationIndex,
}

impl StoreState {
    fn index(&self, location: Location) -> &LocationIndex {
        match location {
            Location::Badminton => &self.badminton,
            Location::TableTennis => &self.table_tennis,
        }
    }

    fn index_mut(&mut self, location: Location) -> &mut LocationIndex {
        match location {
            Location::Badminton => &mut self.badminton,
            Location::TableTennis => &mut self.table_tennis,
        }
    }

    /// Insert or replace a row, keeping the court indexes in step.
    fn upsert(&mut self, reservation: Reservation) {
        if let Some(old) = self.reservations.remove(&reservation.id) {
            for location in old.locations.iter() {
                self.index_mut(location).remove(old.id);
            }
        }
        for location in reservation.locations.iter() {
            self.index_mut(location).insert(Interval {
                id: reservation.id,
                span: reservation.span,
            });
        }
        self.reservations.insert(reservation.id, reservation);
    }

    fn apply(&mut self, event: &Event) {
        for reservation in event.reservations() {
            self.upsert(reservation.clone());
        }
    }

    /// Distinct active reservations conflicting with `proposal`. A row on both
    /// courts is counted once.
    fn count_conflicts(&self, proposal: &TimeProposal) -> u64 {
        let mut hits = HashSet::new();
        for location in proposal.locations.iter() {
            for interval in self.index(location).overlapping(&proposal.span) {
                if self
                    .reservations
                    .get(&interval.id)
                    .is_some_and(|r| r.conflicts_with(proposal))
                {
                    hits.insert(interval.id);
                }
            }
        }
        hits.len() as u64
    }

    /// Minimal event list that recreates the current state.
    fn snapshot(&self) -> Vec<Event> {
        let rows = sorted_by_start(self.reservations.values().cloned().collect());
        if rows.is_empty() {
            return Vec::new();
        }
        vec![Event::ReservationsCreated { reservations: rows }]
    }
}

/// Interval-indexed reservation store. With a WAL attached, every write
/// batch is fsynced as one record before it becomes visible.
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    wal: Option<Mutex<Wal>>,
    compact_threshold: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Volatile store; nothing survives the process.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            wal: None,
            compact_threshold: 0,
        }
    }

    /// Durable store backed by the WAL at `wal_path`, replayed on open.
    pub fn open(wal_path: &Path, compact_threshold: u64) -> std::io::Result<Self> {
        let events = Wal::replay(wal_path)?;
        let mut state = StoreState::default();
        for event in &events {
            state.apply(event);
        }
        info!(
            "replayed {} batches ({} reservations) from {}",
            events.len(),
            state.reservations.len(),
            wal_path.display()
        );
        let wal = Wal::open(wal_path)?;
        Ok(Self {
            state: RwLock::new(state),
            wal: Some(Mutex::new(wal)),
            compact_threshold,
        })
    }

    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        match (&config.data_dir, config.wal_path()) {
            (Some(dir), Some(wal_path)) => {
                std::fs::create_dir_all(dir)?;
                Self::open(&wal_path, config.compact_threshold)
            }
            _ => Ok(Self::new()),
        }
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Make `event` durable (if a WAL is attached) and then visible.
    /// Caller holds the state write lock, so log order equals apply order.
    async fn commit(&self, state: &mut StoreState, event: Event) -> Result<(), StoreError> {
        let Some(wal) = &self.wal else {
            state.apply(&event);
            return Ok(());
        };
        let mut wal = wal.lock().await;
        let flush_start = std::time::Instant::now();
        wal.append(&event)?;
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        state.apply(&event);

        if self.compact_threshold > 0 && wal.appends_since_compact() >= self.compact_threshold {
            // The batch is already durable; a failed compaction only leaves a longer log.
            match wal.compact(&state.snapshot()) {
                Ok(()) => info!("compacted WAL at {}", wal.path().display()),
                Err(e) => warn!("WAL compaction failed: {e}"),
            }
        }
        Ok(())
    }

    fn check_new_ids(state: &StoreState, rows: &[Reservation]) -> Result<(), StoreError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            if state.reservations.contains_key(&row.id) || !seen.insert(row.id) {
                return Err(StoreError::DuplicateId(row.id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn count_active_overlapping(&self, proposals: &[TimeProposal]) -> Result<Vec<u64>, StoreError> {
        let state = self.state.read().await;
        Ok(proposals.iter().map(|p| state.count_conflicts(p)).collect())
    }

    async fn create_one(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        let mut created = self.create_rows(vec![reservation]).await?;
        created.pop().ok_or(StoreError::Io("empty create batch".into()))
    }

    async fn create_many(&self, reservations: Vec<Reservation>) -> Result<usize, StoreError> {
        Ok(self.create_rows(reservations).await?.len())
    }

    async fn find_many_by_id(&self, ids: &[Ulid]) -> Result<Vec<Reservation>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.reservations.get(id).cloned())
            .collect())
    }

    async fn update_many(&self, reservations: Vec<Reservation>) -> Result<Vec<Reservation>, StoreError> {
        let mut state = self.state.write().await;
        let now = now_ms();
        let mut rows = Vec::with_capacity(reservations.len());
        for mut row in reservations {
            let stored = state
                .reservations
                .get(&row.id)
                .ok_or(StoreError::MissingRow(row.id))?;
            row.created_at = stored.created_at;
            row.updated_at = now;
            rows.push(row);
        }
        if rows.is_empty() {
            return Ok(rows);
        }
        self.commit(&mut state, Event::ReservationsUpdated { reservations: rows.clone() })
            .await?;
        Ok(rows)
    }

    async fn find_by_recurring_id(&self, recurring_id: Ulid) -> Result<Vec<Reservation>, StoreError> {
        let state = self.state.read().await;
        let rows = state
            .reservations
            .values()
            .filter(|r| r.recurring_id == Some(recurring_id))
            .cloned()
            .collect();
        Ok(sorted_by_start(rows))
    }

    async fn find_starting_between(&self, from: Ms, to: Ms) -> Result<Vec<Reservation>, StoreError> {
        let state = self.state.read().await;
        let rows = state
            .reservations
            .values()
            .filter(|r| from <= r.span.start && r.span.start <= to)
            .cloned()
            .collect();
        Ok(sorted_by_start(rows))
    }
}

impl InMemoryStore {
    async fn create_rows(&self, reservations: Vec<Reservation>) -> Result<Vec<Reservation>, StoreError> {
        let mut state = self.state.write().await;
        Self::check_new_ids(&state, &reservations)?;
        if reservations.is_empty() {
            return Ok(reservations);
        }
        let now = now_ms();
        let rows: Vec<Reservation> = reservations
            .into_iter()
            .map(|mut r| {
                r.created_at = now;
                r.updated_at = now;
                r
            })
            .collect();
        self.commit(&mut state, Event::ReservationsCreated { reservations: rows.clone() })
            .await?;
        Ok(rows)
    }
}
