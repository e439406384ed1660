use crate::models::reservation::Reservation;
use crate::models::showtime::{PricingSnapshot, SeatsAndPrice, ShowtimeInventory};
use crate::store::{BookingStore, BookingTransaction, ReserveOutcome};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// In-process store with the same isolation rules as the MySQL one.
///
/// Each showtime is a row with its own writer lock, standing in for the
/// InnoDB row lock. A transaction takes the writer lock the first time it
/// touches a showtime, works on a private copy of the row and publishes the
/// copy at commit. Readers only ever see published copies.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: RwLock<HashMap<String, Arc<Row>>>,
    // committed reservation id -> showtime id
    index: RwLock<HashMap<String, String>>,
}

struct Row {
    writer: Arc<Mutex<()>>,
    committed: RwLock<RowState>,
}

#[derive(Clone)]
struct RowState {
    inventory: ShowtimeInventory,
    reservations: HashMap<String, Reservation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a showtime. Its seats start fully available.
    pub async fn add_showtime(&self, mut inventory: ShowtimeInventory) -> AppResult<()> {
        if inventory.total_seats < 0 {
            return Err(AppError::InvalidInput(
                "total_seats should not be negative".into(),
            ));
        }
        if inventory.price_per_seat < Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "price_per_seat should not be negative".into(),
            ));
        }
        if inventory.end_time <= inventory.start_time {
            return Err(AppError::InvalidInput(
                "end_time must be after start_time".into(),
            ));
        }
        inventory.available_seats = inventory.total_seats;

        let mut rows = self.inner.rows.write().await;
        if rows.contains_key(&inventory.showtime_id) {
            return Err(AppError::DuplicateId(inventory.showtime_id));
        }
        rows.insert(
            inventory.showtime_id.clone(),
            Arc::new(Row {
                writer: Arc::new(Mutex::new(())),
                committed: RwLock::new(RowState {
                    inventory,
                    reservations: HashMap::new(),
                }),
            }),
        );
        Ok(())
    }

    async fn row(&self, showtime_id: &str) -> Option<Arc<Row>> {
        self.inner.rows.read().await.get(showtime_id).cloned()
    }

    async fn collect<F>(&self, keep: F) -> Vec<Reservation>
    where
        F: Fn(&Reservation) -> bool,
    {
        let rows: Vec<Arc<Row>> = self.inner.rows.read().await.values().cloned().collect();
        let mut found = Vec::new();
        for row in rows {
            let state = row.committed.read().await;
            found.extend(state.reservations.values().filter(|r| keep(*r)).cloned());
        }
        found.sort_by(|a, b| {
            a.reservation_date
                .cmp(&b.reservation_date)
                .then_with(|| a.reservation_id.cmp(&b.reservation_id))
        });
        found
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn BookingTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            locked: HashMap::new(),
        }))
    }

    async fn inventory(&self, showtime_id: &str) -> AppResult<Option<ShowtimeInventory>> {
        match self.row(showtime_id).await {
            Some(row) => Ok(Some(row.committed.read().await.inventory.clone())),
            None => Ok(None),
        }
    }

    async fn availability(&self, showtime_id: &str) -> AppResult<Option<SeatsAndPrice>> {
        Ok(self.inventory(showtime_id).await?.map(|inventory| SeatsAndPrice {
            available_seats: inventory.available_seats,
            price_per_seat: inventory.price_per_seat,
        }))
    }

    async fn find_reservation(&self, reservation_id: &str) -> AppResult<Option<Reservation>> {
        let showtime_id = self.inner.index.read().await.get(reservation_id).cloned();
        let row = match showtime_id {
            Some(showtime_id) => self.row(&showtime_id).await,
            None => None,
        };
        match row {
            Some(row) => Ok(row.committed.read().await.reservations.get(reservation_id).cloned()),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|_| true).await)
    }

    async fn find_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.user_id == user_id).await)
    }

    async fn find_by_showtime(&self, showtime_id: &str) -> AppResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.showtime_id == showtime_id).await)
    }

    async fn find_upcoming(&self, user_id: i32, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        Ok(self
            .collect(|r| r.user_id == user_id && r.reservation_date > now)
            .await)
    }
}

struct LockedRow {
    row: Arc<Row>,
    staged: RowState,
    _guard: OwnedMutexGuard<()>,
}

pub struct MemoryTransaction {
    store: MemoryStore,
    locked: HashMap<String, LockedRow>,
}

impl MemoryTransaction {
    // Take the row's writer lock once per transaction and stage a private copy
    async fn lock(&mut self, showtime_id: &str) -> Option<&mut LockedRow> {
        if !self.locked.contains_key(showtime_id) {
            let row = self.store.row(showtime_id).await?;
            let guard = row.writer.clone().lock_owned().await;
            let staged = row.committed.read().await.clone();
            self.locked.insert(
                showtime_id.to_string(),
                LockedRow {
                    row,
                    staged,
                    _guard: guard,
                },
            );
        }
        self.locked.get_mut(showtime_id)
    }

    fn staged_owner(&self, reservation_id: &str) -> Option<String> {
        self.locked
            .iter()
            .find(|(_, locked)| locked.staged.reservations.contains_key(reservation_id))
            .map(|(showtime_id, _)| showtime_id.clone())
    }
}

#[async_trait]
impl BookingTransaction for MemoryTransaction {
    async fn pricing_snapshot(&mut self, showtime_id: &str) -> AppResult<Option<PricingSnapshot>> {
        let snapshot = match self.locked.get(showtime_id) {
            Some(locked) => Some(locked.staged.inventory.clone()),
            None => self.store.inventory(showtime_id).await?,
        };

        Ok(snapshot.map(|inventory| PricingSnapshot {
            price_per_seat: inventory.price_per_seat,
            start_time: inventory.start_time,
        }))
    }

    async fn try_reserve(&mut self, showtime_id: &str, seats: i32) -> AppResult<ReserveOutcome> {
        if seats <= 0 {
            return Err(AppError::InvalidInput(
                "seats should be a positive integer".into(),
            ));
        }

        let locked = match self.lock(showtime_id).await {
            Some(locked) => locked,
            None => return Ok(ReserveOutcome::ShowtimeNotFound),
        };

        let inventory = &mut locked.staged.inventory;
        if inventory.available_seats < seats {
            return Ok(ReserveOutcome::Insufficient {
                available: inventory.available_seats,
            });
        }
        inventory.available_seats -= seats;

        Ok(ReserveOutcome::Reserved {
            remaining: inventory.available_seats,
        })
    }

    async fn release(&mut self, showtime_id: &str, seats: i32) -> AppResult<i32> {
        if seats <= 0 {
            return Err(AppError::InvalidInput(
                "released seats should be a positive integer".into(),
            ));
        }

        let locked = self
            .lock(showtime_id)
            .await
            .ok_or_else(|| AppError::ShowtimeNotFound(showtime_id.to_string()))?;

        let inventory = &mut locked.staged.inventory;
        if inventory.available_seats + seats > inventory.total_seats {
            tracing::error!(
                showtime_id,
                seats,
                available = inventory.available_seats,
                total = inventory.total_seats,
                "release would exceed original capacity"
            );
            return Err(AppError::BookkeepingFault(format!(
                "releasing {} seats on showtime {} would exceed capacity {} (available {})",
                seats, showtime_id, inventory.total_seats, inventory.available_seats
            )));
        }
        inventory.available_seats += seats;

        Ok(inventory.available_seats)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> AppResult<()> {
        let committed = self
            .store
            .inner
            .index
            .read()
            .await
            .contains_key(&reservation.reservation_id);
        if committed || self.staged_owner(&reservation.reservation_id).is_some() {
            return Err(AppError::DuplicateId(reservation.reservation_id.clone()));
        }

        let locked = self
            .lock(&reservation.showtime_id)
            .await
            .ok_or_else(|| AppError::ShowtimeNotFound(reservation.showtime_id.clone()))?;
        locked
            .staged
            .reservations
            .insert(reservation.reservation_id.clone(), reservation.clone());

        Ok(())
    }

    async fn find_reservation_for_update(
        &mut self,
        reservation_id: &str,
    ) -> AppResult<Option<Reservation>> {
        let showtime_id = match self.staged_owner(reservation_id) {
            Some(showtime_id) => Some(showtime_id),
            None => self.store.inner.index.read().await.get(reservation_id).cloned(),
        };
        let showtime_id = match showtime_id {
            Some(showtime_id) => showtime_id,
            None => return Ok(None),
        };

        // a concurrent cancel may have won while we waited for the lock
        Ok(self
            .lock(&showtime_id)
            .await
            .and_then(|locked| locked.staged.reservations.get(reservation_id).cloned()))
    }

    async fn delete_reservation(&mut self, reservation_id: &str) -> AppResult<()> {
        if self.staged_owner(reservation_id).is_none() {
            self.find_reservation_for_update(reservation_id).await?;
        }

        let removed = self
            .locked
            .values_mut()
            .find_map(|locked| locked.staged.reservations.remove(reservation_id));

        match removed {
            Some(_) => Ok(()),
            None => Err(AppError::ReservationNotFound(reservation_id.to_string())),
        }
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { store, locked } = *self;
        let mut index = store.inner.index.write().await;

        // validate every row before publishing any of them
        for (showtime_id, locked_row) in &locked {
            let committed = locked_row.row.committed.read().await;
            let clash = locked_row.staged.reservations.keys().find(|id| {
                !committed.reservations.contains_key(*id)
                    && index.get(*id).is_some_and(|owner| owner != showtime_id)
            });
            if let Some(id) = clash {
                return Err(AppError::DuplicateId(id.clone()));
            }
        }

        for (showtime_id, locked_row) in locked {
            let mut committed = locked_row.row.committed.write().await;
            for id in committed.reservations.keys() {
                if !locked_row.staged.reservations.contains_key(id) {
                    index.remove(id);
                }
            }
            for id in locked_row.staged.reservations.keys() {
                index.insert(id.clone(), showtime_id.clone());
            }
            *committed = locked_row.staged;
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
