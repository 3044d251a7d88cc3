//! The domain store: commercials, expense types and expenses.
//!
//! The [`Ledger`] is built once at start-up with [`Ledger::open`] and owns all three
//! collections. Each collection is a [`Repository`] of one [`Record`] kind, and every
//! mutation goes through the ledger so it can be persisted before it becomes visible:
//! the next state is built, written under the collection's key, and only then swapped in.
//! If the write fails, the in-memory collection is left as it was.

use crate::{
    core::{
        models::{Commercial, Expense, ExpenseType},
        storage,
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::{Serialize, de::DeserializeOwned};

/// A record kind the ledger stores.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Storage key of the whole collection
    const STORAGE_KEY: &'static str;
    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;
    /// New records go to the front of the collection instead of the back
    const NEWEST_FIRST: bool = false;

    /// Unique identifier of this record
    fn id(&self) -> &str;
}

impl Record for Commercial {
    const STORAGE_KEY: &'static str = "commercials";
    const KIND: &'static str = "Commercial";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for ExpenseType {
    const STORAGE_KEY: &'static str = "expenseTypes";
    const KIND: &'static str = "Expense type";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Expense {
    const STORAGE_KEY: &'static str = "expenses";
    const KIND: &'static str = "Expense";
    const NEWEST_FIRST: bool = true;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Outcome of the confirmation step that precedes a delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The user confirmed; the record is removed
    Confirmed,
    /// The user declined; nothing changes
    Declined,
}

/// In-memory collection of one record kind.
#[derive(Clone, Debug)]
pub struct Repository<T> {
    items: Vec<T>,
}

impl<T: Record> Repository<T> {
    /// Wraps an already-loaded collection.
    #[must_use]
    pub const fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// All records, in stored order.
    #[must_use]
    pub fn list(&self) -> &[T] {
        &self.items
    }

    /// Looks a record up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn with_added(&self, record: T) -> Result<Vec<T>> {
        if self.get(record.id()).is_some() {
            return Err(Error::DuplicateRecord {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        let mut next = Vec::with_capacity(self.items.len() + 1);
        if T::NEWEST_FIRST {
            next.push(record);
            next.extend(self.items.iter().cloned());
        } else {
            next.extend(self.items.iter().cloned());
            next.push(record);
        }
        Ok(next)
    }

    fn with_updated(&self, record: &T) -> Option<Vec<T>> {
        self.get(record.id())?;
        Some(
            self.items
                .iter()
                .map(|item| {
                    if item.id() == record.id() {
                        record.clone()
                    } else {
                        item.clone()
                    }
                })
                .collect(),
        )
    }

    fn without(&self, id: &str) -> Option<Vec<T>> {
        self.get(id)?;
        Some(
            self.items
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect(),
        )
    }

    async fn commit(&mut self, db: &DatabaseConnection, next: Vec<T>) -> Result<()> {
        storage::save_collection(db, T::STORAGE_KEY, &next).await?;
        self.items = next;
        Ok(())
    }
}

/// Gives the ledger's generic operations access to the repository of one record kind.
pub trait Holds<T: Record> {
    /// Read access to the collection
    fn repository(&self) -> &Repository<T>;
    /// The database handle alongside mutable access to the collection
    fn repository_mut(&mut self) -> (&DatabaseConnection, &mut Repository<T>);
}

/// Owner of every persisted collection.
pub struct Ledger {
    db: DatabaseConnection,
    commercials: Repository<Commercial>,
    expense_types: Repository<ExpenseType>,
    expenses: Repository<Expense>,
}

impl Ledger {
    /// Hydrates all three collections from storage.
    ///
    /// A missing or unreadable catalog is replaced by the given defaults, which are stored
    /// right away; missing or unreadable expenses start empty. Single unreadable records are
    /// skipped.
    pub async fn open(
        db: DatabaseConnection,
        default_commercials: Vec<Commercial>,
        default_expense_types: Vec<ExpenseType>,
    ) -> Self {
        let commercials = load_or_seed(&db, default_commercials).await;
        let expense_types = load_or_seed(&db, default_expense_types).await;
        let expenses: Vec<Expense> = storage::load_collection(&db, Expense::STORAGE_KEY)
            .await
            .unwrap_or_default();

        tracing::info!(
            "Ledger loaded: {} commercials, {} expense types, {} expenses",
            commercials.len(),
            expense_types.len(),
            expenses.len()
        );

        Self {
            db,
            commercials: Repository::new(commercials),
            expense_types: Repository::new(expense_types),
            expenses: Repository::new(expenses),
        }
    }

    /// All commercials.
    #[must_use]
    pub fn commercials(&self) -> &[Commercial] {
        self.commercials.list()
    }

    /// All expense types.
    #[must_use]
    pub fn expense_types(&self) -> &[ExpenseType] {
        self.expense_types.list()
    }

    /// All expenses, newest first.
    #[must_use]
    pub fn expenses(&self) -> &[Expense] {
        self.expenses.list()
    }

    /// All records of one kind.
    #[must_use]
    pub fn list<T: Record>(&self) -> &[T]
    where
        Self: Holds<T>,
    {
        <Self as Holds<T>>::repository(self).list()
    }

    /// One record by id.
    #[must_use]
    pub fn get<T: Record>(&self, id: &str) -> Option<&T>
    where
        Self: Holds<T>,
    {
        <Self as Holds<T>>::repository(self).get(id)
    }

    /// Adds a record and persists its collection.
    ///
    /// Fails with [`Error::DuplicateRecord`] if the id is already taken.
    pub async fn add<T: Record>(&mut self, record: T) -> Result<()>
    where
        Self: Holds<T>,
    {
        let (db, repository) = <Self as Holds<T>>::repository_mut(self);
        let id = record.id().to_string();
        let next = repository.with_added(record)?;
        repository.commit(db, next).await?;
        tracing::debug!("{} '{id}' added", T::KIND);
        Ok(())
    }

    /// Replaces the record with the same id and persists its collection.
    ///
    /// Returns `false` and writes nothing when no record has that id.
    pub async fn update<T: Record>(&mut self, record: T) -> Result<bool>
    where
        Self: Holds<T>,
    {
        let (db, repository) = <Self as Holds<T>>::repository_mut(self);
        let Some(next) = repository.with_updated(&record) else {
            tracing::debug!("{} '{}' not found, update skipped", T::KIND, record.id());
            return Ok(false);
        };
        repository.commit(db, next).await?;
        Ok(true)
    }

    /// Removes the record with this id once the caller has confirmed.
    ///
    /// Returns `true` only if a record was actually removed. Nothing referencing the
    /// record is touched.
    pub async fn delete<T: Record>(&mut self, id: &str, decision: Decision) -> Result<bool>
    where
        Self: Holds<T>,
    {
        if decision == Decision::Declined {
            return Ok(false);
        }
        let (db, repository) = <Self as Holds<T>>::repository_mut(self);
        let Some(next) = repository.without(id) else {
            return Ok(false);
        };
        repository.commit(db, next).await?;
        tracing::info!("{} '{id}' deleted", T::KIND);
        Ok(true)
    }
}

impl Holds<Commercial> for Ledger {
    fn repository(&self) -> &Repository<Commercial> {
        &self.commercials
    }

    fn repository_mut(&mut self) -> (&DatabaseConnection, &mut Repository<Commercial>) {
        (&self.db, &mut self.commercials)
    }
}

impl Holds<ExpenseType> for Ledger {
    fn repository(&self) -> &Repository<ExpenseType> {
        &self.expense_types
    }

    fn repository_mut(&mut self) -> (&DatabaseConnection, &mut Repository<ExpenseType>) {
        (&self.db, &mut self.expense_types)
    }
}

/// Loads a catalog, writing `defaults` under its key when nothing readable is stored.
///
/// Once written, the seeded ids stay fixed across runs even if the configured defaults
/// change.
async fn load_or_seed<T: Record>(db: &DatabaseConnection, defaults: Vec<T>) -> Vec<T> {
    if let Some(items) = storage::load_collection(db, T::STORAGE_KEY).await {
        return items;
    }

    if let Err(e) = storage::save_collection(db, T::STORAGE_KEY, &defaults).await {
        tracing::warn!("Failed to store default {}s: {e}", T::KIND);
    } else {
        tracing::info!("Stored {} default {}s", defaults.len(), T::KIND);
    }
    defaults
}

impl Holds<Expense> for Ledger {
    fn repository(&self) -> &Repository<Expense> {
        &self.expenses
    }

    fn repository_mut(&mut self) -> (&DatabaseConnection, &mut Repository<Expense>) {
        (&self.db, &mut self.expenses)
    }
}
