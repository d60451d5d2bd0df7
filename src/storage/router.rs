//! Polymorphic routing over several physical tables
//!
//! One logical entity family (results, standings) is stored in one table per
//! variant. A `Family` names the discriminant (`Slot`) and how to derive it
//! from a record or from a predicate; the `Router` forwards every verb to the
//! matching member table, or fans out to all of them when no discriminant
//! is available.

use std::fmt;

use super::table::{Table, TableEntry, Upsert, UpsertSummary};
use crate::record::{Predicate, Record};
use crate::{Error, Result};

/// A record type that is one variant of the family record `T`
pub trait Variant<T>: Record {
    fn wrap(self) -> T;

    /// Borrow the variant out of the family record, if it is this variant
    fn peel(record: &T) -> Option<&Self>;
}

/// Discriminant rules of an entity family
pub trait Family {
    type Record;
    type Slot: Copy + Eq + fmt::Debug;

    /// Table a record belongs to
    fn slot_of(record: &Self::Record) -> Result<Self::Slot>;

    /// Table a predicate is confined to, when it carries the discriminant-bearing column
    fn slot_for(predicate: &Predicate) -> Result<Option<Self::Slot>>;
}

/// Type-erased member table speaking the family record type
pub trait Member<T> {
    fn entry(&self) -> &dyn TableEntry;

    /// Whether every predicate column is a field of this table
    fn has_columns(&self, predicate: &Predicate) -> bool;

    fn key_of(&self, record: &T) -> Result<Predicate>;

    fn get_all(&self) -> Result<Vec<T>>;

    fn get_by_keys(&self, predicate: &Predicate) -> Result<T>;

    fn get_by_keys_many(&self, predicate: &Predicate) -> Result<Vec<T>>;

    fn insert(&self, record: &T) -> Result<()>;

    fn insert_many(&self, records: &[&T]) -> Result<usize>;

    fn update(&self, record: &T) -> Result<usize>;

    fn exists(&self, predicate: &Predicate) -> Result<bool>;

    fn delete(&self, predicate: &Predicate) -> Result<usize>;
}

impl<R: Record> Table<R> {
    fn peel<'a, T>(&self, record: &'a T) -> Result<&'a R>
    where
        R: Variant<T>,
    {
        R::peel(record).ok_or_else(|| {
            Error::Routing(format!("record is not a {} row of {}", R::SCHEMA.name, self.name()))
        })
    }
}

impl<T, R: Variant<T>> Member<T> for Table<R> {
    fn entry(&self) -> &dyn TableEntry {
        self
    }

    fn has_columns(&self, predicate: &Predicate) -> bool {
        predicate.columns().all(|c| R::SCHEMA.contains(c))
    }

    fn key_of(&self, record: &T) -> Result<Predicate> {
        Ok(Table::key_of(self, self.peel(record)?))
    }

    fn get_all(&self) -> Result<Vec<T>> {
        Ok(Table::get_all(self)?.into_iter().map(R::wrap).collect())
    }

    fn get_by_keys(&self, predicate: &Predicate) -> Result<T> {
        Ok(Table::get_by_keys(self, predicate)?.wrap())
    }

    fn get_by_keys_many(&self, predicate: &Predicate) -> Result<Vec<T>> {
        Ok(Table::get_by_keys_many(self, predicate)?
            .into_iter()
            .map(R::wrap)
            .collect())
    }

    fn insert(&self, record: &T) -> Result<()> {
        Table::insert(self, self.peel(record)?)
    }

    fn insert_many(&self, records: &[&T]) -> Result<usize> {
        let rows = records
            .iter()
            .map(|record| self.peel(*record))
            .collect::<Result<Vec<&R>>>()?;
        Table::insert_many(self, rows)
    }

    fn update(&self, record: &T) -> Result<usize> {
        Table::update(self, self.peel(record)?)
    }

    fn exists(&self, predicate: &Predicate) -> Result<bool> {
        Table::exists(self, predicate)
    }

    fn delete(&self, predicate: &Predicate) -> Result<usize> {
        Table::delete(self, predicate)
    }
}

/// One logical family spread over several member tables
pub struct Router<F: Family> {
    members: Vec<(F::Slot, Box<dyn Member<F::Record>>)>,
}

impl<F: Family> Default for Router<F> {
    fn default() -> Self {
        Self { members: Vec::new() }
    }
}

impl<F: Family> Router<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table for a slot; member order fixes `get_all` concatenation order
    pub fn with_member<R>(mut self, slot: F::Slot, table: Table<R>) -> Self
    where
        R: Variant<F::Record> + 'static,
    {
        self.members.push((slot, Box::new(table)));
        self
    }

    /// Physical tables of the family, in member order
    pub fn entries(&self) -> Vec<&dyn TableEntry> {
        self.members.iter().map(|(_, member)| member.entry()).collect()
    }

    fn member(&self, slot: F::Slot) -> Result<&dyn Member<F::Record>> {
        self.members
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, member)| member.as_ref())
            .ok_or_else(|| Error::Routing(format!("no table registered for {:?}", slot)))
    }

    fn member_for(&self, record: &F::Record) -> Result<&dyn Member<F::Record>> {
        let slot = F::slot_of(record)?;
        tracing::debug!("routing {:?} record", slot);
        self.member(slot)
    }

    /// The routed member, or every member that has all predicate columns
    fn candidates(&self, predicate: &Predicate) -> Result<Vec<&dyn Member<F::Record>>> {
        if let Some(slot) = F::slot_for(predicate)? {
            return Ok(vec![self.member(slot)?]);
        }

        let members: Vec<&dyn Member<F::Record>> = self
            .members
            .iter()
            .map(|(_, member)| member.as_ref())
            .filter(|member| member.has_columns(predicate))
            .collect();

        if members.is_empty() {
            return Err(Error::Schema(format!(
                "no table of the family has every column of {}",
                predicate
            )));
        }
        Ok(members)
    }

    // ========== DDL fan-out ==========

    pub fn create_tables(&self) -> Result<()> {
        self.entries().iter().try_for_each(|entry| entry.create_table())
    }

    pub fn drop_tables(&self) -> Result<()> {
        self.entries().iter().try_for_each(|entry| entry.drop_table())
    }

    pub fn create_indexes(&self) -> Result<()> {
        self.entries().iter().try_for_each(|entry| entry.create_indexes())
    }

    pub fn initialize(&self) -> Result<()> {
        self.create_tables()?;
        self.create_indexes()
    }

    pub fn reset(&self) -> Result<()> {
        self.drop_tables()?;
        self.initialize()
    }

    // ========== Reads ==========

    /// Every member's rows, concatenated in member order
    pub fn get_all(&self) -> Result<Vec<F::Record>> {
        let mut records = Vec::new();
        for (_, member) in &self.members {
            records.extend(member.get_all()?);
        }
        Ok(records)
    }

    pub fn get_by_keys(&self, predicate: &Predicate) -> Result<F::Record> {
        for member in self.candidates(predicate)? {
            match member.get_by_keys(predicate) {
                Err(Error::NotFound(_)) => continue,
                found => return found,
            }
        }
        Err(Error::NotFound(format!("no row matching {}", predicate)))
    }

    pub fn get_by_keys_many(&self, predicate: &Predicate) -> Result<Vec<F::Record>> {
        let mut records = Vec::new();
        for member in self.candidates(predicate)? {
            records.extend(member.get_by_keys_many(predicate)?);
        }
        Ok(records)
    }

    /// Routed check, or "exists in any member" short-circuiting on the first hit
    pub fn exists(&self, predicate: &Predicate) -> Result<bool> {
        for member in self.candidates(predicate)? {
            if member.exists(predicate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ========== Writes ==========

    pub fn insert(&self, record: &F::Record) -> Result<()> {
        self.member_for(record)?.insert(record)
    }

    /// Partition by discriminant, then one batched insert per member
    pub fn insert_many(&self, records: &[F::Record]) -> Result<usize> {
        let mut partitions: Vec<Vec<&F::Record>> = vec![Vec::new(); self.members.len()];
        for record in records {
            let slot = F::slot_of(record)?;
            let position = self
                .members
                .iter()
                .position(|(s, _)| *s == slot)
                .ok_or_else(|| Error::Routing(format!("no table registered for {:?}", slot)))?;
            partitions[position].push(record);
        }

        let mut inserted = 0;
        for ((_, member), partition) in self.members.iter().zip(&partitions) {
            if !partition.is_empty() {
                inserted += member.insert_many(partition)?;
            }
        }
        Ok(inserted)
    }

    pub fn update(&self, record: &F::Record) -> Result<usize> {
        self.member_for(record)?.update(record)
    }

    /// Routed delete, or the sum over every candidate member
    pub fn delete(&self, predicate: &Predicate) -> Result<usize> {
        let mut removed = 0;
        for member in self.candidates(predicate)? {
            removed += member.delete(predicate)?;
        }
        Ok(removed)
    }

    /// Upsert against the record's own member table, keyed by its primary key
    pub fn insert_or_update(&self, record: &F::Record) -> Result<Upsert> {
        let member = self.member_for(record)?;
        let key = member.key_of(record)?;
        if member.exists(&key)? {
            member.update(record)?;
            Ok(Upsert::Updated)
        } else {
            member.insert(record)?;
            Ok(Upsert::Inserted)
        }
    }

    /// Sequential upserts in input order; earlier records stay applied on failure
    pub fn insert_or_update_many(&self, records: &[F::Record]) -> Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        for record in records {
            summary.record(self.insert_or_update(record)?);
        }
        Ok(summary)
    }
}
