//! Generic create/read/update/delete contract shared by the repositories.

use rusqlite::{params_from_iter, Connection, Row};

use super::{with_savepoint, DbError, DbResult, Predicate, Query};

/// Persistence operations over one entity table keyed by an integer `id`.
///
/// Implementors provide the table metadata, row mapping and `save`; every
/// other operation is derived from those through [`Query`].
pub trait CrudRepository {
    type Entity;

    /// Table name.
    const TABLE: &'static str;
    /// Selected columns, in the order `map_row` reads them. `id` comes first.
    const COLUMNS: &'static [&'static str];

    /// Connection (or transaction) this repository runs on.
    fn conn(&self) -> &Connection;

    /// Build an entity from a row selected with [`Self::COLUMNS`].
    fn map_row(row: &Row<'_>) -> rusqlite::Result<Self::Entity>;

    /// Identifier of an entity, `None` if never saved.
    fn entity_id(entity: &Self::Entity) -> Option<i64>;

    /// Insert when the entity has no id, otherwise insert-or-update keyed by
    /// its id. Returns the entity with its id populated.
    fn save(&self, entity: Self::Entity) -> DbResult<Self::Entity>;

    /// All rows of this table, before filtering.
    fn query(&self) -> Query {
        Query::from(Self::TABLE)
    }

    /// Run a select over `query`.
    fn fetch(&self, query: &Query) -> DbResult<Vec<Self::Entity>> {
        let rendered = query.select(Self::COLUMNS);
        let mut stmt = self.conn().prepare(&rendered.sql)?;
        let rows = stmt.query_map(params_from_iter(rendered.params.iter()), Self::map_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count rows matching `query`.
    fn fetch_count(&self, query: &Query) -> DbResult<u64> {
        let rendered = query.count();
        let count: i64 = self.conn().query_row(
            &rendered.sql,
            params_from_iter(rendered.params.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Check whether any row matches `query`.
    fn fetch_exists(&self, query: &Query) -> DbResult<bool> {
        let rendered = query.exists();
        let exists: bool = self.conn().query_row(
            &rendered.sql,
            params_from_iter(rendered.params.iter()),
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Delete rows matching `query`, returning how many were removed.
    fn delete_matching(&self, query: &Query) -> DbResult<u64> {
        let rendered = query.delete();
        let rows_affected = self
            .conn()
            .execute(&rendered.sql, params_from_iter(rendered.params.iter()))?;
        Ok(rows_affected as u64)
    }

    /// Save every entity, or none of them if one fails.
    fn save_all<I>(&self, entities: I) -> DbResult<Vec<Self::Entity>>
    where
        I: IntoIterator<Item = Self::Entity>,
    {
        with_savepoint(self.conn(), || {
            entities.into_iter().map(|entity| self.save(entity)).collect()
        })
    }

    fn find_by_id(&self, id: i64) -> DbResult<Option<Self::Entity>> {
        let query = self.query().filter(Predicate::equals("id", id));
        Ok(self.fetch(&query)?.into_iter().next())
    }

    /// Like [`find_by_id`](Self::find_by_id), but a missing row is an error.
    fn get_by_id(&self, id: i64) -> DbResult<Self::Entity> {
        self.find_by_id(id)?
            .ok_or_else(|| DbError::NotFound(format!("no row in {} with id {}", Self::TABLE, id)))
    }

    fn exists_by_id(&self, id: i64) -> DbResult<bool> {
        self.fetch_exists(&self.query().filter(Predicate::equals("id", id)))
    }

    /// All rows, ordered by id.
    fn find_all(&self) -> DbResult<Vec<Self::Entity>> {
        self.fetch(&self.query())
    }

    /// Rows whose id is in `ids`; unknown ids are skipped.
    fn find_all_by_id(&self, ids: &[i64]) -> DbResult<Vec<Self::Entity>> {
        self.fetch(&self.query().filter(Predicate::is_in("id", ids.iter().copied())))
    }

    fn count(&self) -> DbResult<u64> {
        self.fetch_count(&self.query())
    }

    /// Delete by id. Returns `false` when no such row existed.
    fn delete_by_id(&self, id: i64) -> DbResult<bool> {
        let deleted = self.delete_matching(&self.query().filter(Predicate::equals("id", id)))?;
        Ok(deleted > 0)
    }

    /// Delete a previously saved entity. Unsaved entities are a no-op.
    fn delete(&self, entity: &Self::Entity) -> DbResult<bool> {
        match Self::entity_id(entity) {
            Some(id) => self.delete_by_id(id),
            None => Ok(false),
        }
    }

    fn delete_all(&self) -> DbResult<u64> {
        self.delete_matching(&self.query())
    }
}
