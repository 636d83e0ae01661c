use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::query::{self, Query};
use crate::{
    check_table, check_table_name, Adapter, AdapterError, FetchOptions, Result, Storable, Table,
};

type Rows = HashMap<Uuid, Value>;

/// In-memory adapter holding one map per table from uuid to the latest
/// record snapshot.
///
/// Records are kept in their JSON form. Every write holds the write lock for
/// its whole duration, so readers never observe a partially-applied write and
/// writes to the same uuid are serialized. Clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryAdapter {
    tables: Arc<RwLock<HashMap<String, Rows>>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Rows>>> {
        self.tables
            .read()
            .map_err(|_| AdapterError::Backend("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Rows>>> {
        self.tables
            .write()
            .map_err(|_| AdapterError::Backend("lock poisoned".into()))
    }

    /// Names of every table that has been written to, sorted.
    pub fn tables(&self) -> Result<Vec<String>> {
        let tables = self.read()?;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Drop every record in `table`, returning how many were removed.
    pub fn clear<T: Table + ?Sized>(&self, table: &T) -> Result<usize> {
        check_table_name(table)?;
        let mut tables = self.write()?;
        let removed = tables.get_mut(table.name()).map_or(0, |rows| {
            let n = rows.len();
            rows.clear();
            n
        });
        debug!(table = table.name(), removed, "cleared table");
        Ok(removed)
    }

    /// Collect clones of every record in `table` matching `query`.
    fn scan<T: Table + ?Sized>(&self, table: &T, query: Option<&Query>) -> Result<Vec<Value>> {
        let tables = self.read()?;
        let Some(rows) = tables.get(table.name()) else {
            return Ok(Vec::new());
        };
        let mut matched = Vec::new();
        for record in rows.values() {
            if query::matches(query, record)? {
                matched.push(record.clone());
            }
        }
        Ok(matched)
    }
}

fn encode<S: Storable>(storable: &S) -> Result<Value> {
    let value = serde_json::to_value(storable)?;
    if !value.is_object() {
        return Err(AdapterError::Validation(
            "record must serialize to a JSON object".into(),
        ));
    }
    Ok(value)
}

fn check_query(query: Option<&Query>) -> Result<()> {
    match query {
        Some(q) => q.validate(),
        None => Ok(()),
    }
}

fn render(query: Option<&Query>) -> String {
    query.map_or_else(|| "*".to_string(), Query::to_string)
}

#[async_trait]
impl Adapter for InMemoryAdapter {
    async fn connect(&self) -> Result<bool> {
        trace!("in-memory adapter connected");
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool> {
        trace!("in-memory adapter disconnected");
        Ok(true)
    }

    async fn insert<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        check_table(table, storable)?;
        let record = encode(storable)?;
        let uuid = storable.uuid();
        let mut tables = self.write()?;
        let replaced = tables
            .entry(table.name().to_string())
            .or_default()
            .insert(uuid, record)
            .is_some();
        debug!(table = table.name(), %uuid, replaced, "inserted record");
        Ok(true)
    }

    async fn find<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        uuid: Uuid,
    ) -> Result<Option<S>> {
        check_table_name(table)?;
        let record = {
            let tables = self.read()?;
            tables
                .get(table.name())
                .and_then(|rows| rows.get(&uuid))
                .cloned()
        };
        trace!(table = table.name(), %uuid, found = record.is_some(), "find");
        match record {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn fetch_with<T: Table + ?Sized, S: Storable>(
        &self,
        table: &T,
        query: Option<&Query>,
        options: &FetchOptions,
    ) -> Result<Vec<S>> {
        check_table_name(table)?;
        check_query(query)?;
        let matched = options.apply(self.scan(table, query)?, |v| v);
        debug!(
            table = table.name(),
            query = %render(query),
            matched = matched.len(),
            "fetch"
        );
        matched
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(AdapterError::from))
            .collect()
    }

    async fn update<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        check_table(table, storable)?;
        let record = encode(storable)?;
        let uuid = storable.uuid();
        let mut tables = self.write()?;
        match tables
            .get_mut(table.name())
            .and_then(|rows| rows.get_mut(&uuid))
        {
            Some(slot) => {
                *slot = record;
                debug!(table = table.name(), %uuid, "updated record");
                Ok(true)
            }
            None => Err(AdapterError::NotFound {
                table: table.name().to_string(),
                uuid,
            }),
        }
    }

    async fn delete<T: Table + ?Sized, S: Storable>(&self, table: &T, storable: &S) -> Result<bool> {
        check_table(table, storable)?;
        let uuid = storable.uuid();
        let mut tables = self.write()?;
        let removed = tables
            .get_mut(table.name())
            .is_some_and(|rows| rows.remove(&uuid).is_some());
        debug!(table = table.name(), %uuid, removed, "delete");
        Ok(removed)
    }

    async fn count<T: Table + ?Sized>(&self, table: &T, query: Option<&Query>) -> Result<usize> {
        check_table_name(table)?;
        check_query(query)?;
        let tables = self.read()?;
        let Some(rows) = tables.get(table.name()) else {
            return Ok(0);
        };
        let mut count = 0;
        for record in rows.values() {
            if query::matches(query, record)? {
                count += 1;
            }
        }
        debug!(table = table.name(), query = %render(query), count, "count");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Gadget, Widget, WidgetTable};
    use crate::{Expression, Sort};

    fn name_is(name: &str) -> Query {
        Query::expression(Expression::equal("name", name))
    }

    #[tokio::test]
    async fn can_initialize_empty() {
        let adapter = InMemoryAdapter::new();
        assert!(adapter.tables().unwrap().is_empty());
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn connect_and_disconnect_are_idempotent() {
        let adapter = InMemoryAdapter::new();
        assert!(adapter.disconnect().await.unwrap());
        assert!(adapter.connect().await.unwrap());
        assert!(adapter.connect().await.unwrap());
        assert!(adapter.disconnect().await.unwrap());
        assert!(adapter.disconnect().await.unwrap());
    }

    #[tokio::test]
    async fn disconnect_keeps_data() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("Test")).await.unwrap();
        adapter.disconnect().await.unwrap();
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn can_insert() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        assert!(adapter.insert(&WidgetTable::Widget, &widget).await.unwrap());
        assert_eq!(adapter.tables().unwrap(), vec!["widget".to_string()]);
    }

    #[tokio::test]
    async fn insert_overwrites_same_uuid() {
        let adapter = InMemoryAdapter::new();
        let mut widget = Widget::new("Test");
        adapter.insert(&WidgetTable::Widget, &widget).await.unwrap();
        widget.name = "Foo".into();
        assert!(adapter.insert(&WidgetTable::Widget, &widget).await.unwrap());

        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 1);
        let found: Widget = adapter
            .find(&WidgetTable::Widget, widget.uuid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Foo");
    }

    #[tokio::test]
    async fn can_find_round_trip() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::sized("Test", 7);
        adapter.insert(&WidgetTable::Widget, &widget).await.unwrap();

        let found: Option<Widget> = adapter.find(&WidgetTable::Widget, widget.uuid).await.unwrap();
        assert_eq!(found, Some(widget));
    }

    #[tokio::test]
    async fn find_absent_is_none() {
        let adapter = InMemoryAdapter::new();
        let found: Option<Widget> = adapter.find("widget", Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());

        adapter.insert("widget", &Widget::new("Test")).await.unwrap();
        let found: Option<Widget> = adapter.find("widget", Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn can_fetch() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("Test")).await.unwrap();

        let query = name_is("Test");
        let widgets: Vec<Widget> = adapter
            .fetch(&WidgetTable::Widget, Some(&query))
            .await
            .unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].name, "Test");
    }

    #[tokio::test]
    async fn fetch_filters_and_handles_unseen_tables() {
        let adapter = InMemoryAdapter::new();
        for (name, size) in [("a", 1), ("b", 5), ("c", 9)] {
            adapter
                .insert(&WidgetTable::Widget, &Widget::sized(name, size))
                .await
                .unwrap();
        }

        let big = Query::expression(Expression::greater_than_or_equal("size", 5));
        let widgets: Vec<Widget> = adapter.fetch(&WidgetTable::Widget, Some(&big)).await.unwrap();
        assert_eq!(widgets.len(), 2);

        let none = name_is("zzz");
        let widgets: Vec<Widget> = adapter.fetch(&WidgetTable::Widget, Some(&none)).await.unwrap();
        assert!(widgets.is_empty());

        let all: Vec<Widget> = adapter.fetch(&WidgetTable::Widget, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let unseen: Vec<Gadget> = adapter.fetch(&WidgetTable::Gadget, None).await.unwrap();
        assert!(unseen.is_empty());
    }

    #[tokio::test]
    async fn fetch_with_sorts_and_pages() {
        let adapter = InMemoryAdapter::new();
        for (name, size) in [("a", 3), ("b", 1), ("c", 2), ("d", 4)] {
            adapter
                .insert(&WidgetTable::Widget, &Widget::sized(name, size))
                .await
                .unwrap();
        }

        let options = FetchOptions::new()
            .sort(Sort::descending("size"))
            .offset(1)
            .limit(2);
        let widgets: Vec<Widget> = adapter
            .fetch_with(&WidgetTable::Widget, None, &options)
            .await
            .unwrap();
        let names: Vec<&str> = widgets.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn can_update() {
        let adapter = InMemoryAdapter::new();
        let mut widget = Widget::new("Test");
        assert!(adapter.insert(&WidgetTable::Widget, &widget).await.unwrap());

        let fetched: Option<Widget> = adapter.find(&WidgetTable::Widget, widget.uuid).await.unwrap();
        assert!(fetched.is_some());

        widget.name = "Foo".into();
        assert!(adapter.update(&WidgetTable::Widget, &widget).await.unwrap());

        let fetched: Option<Widget> = adapter.find(&WidgetTable::Widget, widget.uuid).await.unwrap();
        assert_eq!(fetched.map(|w| w.name), Some("Foo".to_string()));
    }

    #[tokio::test]
    async fn update_absent_is_not_found() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        let err = adapter
            .update(&WidgetTable::Widget, &widget)
            .await
            .unwrap_err();
        match err {
            AdapterError::NotFound { table, uuid } => {
                assert_eq!(table, "widget");
                assert_eq!(uuid, widget.uuid);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        // a failed update must not create the record
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn can_delete() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        assert!(adapter.insert(&WidgetTable::Widget, &widget).await.unwrap());
        assert!(adapter.delete(&WidgetTable::Widget, &widget).await.unwrap());
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_absent_returns_false() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        assert!(!adapter.delete(&WidgetTable::Widget, &widget).await.unwrap());

        adapter.insert(&WidgetTable::Widget, &widget).await.unwrap();
        assert!(adapter.delete(&WidgetTable::Widget, &widget).await.unwrap());
        assert!(!adapter.delete(&WidgetTable::Widget, &widget).await.unwrap());
    }

    #[tokio::test]
    async fn can_count() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("Test")).await.unwrap();
        let query = name_is("Test");
        assert_eq!(
            adapter.count(&WidgetTable::Widget, Some(&query)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn count_equals_fetch_len() {
        let adapter = InMemoryAdapter::new();
        for i in 0..10 {
            adapter
                .insert(&WidgetTable::Widget, &Widget::sized("w", i))
                .await
                .unwrap();
        }
        let queries = [
            None,
            Some(Query::expression(Expression::less_than("size", 4))),
            Some(Query::not(Query::expression(Expression::less_than("size", 4)))),
            Some(Query::or(
                Query::expression(Expression::equal("size", 0)),
                Query::expression(Expression::equal("size", 9)),
            )),
            Some(name_is("nope")),
        ];
        for q in &queries {
            let fetched: Vec<Widget> = adapter.fetch(&WidgetTable::Widget, q.as_ref()).await.unwrap();
            let counted = adapter.count(&WidgetTable::Widget, q.as_ref()).await.unwrap();
            assert_eq!(counted, fetched.len());
        }
    }

    #[tokio::test]
    async fn tables_are_partitioned() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("Test")).await.unwrap();
        adapter.insert(&WidgetTable::Gadget, &Gadget::new("g")).await.unwrap();

        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 1);
        assert_eq!(adapter.count(&WidgetTable::Gadget, None).await.unwrap(), 1);
        assert_eq!(
            adapter.tables().unwrap(),
            vec!["gadget".to_string(), "widget".to_string()]
        );
    }

    #[tokio::test]
    async fn writes_reject_foreign_table() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        let err = adapter
            .insert(&WidgetTable::Gadget, &widget)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::TableMismatch { .. }));
        assert!(matches!(
            adapter.update(&WidgetTable::Gadget, &widget).await,
            Err(AdapterError::TableMismatch { .. })
        ));
        assert!(matches!(
            adapter.delete(&WidgetTable::Gadget, &widget).await,
            Err(AdapterError::TableMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn empty_table_name_is_validation_error() {
        let adapter = InMemoryAdapter::new();
        assert!(matches!(
            adapter.count("", None).await,
            Err(AdapterError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn malformed_query_fails_even_on_empty_table() {
        let adapter = InMemoryAdapter::new();
        let query = Query::expression(Expression::equal("", "x"));
        assert!(matches!(
            adapter.count(&WidgetTable::Widget, Some(&query)).await,
            Err(AdapterError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn ordering_type_mismatch_surfaces_as_error() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("Test")).await.unwrap();
        let query = Query::expression(Expression::greater_than("name", 5));
        let result: Result<Vec<Widget>> = adapter.fetch(&WidgetTable::Widget, Some(&query)).await;
        assert!(matches!(result, Err(AdapterError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn find_with_wrong_type_is_serialization_error() {
        let adapter = InMemoryAdapter::new();
        let widget = Widget::new("Test");
        adapter.insert(&WidgetTable::Widget, &widget).await.unwrap();
        let result: Result<Option<Gadget>> = adapter.find(&WidgetTable::Widget, widget.uuid).await;
        assert!(matches!(result, Err(AdapterError::Serialization(_))));
    }

    #[tokio::test]
    async fn clear_empties_one_table() {
        let adapter = InMemoryAdapter::new();
        adapter.insert(&WidgetTable::Widget, &Widget::new("a")).await.unwrap();
        adapter.insert(&WidgetTable::Widget, &Widget::new("b")).await.unwrap();
        adapter.insert(&WidgetTable::Gadget, &Gadget::new("g")).await.unwrap();

        assert_eq!(adapter.clear(&WidgetTable::Widget).unwrap(), 2);
        assert_eq!(adapter.clear("unseen").unwrap(), 0);
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 0);
        assert_eq!(adapter.count(&WidgetTable::Gadget, None).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn clones_share_state_across_tasks() {
        let adapter = InMemoryAdapter::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                adapter
                    .insert(&WidgetTable::Widget, &Widget::sized("w", i))
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }
        assert_eq!(adapter.count(&WidgetTable::Widget, None).await.unwrap(), 8);
    }
}
