use itertools::Itertools;
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::generate_id;
use crate::store::error::BackendError;
use crate::store::traits::{DataService, ListQuery, Row, StorageService};

/// Operation recorded by [`MemoryDataService`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { table: String },
    Insert { table: String, row: Row },
    Update { table: String, id: String, row: Row },
    Delete { table: String, id: String },
    Upload { bucket: String, path: String },
}

#[derive(Debug, Clone)]
struct ForeignKey {
    table: String,
    column: String,
    target: String,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    unique: Vec<(String, String)>,
    foreign_keys: Vec<ForeignKey>,
    failures: HashMap<String, VecDeque<BackendError>>,
    calls: Vec<Call>,
    buckets: HashSet<String>,
    objects: HashMap<(String, String), (String, usize)>,
    can_create_buckets: bool,
}

/// In-process row and blob service with the same error vocabulary as the
/// remote one. Tables that were never provisioned report `RelationMissing`,
/// which is how demo mode runs on fallback data.
pub struct MemoryDataService {
    state: Mutex<MemoryState>,
}

impl Default for MemoryDataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataService {
    /// No tables, bucket creation allowed
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                can_create_buckets: true,
                ..Default::default()
            }),
        }
    }

    /// Tables for every catalog kind plus the user table, with the natural
    /// key uniqueness and owner foreign keys the real schema carries
    pub fn with_catalog_schema() -> Self {
        let service = Self::new();
        for table in ["puxadores", "trilhos", "vidros", "usuarios"] {
            service.provision(table);
        }
        service.unique("puxadores", "modelo");
        service.unique("trilhos", "nome");
        service.unique("vidros", "tipo");
        service.references("puxadores", "id_usuario", "usuarios");
        service.references("trilhos", "id_usuario", "usuarios");
        service
    }

    pub fn provision(&self, table: &str) {
        self.state
            .lock()
            .tables
            .entry(table.to_string())
            .or_default();
    }

    pub fn drop_table(&self, table: &str) {
        self.state.lock().tables.remove(table);
    }

    pub fn unique(&self, table: &str, column: &str) {
        self.state
            .lock()
            .unique
            .push((table.to_string(), column.to_string()));
    }

    pub fn references(&self, table: &str, column: &str, target: &str) {
        self.state.lock().foreign_keys.push(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
            target: target.to_string(),
        });
    }

    /// Insert a row directly, bypassing constraints and the call log
    pub fn seed(&self, table: &str, row: Row) {
        self.state
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Make the next operation on `table` fail with `error`
    pub fn fail_next(&self, table: &str, error: BackendError) {
        self.state
            .lock()
            .failures
            .entry(table.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn set_bucket_creation(&self, allowed: bool) {
        self.state.lock().can_create_buckets = allowed;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Calls other than listings
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::List { .. }))
            .collect()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object_size(&self, bucket: &str, path: &str) -> Option<usize> {
        self.state
            .lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|(_, size)| *size)
    }
}

fn column_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl MemoryState {
    fn take_failure(&mut self, table: &str) -> Result<(), BackendError> {
        match self.failures.get_mut(table).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn table(&self, table: &str) -> Result<&Vec<Row>, BackendError> {
        self.tables.get(table).ok_or_else(|| BackendError::RelationMissing {
            relation: table.to_string(),
        })
    }

    fn check_constraints(&self, table: &str, row: &Row, own_id: Option<&str>) -> Result<(), BackendError> {
        let rows = self.table(table)?;

        for (_, column) in self.unique.iter().filter(|(t, _)| t == table) {
            let Some(value) = column_text(row, column) else {
                continue;
            };
            let clash = rows.iter().any(|existing| {
                column_text(existing, column).as_deref() == Some(value.as_str())
                    && column_text(existing, "id").as_deref() != own_id
            });
            if clash {
                return Err(BackendError::UniquenessViolation {
                    message: format!(
                        "duplicate key value violates unique constraint \"{}_{}_key\"",
                        table, column
                    ),
                });
            }
        }

        for fk in self.foreign_keys.iter().filter(|fk| fk.table == table) {
            let Some(value) = column_text(row, &fk.column) else {
                continue;
            };
            let Some(targets) = self.tables.get(&fk.target) else {
                continue;
            };
            if !targets
                .iter()
                .any(|target| column_text(target, "id").as_deref() == Some(value.as_str()))
            {
                return Err(BackendError::ForeignKeyViolation {
                    message: format!(
                        "insert or update on table \"{}\" violates foreign key constraint on \"{}\"",
                        table, fk.column
                    ),
                });
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl DataService for MemoryDataService {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Row>, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::List {
            table: table.to_string(),
        });
        state.take_failure(table)?;

        let rows = state
            .table(table)?
            .iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, value)| column_text(row, column).as_deref() == Some(value.as_str()))
            })
            .cloned();

        let rows: Vec<Row> = match &query.order_by {
            Some(column) => rows
                .sorted_by_key(|row| column_text(row, column).unwrap_or_default())
                .collect(),
            None => rows.collect(),
        };

        Ok(match query.limit {
            Some(limit) => rows.into_iter().take(limit).collect(),
            None => rows,
        })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Insert {
            table: table.to_string(),
            row: row.clone(),
        });
        state.take_failure(table)?;
        state.check_constraints(table, &row, None)?;

        let mut stored = row;
        if let Some(object) = stored.as_object_mut() {
            object
                .entry("id")
                .or_insert_with(|| Value::String(generate_id()));
            object
                .entry("criado_em")
                .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        }

        debug!("memory insert into {}", table);
        state
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::RelationMissing {
                relation: table.to_string(),
            })?
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: &str, row: Row, id: &str) -> Result<Row, BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Update {
            table: table.to_string(),
            id: id.to_string(),
            row: row.clone(),
        });
        state.take_failure(table)?;
        state.check_constraints(table, &row, Some(id))?;

        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::RelationMissing {
                relation: table.to_string(),
            })?;
        let existing = rows
            .iter_mut()
            .find(|existing| column_text(existing, "id").as_deref() == Some(id))
            .ok_or(BackendError::NotFound)?;

        if let (Some(target), Some(changes)) = (existing.as_object_mut(), row.as_object()) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(existing.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Delete {
            table: table.to_string(),
            id: id.to_string(),
        });
        state.take_failure(table)?;

        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::RelationMissing {
                relation: table.to_string(),
            })?;
        rows.retain(|row| column_text(row, "id").as_deref() != Some(id));
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageService for MemoryDataService {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        Ok(self.state.lock().buckets.contains(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if !state.can_create_buckets {
            return Err(BackendError::Unknown {
                code: Some("403".to_string()),
                message: "bucket creation is not permitted".to_string(),
            });
        }
        state.buckets.insert(bucket.to_string());
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        if !state.buckets.contains(bucket) {
            return Err(BackendError::NotFound);
        }
        state.objects.insert(
            (bucket.to_string(), path.to_string()),
            (content_type.to_string(), bytes.len()),
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}
