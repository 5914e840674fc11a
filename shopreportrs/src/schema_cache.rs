use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::SchemaCacheConfig;

#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub columns: Vec<ColumnSchema>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    schema: TableSchema,
    inserted_at: Instant,
}

/// Live-schema cache with TTL and size limits, keyed by storage table name.
#[derive(Debug)]
pub struct SchemaCache {
    schemas: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_config(&SchemaCacheConfig::default())
    }

    pub fn with_config(config: &SchemaCacheConfig) -> Self {
        Self {
            schemas: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_size: config.max_size,
        }
    }

    pub fn insert(&mut self, table: String, schema: TableSchema) {
        if self.schemas.len() >= self.max_size {
            self.evict_oldest();
        }
        self.schemas.insert(
            table,
            CacheEntry {
                schema,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.schemas.get(table).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(&entry.schema)
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .schemas
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
        {
            tracing::debug!(table = %oldest_key, "evicting oldest schema from cache");
            self.schemas.remove(&oldest_key);
        }
    }
}
