use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use docvault_types::{Clock, SystemClock};
use docvault_validate::XsdValidator;

use crate::backend::{DocumentBackend, FileBackend, InMemoryBackend};
use crate::config::StoreConfig;
use crate::engine::DocumentStore;
use crate::error::StoreResult;
use crate::gate::{OpenGate, SchemaGate, SchemaResolver};
use crate::variant::{ModelVariant, SchemaVariant};

/// File holding schema documents under a vault root.
pub const SCHEMAS_FILE: &str = "schemas.json";
/// File holding model documents under a vault root.
pub const MODELS_FILE: &str = "models.json";
/// Optional configuration file under a vault root.
pub const CONFIG_FILE: &str = "docvault.toml";

/// A schema store and a model store, with models validated against the
/// schemas in the same vault.
pub struct Vault {
    schemas: Arc<DocumentStore<SchemaVariant>>,
    models: DocumentStore<ModelVariant>,
    root: Option<PathBuf>,
}

impl Vault {
    /// A vault that lives only in memory.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::with_backends(
            InMemoryBackend::new(),
            InMemoryBackend::new(),
            config,
            Arc::new(SystemClock),
        )
    }

    /// Open (or start) a vault persisted under `root`.
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let schemas = FileBackend::open(root.join(SCHEMAS_FILE))?;
        let models = FileBackend::open(root.join(MODELS_FILE))?;
        info!(root = %root.display(), "vault opened");
        let mut vault = Self::with_backends(schemas, models, config, Arc::new(SystemClock));
        vault.root = Some(root.to_path_buf());
        Ok(vault)
    }

    /// Wire a vault from explicit backends and clock.
    pub fn with_backends(
        schemas: impl DocumentBackend<SchemaVariant> + 'static,
        models: impl DocumentBackend<ModelVariant> + 'static,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let schemas = Arc::new(
            DocumentStore::new(schemas, OpenGate, config.clone()).with_clock(Arc::clone(&clock)),
        );
        let resolver: Arc<dyn SchemaResolver> = schemas.clone();
        let gate = SchemaGate::new(resolver, Arc::new(XsdValidator::new(config.validation.clone())));
        let models = DocumentStore::new(models, gate, config).with_clock(clock);
        Self {
            schemas,
            models,
            root: None,
        }
    }

    pub fn schemas(&self) -> &DocumentStore<SchemaVariant> {
        &self.schemas
    }

    pub fn models(&self) -> &DocumentStore<ModelVariant> {
        &self.models
    }

    pub fn config(&self) -> &StoreConfig {
        self.models.config()
    }

    /// Directory the vault persists to, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
