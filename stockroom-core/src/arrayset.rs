//! Arraysets: named, schema-constrained sample collections

use crate::array::NdArray;
use crate::backend::{BackendCode, choose_backend};
use crate::error::{Result, StoreError};
use crate::object::{ArraysetManifest, ObjectId, SampleRef};
use crate::repository::Environments;
use crate::schema::ArraySchema;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named collection of samples sharing one schema
///
/// Samples are written through the backend as soon as they are added; the
/// key -> sample mapping only becomes durable at commit time.
pub struct Arrayset {
    name: String,
    schema: ArraySchema,
    backend: BackendCode,
    env: Arc<Environments>,
    samples: BTreeMap<String, SampleRef>,
    dirty: bool,
}

impl Arrayset {
    fn new(env: Arc<Environments>, name: String, schema: ArraySchema) -> Self {
        let backend = choose_backend(&schema);
        Self {
            name,
            schema,
            backend,
            env,
            samples: BTreeMap::new(),
            dirty: false,
        }
    }

    fn from_manifest(env: Arc<Environments>, name: String, manifest: &ArraysetManifest) -> Self {
        let backend = choose_backend(&manifest.schema);
        Self {
            name,
            schema: manifest.schema.clone(),
            backend,
            env,
            samples: manifest.samples.clone(),
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    pub fn backend(&self) -> BackendCode {
        self.backend
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.samples.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    /// Add or replace a sample under `key`
    pub fn add(&mut self, key: &str, array: &NdArray) -> Result<ObjectId> {
        if key.is_empty() {
            return Err(StoreError::InvalidName(key.to_string()));
        }
        if !self.schema.matches(array) {
            return Err(StoreError::SchemaMismatch {
                key: key.to_string(),
                expected: self.schema.to_string(),
                actual: ArraySchema::from_prototype(array).to_string(),
            });
        }

        let id = self.env.store(self.backend)?.put(array.data())?;
        self.samples.insert(
            key.to_string(),
            SampleRef {
                id,
                backend: self.backend,
            },
        );
        self.dirty = true;
        tracing::debug!(arrayset = %self.name, key, id = %id.short_hex(), "Added sample");
        Ok(id)
    }

    /// Read a sample back
    pub fn get(&self, key: &str) -> Result<NdArray> {
        let sample = self
            .samples
            .get(key)
            .ok_or_else(|| StoreError::SampleNotFound(key.to_string()))?;
        let data = self.env.store(sample.backend)?.get(sample.id)?;
        NdArray::from_parts(self.schema.dtype, self.schema.shape.clone(), data.to_vec())
    }

    pub(crate) fn manifest(&self) -> ArraysetManifest {
        ArraysetManifest {
            schema: self.schema.clone(),
            samples: self.samples.clone(),
        }
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Registry of arraysets inside a write checkout
pub struct Arraysets {
    env: Arc<Environments>,
    sets: BTreeMap<String, Arrayset>,
    /// Set when an arrayset was declared since the last commit
    declared: bool,
}

impl Arraysets {
    pub(crate) fn new(env: Arc<Environments>) -> Self {
        Self {
            env,
            sets: BTreeMap::new(),
            declared: false,
        }
    }

    pub(crate) fn from_manifests(
        env: Arc<Environments>,
        manifests: &BTreeMap<String, ArraysetManifest>,
    ) -> Self {
        let sets = manifests
            .iter()
            .map(|(name, manifest)| {
                (
                    name.clone(),
                    Arrayset::from_manifest(Arc::clone(&env), name.clone(), manifest),
                )
            })
            .collect();
        Self {
            env,
            sets,
            declared: false,
        }
    }

    /// Declare a new arrayset whose schema is derived from `prototype`
    pub fn init_arrayset(&mut self, name: &str, prototype: &NdArray) -> Result<&mut Arrayset> {
        if name.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if self.sets.contains_key(name) {
            return Err(StoreError::ArraysetExists(name.to_string()));
        }
        let schema = ArraySchema::from_prototype(prototype);
        tracing::debug!(arrayset = name, schema = %schema, "Declared arrayset");
        let set = Arrayset::new(Arc::clone(&self.env), name.to_string(), schema);
        self.sets.insert(name.to_string(), set);
        self.declared = true;
        Ok(self.sets.get_mut(name).ok_or_else(|| {
            StoreError::ArraysetNotFound(name.to_string())
        })?)
    }

    pub fn get(&self, name: &str) -> Option<&Arrayset> {
        self.sets.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Arrayset> {
        self.sets.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn manifests(&self) -> BTreeMap<String, ArraysetManifest> {
        self.sets
            .iter()
            .map(|(name, set)| (name.clone(), set.manifest()))
            .collect()
    }

    pub(crate) fn any_dirty(&self) -> bool {
        self.declared || self.sets.values().any(Arrayset::is_dirty)
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.declared = false;
        for set in self.sets.values_mut() {
            set.clear_dirty();
        }
    }
}

/// Read-only view over one committed arrayset
pub struct ArraysetView {
    env: Arc<Environments>,
    name: String,
    manifest: ArraysetManifest,
}

impl ArraysetView {
    pub(crate) fn new(env: Arc<Environments>, name: String, manifest: ArraysetManifest) -> Self {
        Self {
            env,
            name,
            manifest,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ArraySchema {
        &self.manifest.schema
    }

    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.manifest.samples.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.manifest.samples.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<NdArray> {
        let sample = self
            .manifest
            .samples
            .get(key)
            .ok_or_else(|| StoreError::SampleNotFound(key.to_string()))?;
        let data = self.env.store(sample.backend)?.get(sample.id)?;
        NdArray::from_parts(
            self.manifest.schema.dtype,
            self.manifest.schema.shape.clone(),
            data.to_vec(),
        )
    }
}
