//! Entity documents on disk.
//!
//! A document is a flat list of named shape records. Bodies and parts are
//! stored with their colour; a reference surface is stored as a separate
//! `Sref` record under the same name as its owner.
//!
//! Two encodings, chosen by file suffix:
//! * `.xml` is structured text (pretty-printed JSON)
//! * `.xbf` is binary (deflated compact JSON behind a magic header)

use crate::entity::{Color, Entity, EntityBuilder, EntityKind};
use crate::error::ModelError;
use crate::kernel::GeometryKernel;
use crate::reference::{Geometry, SrefOptions};
use crate::topo::IdGenerator;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

const BINARY_MAGIC: &[u8; 4] = b"XBF1";
const DOCUMENT_VERSION: u32 = 1;
const COMPRESSION_LEVEL: u8 = 6;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("unsupported document suffix: {0}")]
    DocumentFormat(String),

    #[error("binary flag {binary} does not match the suffix of {path}")]
    FormatMismatch { path: String, binary: bool },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary document error: {0}")]
    Binary(String),

    #[error("entity error: {0}")]
    Model(#[from] ModelError),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Binary,
    Text,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> ExchangeResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("xbf") => Ok(DocumentFormat::Binary),
            Some("xml") => Ok(DocumentFormat::Text),
            _ => Err(ExchangeError::DocumentFormat(path.display().to_string())),
        }
    }

    /// Format for `path`, rejecting a `binary` flag that disagrees with it.
    pub fn checked(path: &Path, binary: bool) -> ExchangeResult<Self> {
        let format = Self::from_path(path)?;
        if (format == DocumentFormat::Binary) != binary {
            return Err(ExchangeError::FormatMismatch {
                path: path.display().to_string(),
                binary,
            });
        }
        Ok(format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTag {
    Body,
    Part,
    Sref,
}

impl From<EntityKind> for RecordTag {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Body => RecordTag::Body,
            EntityKind::Part => RecordTag::Part,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRecord<S> {
    pub name: String,
    pub tag: RecordTag,
    pub shape: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<S> {
    pub version: u32,
    pub records: Vec<ShapeRecord<S>>,
}

impl<S> Default for Document<S> {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            records: Vec::new(),
        }
    }
}

impl<S: Serialize + DeserializeOwned> Document<S> {
    /// Records for `entity`: its shape, then its reference surface as an
    /// undivided face. An entity without a shape contributes no structural
    /// record.
    pub fn push_entity<K>(&mut self, kernel: &K, entity: &Entity<K>)
    where
        K: GeometryKernel<Shape = S>,
        S: Clone,
    {
        match entity.shape() {
            Some(shape) => self.records.push(ShapeRecord {
                name: entity.label().to_string(),
                tag: entity.kind().into(),
                shape: shape.clone(),
                color: Some(entity.color()),
            }),
            None => warn!(id = %entity.id(), label = entity.label(), "skipping entity without shape"),
        }
        if let Some(sref) = entity.sref() {
            self.records.push(ShapeRecord {
                name: entity.label().to_string(),
                tag: RecordTag::Sref,
                shape: kernel.face_from_surface(sref.surface()),
                color: None,
            });
        }
    }

    pub fn to_bytes(&self, format: DocumentFormat) -> ExchangeResult<Vec<u8>> {
        match format {
            DocumentFormat::Text => Ok(serde_json::to_vec_pretty(self)?),
            DocumentFormat::Binary => {
                let packed = serde_json::to_vec(self)?;
                let mut out = BINARY_MAGIC.to_vec();
                out.extend(miniz_oxide::deflate::compress_to_vec(&packed, COMPRESSION_LEVEL));
                Ok(out)
            }
        }
    }

    pub fn from_bytes(bytes: &[u8], format: DocumentFormat) -> ExchangeResult<Self> {
        match format {
            DocumentFormat::Text => Ok(serde_json::from_slice(bytes)?),
            DocumentFormat::Binary => {
                let body = bytes
                    .strip_prefix(BINARY_MAGIC.as_slice())
                    .ok_or_else(|| ExchangeError::Binary("missing document header".into()))?;
                let packed = miniz_oxide::inflate::decompress_to_vec(body)
                    .map_err(|e| ExchangeError::Binary(format!("{:?}", e)))?;
                Ok(serde_json::from_slice(&packed)?)
            }
        }
    }

    pub fn save(&self, path: &Path, binary: bool) -> ExchangeResult<()> {
        let format = DocumentFormat::checked(path, binary)?;
        std::fs::write(path, self.to_bytes(format)?)?;
        info!(path = %path.display(), records = self.records.len(), "document saved");
        Ok(())
    }

    pub fn load(path: &Path) -> ExchangeResult<Self> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, format)
    }
}

/// Save `entities` to `path`. The suffix picks the encoding and must agree
/// with `binary`.
pub fn save_entities<'a, K>(
    kernel: &K,
    path: impl AsRef<Path>,
    entities: impl IntoIterator<Item = &'a Entity<K>>,
    binary: bool,
) -> ExchangeResult<()>
where
    K: GeometryKernel + 'a,
    K::Shape: Serialize + DeserializeOwned,
{
    let path = path.as_ref();
    // fail on the suffix before touching any entity
    DocumentFormat::checked(path, binary)?;
    let mut document = Document::default();
    for entity in entities {
        document.push_entity(kernel, entity);
    }
    document.save(path, binary)
}

pub fn save_entity<K>(kernel: &K, path: impl AsRef<Path>, entity: &Entity<K>, binary: bool) -> ExchangeResult<()>
where
    K: GeometryKernel,
    K::Shape: Serialize + DeserializeOwned,
{
    save_entities(kernel, path, std::iter::once(entity), binary)
}

/// Load every body and part in the document at `path`, keyed by name.
///
/// A reference surface is reattached from the `Sref` record of the same
/// name. Later records with a repeated name replace earlier ones.
pub fn load_entities<K>(kernel: &K, ids: &IdGenerator, path: impl AsRef<Path>) -> ExchangeResult<BTreeMap<String, Entity<K>>>
where
    K: GeometryKernel,
    K::Shape: Serialize + DeserializeOwned,
{
    let path = path.as_ref();
    let document = Document::<K::Shape>::load(path)?;
    let entities = entities_from_document(kernel, ids, document)?;
    info!(path = %path.display(), entities = entities.len(), "document loaded");
    Ok(entities)
}

/// Load a single-entity document.
pub fn load_entity<K>(kernel: &K, ids: &IdGenerator, path: impl AsRef<Path>) -> ExchangeResult<Option<Entity<K>>>
where
    K: GeometryKernel,
    K::Shape: Serialize + DeserializeOwned,
{
    let entities = load_entities(kernel, ids, path)?;
    if entities.len() > 1 {
        warn!(count = entities.len(), "document holds several entities, returning the first by name");
    }
    Ok(entities.into_values().next())
}

fn entities_from_document<K: GeometryKernel>(
    kernel: &K,
    ids: &IdGenerator,
    document: Document<K::Shape>,
) -> ExchangeResult<BTreeMap<String, Entity<K>>> {
    let (srefs, structural): (Vec<_>, Vec<_>) = document
        .records
        .into_iter()
        .partition(|r| r.tag == RecordTag::Sref);

    let mut surfaces: HashMap<String, K::Surface> = HashMap::new();
    for record in srefs {
        match kernel.surface_of_face(&record.shape) {
            Some(surface) => {
                surfaces.insert(record.name, surface);
            }
            None => warn!(name = %record.name, "sref record holds no face, skipped"),
        }
    }

    let mut out = BTreeMap::new();
    for record in structural {
        let kind = match record.tag {
            RecordTag::Body => EntityKind::Body,
            _ => EntityKind::Part,
        };
        let mut builder = EntityBuilder::new(record.name.clone(), kind).with_shape(record.shape);
        if let Some(surface) = surfaces.get(&record.name) {
            builder = builder.with_sref(Geometry::Surface(surface.clone()), SrefOptions::default());
        }
        if let Some(color) = record.color {
            builder = builder.with_color(color);
        }
        let entity = builder.build(kernel, ids)?;
        out.insert(record.name, entity);
    }
    Ok(out)
}
