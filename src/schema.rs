//! Feature schema: an ordered, fit-once list of (unit, field) bindings.
//!
//! The schema turns records into a [`FeatureMatrix`]. Column block `i` of the
//! matrix always belongs to binding `i`, so the order in which features are
//! added is the column layout a trained model depends on.
//!
//! Lifecycle:
//!
//! 1. [`FeatureSchema::add_feature`] appends bindings.
//! 2. [`FeatureSchema::build`] fits the units that need it on the training
//!    corpus, freezes every binding's width, and returns the training matrix.
//! 3. [`FeatureSchema::transform`] replays the frozen layout on new records.
//!    It never refits.
//!
//! A built schema rejects further bindings. [`FeatureSchema::save`] and
//! [`FeatureSchema::load`] carry the fitted state to prediction time.
//!
//! # Examples
//!
//! ```
//! use clickbait::feature::{CharacterSum, HasMediaAttached};
//! use clickbait::record::Record;
//! use clickbait::schema::FeatureSchema;
//!
//! let records = vec![
//!     Record::builder()
//!         .add_text("postText", "Wow!")
//!         .add_text_list("postMedia", vec![])
//!         .build(),
//!     Record::builder()
//!         .add_text("postText", "Budget passed")
//!         .add_text_list("postMedia", vec!["photo.jpg".into()])
//!         .build(),
//! ];
//!
//! let mut schema = FeatureSchema::new();
//! schema.add_feature(CharacterSum, "postText").unwrap();
//! schema.add_feature(HasMediaAttached, "postMedia").unwrap();
//!
//! let matrix = schema.build(&records).unwrap();
//! assert_eq!(matrix.shape(), (2, 2));
//! assert_eq!(matrix.dense_row(1), vec![13.0, 1.0]);
//! ```

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClickbaitError, Result};
use crate::feature::{ContainsWordsFeature, FeatureUnit, UnitRegistry};
use crate::matrix::FeatureMatrix;
use crate::persist::{self, SCHEMA_MAGIC};
use crate::record::{FieldValue, Record};

/// One unit bound to the field it reads.
#[derive(Debug, Clone)]
pub struct FeatureBinding {
    unit: Box<dyn FeatureUnit>,
    field: String,
    width: Option<usize>,
}

impl FeatureBinding {
    pub fn unit(&self) -> &dyn FeatureUnit {
        self.unit.as_ref()
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Output width, frozen once the schema is built.
    pub fn width(&self) -> Option<usize> {
        self.width
    }
}

/// An ordered set of feature bindings with a fixed output layout once built.
#[derive(Debug, Clone, Default)]
pub struct FeatureSchema {
    bindings: Vec<FeatureBinding>,
    built: bool,
    width: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedBinding {
    kind: String,
    field: String,
    width: usize,
    state: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct PersistedSchema {
    bindings: Vec<PersistedBinding>,
    width: usize,
}

impl FeatureSchema {
    pub fn new() -> Self {
        FeatureSchema::default()
    }

    /// Append a binding of `unit` to `field`.
    ///
    /// The schema owns its units; to bind the same unit to several fields,
    /// pass a clone per field. Each binding is fitted on its own field.
    pub fn add_feature<U, S>(&mut self, unit: U, field: S) -> Result<()>
    where
        U: FeatureUnit + 'static,
        S: Into<String>,
    {
        self.add_boxed_feature(Box::new(unit), field)
    }

    /// Append a binding of an already boxed unit.
    pub fn add_boxed_feature<S: Into<String>>(
        &mut self,
        unit: Box<dyn FeatureUnit>,
        field: S,
    ) -> Result<()> {
        self.ensure_mutable()?;
        self.bindings.push(FeatureBinding {
            unit,
            field: field.into(),
            width: None,
        });
        Ok(())
    }

    /// Bind one default [`ContainsWordsFeature`] per regular file in `dir` to
    /// `field`, in file-name order. Returns the number of bindings added.
    pub fn add_word_lists_from_dir<P, S>(&mut self, dir: P, field: S) -> Result<usize>
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        self.ensure_mutable()?;
        let dir = dir.as_ref();
        let field = field.into();

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let units = paths
            .iter()
            .map(ContainsWordsFeature::from_file)
            .collect::<Result<Vec<_>>>()?;
        let added = units.len();
        for unit in units {
            self.bindings.push(FeatureBinding {
                unit: Box::new(unit),
                field: field.clone(),
                width: None,
            });
        }

        log::info!(
            "registered {added} word lists from {} on field '{field}'",
            dir.display()
        );
        Ok(added)
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.built {
            return Err(ClickbaitError::configuration(
                "cannot add features to a schema that has already been built",
            ));
        }
        Ok(())
    }

    /// Fit every unit that needs it on `corpus`, freeze the layout, and
    /// return the corpus's feature matrix.
    ///
    /// On error the schema is left exactly as it was: unbuilt, with its
    /// bindings unfitted.
    pub fn build(&mut self, corpus: &[Record]) -> Result<FeatureMatrix> {
        if self.built {
            return Err(ClickbaitError::configuration(
                "feature schema has already been built",
            ));
        }
        if corpus.is_empty() {
            return Err(ClickbaitError::data(
                "cannot build a feature schema on an empty corpus",
            ));
        }

        let mut units: Vec<Box<dyn FeatureUnit>> =
            self.bindings.iter().map(|b| b.unit.box_clone()).collect();
        let mut widths = Vec::with_capacity(units.len());

        for (binding, unit) in self.bindings.iter().zip(units.iter_mut()) {
            if unit.requires_fit() {
                let values = field_values(corpus, &binding.field)?;
                unit.fit(&values)?;
            }
            let width = unit.width().ok_or_else(|| {
                ClickbaitError::configuration(format!(
                    "unit '{}' on field '{}' has no width after fitting",
                    unit.kind(),
                    binding.field
                ))
            })?;
            log::debug!(
                "binding {} ({} on '{}'): {} columns",
                widths.len(),
                unit.kind(),
                binding.field,
                width
            );
            widths.push(width);
        }

        let layout: Vec<(&dyn FeatureUnit, &str, usize)> = units
            .iter()
            .zip(&self.bindings)
            .zip(&widths)
            .map(|((unit, binding), width)| (unit.as_ref(), binding.field.as_str(), *width))
            .collect();
        let matrix = assemble(&layout, corpus)?;

        for ((binding, unit), width) in self.bindings.iter_mut().zip(units).zip(widths) {
            binding.unit = unit;
            binding.width = Some(width);
        }
        self.width = matrix.ncols();
        self.built = true;

        log::info!(
            "built feature schema: {} bindings, {} columns, {} records",
            self.bindings.len(),
            self.width,
            corpus.len()
        );
        Ok(matrix)
    }

    /// Apply the frozen layout to `records`.
    pub fn transform(&self, records: &[Record]) -> Result<FeatureMatrix> {
        if !self.built {
            return Err(ClickbaitError::schema_not_built(
                "transform called before build",
            ));
        }
        let layout: Vec<(&dyn FeatureUnit, &str, usize)> = self
            .bindings
            .iter()
            .map(|b| (b.unit.as_ref(), b.field.as_str(), b.width.unwrap_or(0)))
            .collect();
        assemble(&layout, records)
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> &[FeatureBinding] {
        &self.bindings
    }

    /// Total number of columns, once built.
    pub fn width(&self) -> Option<usize> {
        self.built.then_some(self.width)
    }

    /// Column range of every binding, in binding order.
    pub fn column_ranges(&self) -> Result<Vec<Range<usize>>> {
        if !self.built {
            return Err(ClickbaitError::schema_not_built(
                "column layout is only known after build",
            ));
        }
        let mut offset = 0;
        Ok(self
            .bindings
            .iter()
            .map(|b| {
                let start = offset;
                offset += b.width.unwrap_or(0);
                start..offset
            })
            .collect())
    }

    /// Persist the built schema, including every unit's fitted state.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.built {
            return Err(ClickbaitError::schema_not_built(
                "only a built schema can be saved",
            ));
        }
        let bindings = self
            .bindings
            .iter()
            .map(|b| {
                Ok(PersistedBinding {
                    kind: b.unit.kind().to_string(),
                    field: b.field.clone(),
                    width: b.width.unwrap_or(0),
                    state: b.unit.save_state()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let persisted = PersistedSchema {
            bindings,
            width: self.width,
        };
        persist::write_artifact(path.as_ref(), SCHEMA_MAGIC, &persisted)?;
        log::info!("saved feature schema to {}", path.as_ref().display());
        Ok(())
    }

    /// Load a schema written by [`save`](Self::save) using the built-in units.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_registry(path, &UnitRegistry::default())
    }

    /// Load a schema whose bindings may include custom unit kinds.
    pub fn load_with_registry<P: AsRef<Path>>(path: P, registry: &UnitRegistry) -> Result<Self> {
        let persisted: PersistedSchema = persist::read_artifact(path.as_ref(), SCHEMA_MAGIC)?;

        let mut bindings = Vec::with_capacity(persisted.bindings.len());
        let mut total = 0;
        for (i, binding) in persisted.bindings.into_iter().enumerate() {
            let unit = registry.load(&binding.kind, &binding.state)?;
            if unit.width() != Some(binding.width) {
                return Err(ClickbaitError::corrupt_state(format!(
                    "binding {i} ({} on '{}') restores with width {:?}, expected {}",
                    binding.kind,
                    binding.field,
                    unit.width(),
                    binding.width
                )));
            }
            total += binding.width;
            bindings.push(FeatureBinding {
                unit,
                field: binding.field,
                width: Some(binding.width),
            });
        }
        if total != persisted.width {
            return Err(ClickbaitError::corrupt_state(format!(
                "binding widths sum to {total}, schema says {}",
                persisted.width
            )));
        }

        log::info!(
            "loaded feature schema from {}: {} bindings, {} columns",
            path.as_ref().display(),
            bindings.len(),
            total
        );
        Ok(FeatureSchema {
            bindings,
            built: true,
            width: total,
        })
    }
}

fn field_values<'a>(records: &'a [Record], field: &str) -> Result<Vec<&'a FieldValue>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .get(field)
                .ok_or_else(|| ClickbaitError::data(format!("record {i} has no field '{field}'")))
        })
        .collect()
}

/// Transform every record with every unit and lay the outputs side by side.
fn assemble(layout: &[(&dyn FeatureUnit, &str, usize)], records: &[Record]) -> Result<FeatureMatrix> {
    let total: usize = layout.iter().map(|(_, _, width)| width).sum();
    let mut matrix = FeatureMatrix::new(total);
    let mut sparse = false;

    for (row, record) in records.iter().enumerate() {
        let mut cells = Vec::new();
        let mut offset = 0;
        for (unit, field, width) in layout {
            let value = record.get(field).ok_or_else(|| {
                ClickbaitError::data(format!("record {row} has no field '{field}'"))
            })?;
            let output = unit.transform(value).map_err(|e| match e {
                ClickbaitError::Data(msg) => {
                    ClickbaitError::data(format!("record {row}, field '{field}': {msg}"))
                }
                other => other,
            })?;
            if output.width() != *width {
                return Err(ClickbaitError::data(format!(
                    "unit '{}' on field '{field}' produced {} columns for record {row}, expected {width}",
                    unit.kind(),
                    output.width()
                )));
            }
            sparse |= output.is_sparse();
            cells.extend(
                output
                    .nonzero()
                    .into_iter()
                    .map(|(column, value)| (offset + column, value)),
            );
            offset += width;
        }
        matrix.push_row(&cells)?;
    }

    matrix.set_sparse(sparse);
    Ok(matrix)
}
