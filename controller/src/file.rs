// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{
    dataset::Dataset,
    entity_index::EntityIndex,
    error::ErrorKind,
    ratings::{RatingEvent, Ratings},
    sparse::SparseBooleanMatrix,
    Controller, Result,
};
use csv::StringRecord;
use indicatif::ProgressIterator;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Input files of one run, attribute, relation and relevant item files are
/// only read when present
#[derive(Debug, Clone, Default)]
pub struct DataFiles {
    pub training: PathBuf,
    pub test: PathBuf,
    pub user_attributes: Option<PathBuf>,
    pub item_attributes: Option<PathBuf>,
    pub user_relation: Option<PathBuf>,
    pub relevant_items: Option<PathBuf>,
}

/// Reads delimited text files without headers.
///
/// Ratings lines are `user item [rating [timestamp]]`, a missing rating is
/// read as positive feedback with value 1. Attribute lines are `entity
/// attribute` and relation lines are `user user`.
pub struct FileController {
    files: DataFiles,
    delimiter: u8,
}

impl FileController {
    pub fn new(files: DataFiles, delimiter: u8) -> Self {
        Self { files, delimiter }
    }

    fn for_each_record<F>(&self, path: &Path, min_fields: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&StringRecord, u64) -> Result<()>,
    {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .from_path(path)?;

        log::debug!("Collecting records from {}", path.display());
        let records: Vec<_> = reader.records().collect();

        for record in records.into_iter().progress() {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);

            if record.len() < min_fields {
                return Err(
                    ErrorKind::MissingFields(path.display().to_string(), line, min_fields).into(),
                );
            }

            f(&record, line)?;
        }

        Ok(())
    }

    pub fn read_ratings(
        &self,
        path: &Path,
        users: &mut EntityIndex,
        items: &mut EntityIndex,
    ) -> Result<Ratings> {
        let mut ratings = Ratings::new();

        self.for_each_record(path, 2, |record, line| {
            let user_id = users.to_internal_id(&record[0]);
            let item_id = items.to_internal_id(&record[1]);

            let rating = match record.get(2) {
                Some(field) if !field.is_empty() => parse_field(path, line, "rating", field)?,
                _ => 1.0,
            };

            let timestamp = match record.get(3) {
                Some(field) if !field.is_empty() => {
                    Some(parse_field(path, line, "timestamp", field)?)
                }
                _ => None,
            };

            ratings.add(RatingEvent {
                user_id,
                item_id,
                rating,
                timestamp,
            });

            Ok(())
        })?;

        log::info!("Read {} ratings from {}", ratings.len(), path.display());
        Ok(ratings)
    }

    pub fn read_attributes(
        &self,
        path: &Path,
        entities: &mut EntityIndex,
    ) -> Result<SparseBooleanMatrix> {
        let mut attribute_index = EntityIndex::new();
        let mut attributes = SparseBooleanMatrix::new();

        self.for_each_record(path, 2, |record, _| {
            let entity_id = entities.to_internal_id(&record[0]);
            let attribute_id = attribute_index.to_internal_id(&record[1]);
            attributes.set(entity_id, attribute_id, true);
            Ok(())
        })?;

        log::info!(
            "{} attributes for {} entities in {}",
            attribute_index.len(),
            attributes.non_empty_row_ids().len(),
            path.display()
        );
        Ok(attributes)
    }

    pub fn read_relation(&self, path: &Path, users: &mut EntityIndex) -> Result<SparseBooleanMatrix> {
        let mut relation = SparseBooleanMatrix::new();

        self.for_each_record(path, 2, |record, _| {
            let user_a = users.to_internal_id(&record[0]);
            let user_b = users.to_internal_id(&record[1]);
            relation.set(user_a, user_b, true);
            Ok(())
        })?;

        log::info!(
            "Read {} trust relations from {}",
            relation.number_of_entries(),
            path.display()
        );
        Ok(relation)
    }

    pub fn read_relevant_items(&self, path: &Path, items: &mut EntityIndex) -> Result<BTreeSet<usize>> {
        let mut relevant = BTreeSet::new();

        self.for_each_record(path, 1, |record, _| {
            relevant.insert(items.to_internal_id(&record[0]));
            Ok(())
        })?;

        Ok(relevant)
    }
}

fn parse_field<T: std::str::FromStr>(
    path: &Path,
    line: u64,
    what: &'static str,
    field: &str,
) -> Result<T> {
    field.parse().map_err(|_| {
        ErrorKind::InvalidField(path.display().to_string(), line, what, field.to_owned()).into()
    })
}

impl Controller for FileController {
    fn load(&self) -> Result<Dataset> {
        let mut users = EntityIndex::new();
        let mut items = EntityIndex::new();

        let training = self.read_ratings(&self.files.training, &mut users, &mut items)?;
        let test = self.read_ratings(&self.files.test, &mut users, &mut items)?;

        let user_attributes = match &self.files.user_attributes {
            Some(path) => Some(self.read_attributes(path, &mut users)?),
            None => None,
        };

        let item_attributes = match &self.files.item_attributes {
            Some(path) => Some(self.read_attributes(path, &mut items)?),
            None => None,
        };

        let user_relation = match &self.files.user_relation {
            Some(path) => Some(self.read_relation(path, &mut users)?),
            None => None,
        };

        let relevant_items = match &self.files.relevant_items {
            Some(path) => Some(self.read_relevant_items(path, &mut items)?),
            None => None,
        };

        Ok(Dataset {
            users,
            items,
            training,
            test,
            user_attributes,
            item_attributes,
            user_relation,
            relevant_items,
        })
    }
}
