//! Medication plan persistence with file locking.
//!
//! All plans live in a single JSON document. Saves go through a temp file
//! in the same directory and an atomic rename, so a crash mid-write never
//! leaves a half-written store behind.

use crate::{Error, MedicationPlan, MedicationStatus, Result};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Every known medication plan, keyed by id
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlanStore {
    #[serde(default)]
    pub plans: BTreeMap<Uuid, MedicationPlan>,
}

/// What was found at the store path
enum StoreFile {
    Missing,
    Parsed(PlanStore),
    Corrupt(serde_json::Error),
}

impl PlanStore {
    /// Load the store from a file with shared locking
    ///
    /// Returns an empty store if the file doesn't exist.
    /// If the file is unreadable or corrupted, logs a warning and returns an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match Self::read_file(path) {
            Ok(StoreFile::Parsed(store)) => Ok(store),
            Ok(StoreFile::Missing) => {
                tracing::info!("No plan store at {:?}, starting empty", path);
                Ok(Self::default())
            }
            Ok(StoreFile::Corrupt(e)) => {
                tracing::warn!("Failed to parse plan store {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("Unable to read plan store {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Read and parse the store under a shared lock. IO failures are errors.
    fn read_file(path: &Path) -> Result<StoreFile> {
        if !path.exists() {
            return Ok(StoreFile::Missing);
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<PlanStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded {} plans from {:?}", store.plans.len(), path);
                Ok(StoreFile::Parsed(store))
            }
            Err(e) => Ok(StoreFile::Corrupt(e)),
        }
    }

    /// Move an unparseable store aside as `<name>.<timestamp>.corrupt`
    fn quarantine(path: &Path) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}.corrupt", stamp));
        let backup = PathBuf::from(name);

        std::fs::rename(path, &backup)?;
        Ok(backup)
    }

    /// Save the store atomically: temp file, fsync, rename over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;

        // Exclusive lock on the temp file serializes concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} plans to {:?}", self.plans.len(), path);
        Ok(())
    }

    /// Load the store, modify it, and save it back.
    ///
    /// Holds an exclusive lock on `<path>.lock` for the whole cycle so
    /// concurrent updaters apply one after another. A store that exists
    /// but can't be read is an error. One that can't be parsed is moved
    /// aside as `<name>.<timestamp>.corrupt` before the new store is saved,
    /// so its plans stay recoverable by hand.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut PlanStore) -> Result<T>,
    {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.lock_exclusive()?;

        let result = Self::read_file(path).and_then(|found| {
            let (mut store, corrupt) = match found {
                StoreFile::Parsed(store) => (store, false),
                StoreFile::Missing => (Self::default(), false),
                StoreFile::Corrupt(e) => {
                    tracing::warn!("Plan store {:?} is corrupt: {}", path, e);
                    (Self::default(), true)
                }
            };

            let out = f(&mut store)?;

            if corrupt {
                let backup = Self::quarantine(path)?;
                tracing::warn!("Moved corrupt plan store to {:?}", backup);
            }
            store.save(path)?;
            Ok(out)
        });

        lock.unlock()?;
        result
    }

    /// Insert a plan, replacing any plan with the same id
    pub fn add(&mut self, plan: MedicationPlan) -> Uuid {
        let id = plan.id;
        tracing::info!("Adding plan {} ({})", id, plan.medication);
        self.plans.insert(id, plan);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&MedicationPlan> {
        self.plans.get(id)
    }

    /// All plans, ordered by start date then medication name
    pub fn list(&self) -> Vec<&MedicationPlan> {
        let mut plans: Vec<_> = self.plans.values().collect();
        plans.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.medication.cmp(&b.medication))
        });
        plans
    }

    /// Active plans only, in [`PlanStore::list`] order
    pub fn active(&self) -> Vec<&MedicationPlan> {
        self.list()
            .into_iter()
            .filter(|p| p.status == MedicationStatus::Active)
            .collect()
    }

    /// Find a plan id from its full form or a unique prefix
    pub fn resolve(&self, id_or_prefix: &str) -> Result<Uuid> {
        let needle = id_or_prefix.trim().to_lowercase();
        if let Ok(id) = Uuid::parse_str(&needle) {
            return if self.plans.contains_key(&id) {
                Ok(id)
            } else {
                Err(Error::plan_not_found(&id))
            };
        }

        if needle.is_empty() {
            return Err(Error::PlanNotFound(id_or_prefix.to_string()));
        }

        let matches: Vec<_> = self
            .plans
            .keys()
            .filter(|id| id.to_string().starts_with(&needle))
            .copied()
            .collect();

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(Error::PlanNotFound(id_or_prefix.to_string())),
            _ => Err(Error::Other(format!(
                "Plan id prefix '{}' is ambiguous ({} matches)",
                id_or_prefix,
                matches.len()
            ))),
        }
    }

    pub fn set_status(&mut self, id: &Uuid, status: MedicationStatus) -> Result<()> {
        let plan = self.plans.get_mut(id).ok_or_else(|| Error::plan_not_found(id))?;
        tracing::info!("Plan {} status {} -> {}", id, plan.status, status);
        plan.status = status;
        Ok(())
    }

    /// Set or clear the plan's end date
    pub fn set_end_date(&mut self, id: &Uuid, end_date: Option<NaiveDate>) -> Result<()> {
        let plan = self.plans.get_mut(id).ok_or_else(|| Error::plan_not_found(id))?;
        if let Some(end) = end_date {
            if end < plan.start_date {
                return Err(Error::InvalidPlan(format!(
                    "end date {} is before start date {}",
                    end, plan.start_date
                )));
            }
        }
        tracing::info!("Plan {} end date {:?} -> {:?}", id, plan.end_date, end_date);
        plan.end_date = end_date;
        Ok(())
    }
}
