use crate::record::{EntityRecord, RecordPayload};
use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Backend collaborator supplying entity records. Calls may block; they are only made from
/// fetch workers (or inline fetch mode), never from inside a tick.
pub trait RecordSource: Send + Sync {
    /// Records for the initial population.
    fn fetch_batch(&self) -> Result<Vec<EntityRecord>>;
    /// One record to replace a popped entity.
    fn fetch_one(&self) -> Result<EntityRecord>;
}

/// Serves records from a fixed list: the batch is the whole list, single fetches cycle.
pub struct FixtureSource {
    records: Vec<EntityRecord>,
    cursor: AtomicUsize,
}

impl FixtureSource {
    pub fn new(records: Vec<EntityRecord>) -> Self {
        Self { records, cursor: AtomicUsize::new(0) }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read record fixture {}", path.display()))?;
        let payload: RecordPayload = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse record fixture {}", path.display()))?;
        let records = payload.into_records();
        if records.is_empty() {
            bail!("Record fixture {} contains no records", path.display());
        }
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for FixtureSource {
    fn fetch_batch(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.records.clone())
    }

    fn fetch_one(&self) -> Result<EntityRecord> {
        if self.records.is_empty() {
            bail!("Record fixture is empty");
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.records.len();
        Ok(self.records[index].clone())
    }
}

const FIRST_NAMES: &[&str] =
    &["Avery", "Jordan", "Riley", "Morgan", "Casey", "Quinn", "Harper", "Rowan", "Emerson", "Sage"];
const LAST_NAMES: &[&str] =
    &["Hughes", "Patel", "Nakamura", "Okafor", "Lindqvist", "Moreau", "Garcia", "Kowalski", "Reyes", "Byrne"];

/// Synthetic people for offline sessions.
pub struct RandomSource {
    rng: Mutex<StdRng>,
    batch_size: usize,
}

impl RandomSource {
    pub fn new(seed: u64, batch_size: usize) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)), batch_size: batch_size.max(1) }
    }

    fn generate(rng: &mut StdRng) -> EntityRecord {
        let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
        EntityRecord::new(format!("{first} {last}"), email, rng.gen_range(18..=90))
    }
}

impl RecordSource for RandomSource {
    fn fetch_batch(&self) -> Result<Vec<EntityRecord>> {
        let mut rng = self.rng.lock().map_err(|_| anyhow::anyhow!("random source lock poisoned"))?;
        Ok((0..self.batch_size).map(|_| Self::generate(&mut rng)).collect())
    }

    fn fetch_one(&self) -> Result<EntityRecord> {
        let mut rng = self.rng.lock().map_err(|_| anyhow::anyhow!("random source lock poisoned"))?;
        Ok(Self::generate(&mut rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fixture_cycles_single_records() {
        let source = FixtureSource::new(vec![
            EntityRecord::new("a", "a@example.com", 20),
            EntityRecord::new("b", "b@example.com", 30),
        ]);
        let names: Vec<_> = (0..3).map(|_| source.fetch_one().unwrap().name).collect();
        assert_eq!(names, ["a", "b", "a"]);
        assert_eq!(source.fetch_batch().unwrap().len(), 2);
    }

    #[test]
    fn fixture_loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name":"Ada","email":"ada@example.com","age":"36"}}]"#).unwrap();
        let source = FixtureSource::load(file.path()).expect("fixture loads");
        assert_eq!(source.len(), 1);
        assert_eq!(source.fetch_one().unwrap().age.as_number(), Some(36.0));
    }

    #[test]
    fn empty_fixture_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let err = FixtureSource::load(file.path()).err().expect("empty fixture errors");
        assert!(err.to_string().contains("no records"));
    }

    #[test]
    fn random_source_is_deterministic_per_seed() {
        let a = RandomSource::new(7, 5);
        let b = RandomSource::new(7, 5);
        assert_eq!(a.fetch_batch().unwrap(), b.fetch_batch().unwrap());
        assert_eq!(a.fetch_batch().unwrap().len(), 5);
    }
}
