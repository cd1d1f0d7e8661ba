//! In-memory repository over `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::repo::{Record, Repository};

pub struct MemoryRepository<T: Record> {
    rows: DashMap<Uuid, T>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<T>> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    async fn list(&self, filter: &T::Filter) -> anyhow::Result<Vec<T>> {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|r| r.value().matches(filter))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.created_at(), r.id()));
        Ok(rows)
    }

    async fn insert(&self, record: T) -> anyhow::Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.rows.entry(record.id()) {
            Entry::Occupied(_) => anyhow::bail!("{} {} already exists", T::ENTITY, record.id()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn update(&self, record: T) -> anyhow::Result<bool> {
        match self.rows.get_mut(&record.id()) {
            Some(mut row) => {
                *row = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::Branch;
    use crate::domain::repo::BranchFilter;
    use chrono::{Duration, Utc};

    fn branch(code: &str, offset_secs: i64) -> Branch {
        let at = Utc::now() + Duration::seconds(offset_secs);
        Branch {
            id: Uuid::new_v4(),
            name: format!("Branch {code}"),
            code: code.to_string(),
            address: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn list_is_ordered_and_filtered() {
        let repo = MemoryRepository::<Branch>::new();
        let late = branch("KR", 10);
        let early = branch("BL", 0);
        repo.insert(late.clone()).await.unwrap();
        repo.insert(early.clone()).await.unwrap();

        let all = repo.list(&BranchFilter::default()).await.unwrap();
        assert_eq!(all, vec![early, late.clone()]);

        let kr = repo
            .list(&BranchFilter {
                code: Some("KR".into()),
            })
            .await
            .unwrap();
        assert_eq!(kr, vec![late]);
    }

    #[tokio::test]
    async fn duplicate_insert_fails_and_missing_update_reports_false() {
        let repo = MemoryRepository::<Branch>::new();
        let b = branch("KR", 0);
        repo.insert(b.clone()).await.unwrap();
        assert!(repo.insert(b.clone()).await.is_err());

        assert!(!repo.update(branch("XX", 0)).await.unwrap());
        assert!(repo.delete(b.id).await.unwrap());
        assert!(!repo.delete(b.id).await.unwrap());
        assert!(repo.find_by_id(b.id).await.unwrap().is_none());
    }
}
