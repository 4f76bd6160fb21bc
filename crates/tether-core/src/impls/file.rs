//! JsonFilePersistence - ディレクトリ内の JSON ファイル二つに保存する
//!
//! - `queue.json` / `dead_letters.json`
//! - 書き込みは一時ファイル + rename（途中で落ちても前の snapshot が残る）
//! - ファイルが無ければ空のキューとして読む

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::domain::{Action, DeadLetterItem, PersistenceError};
use crate::ports::Persistence;

const QUEUE_FILE: &str = "queue.json";
const DEAD_LETTER_FILE: &str = "dead_letters.json";

pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    /// Use `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_json<T: Serialize>(&self, name: &str, items: &[T]) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, PersistenceError> {
        match fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Persistence for JsonFilePersistence {
    async fn save_queue(&self, items: Vec<Action>) -> Result<(), PersistenceError> {
        self.write_json(QUEUE_FILE, &items).await
    }

    async fn save_dead_letter_queue(
        &self,
        items: Vec<DeadLetterItem>,
    ) -> Result<(), PersistenceError> {
        self.write_json(DEAD_LETTER_FILE, &items).await
    }

    async fn read_queue(&self) -> Result<Vec<Action>, PersistenceError> {
        self.read_json(QUEUE_FILE).await
    }

    async fn read_dead_letter_queue(&self) -> Result<Vec<DeadLetterItem>, PersistenceError> {
        self.read_json(DEAD_LETTER_FILE).await
    }
}
