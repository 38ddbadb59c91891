//! [`FsTicketArchive`]: rendered tickets on the local filesystem.

use std::{
  io::{ErrorKind, Write as _},
  path::{Path, PathBuf},
};

use async_trait::async_trait;
use boxoffice_core::{Error, Result, fulfilment::TicketArchive};
use uuid::Uuid;

/// Stores `ticket-<booking_id>.pdf` files under one directory.
#[derive(Debug, Clone)]
pub struct FsTicketArchive {
  dir: PathBuf,
}

impl FsTicketArchive {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  pub fn path_for(&self, booking_id: Uuid) -> PathBuf {
    self.dir.join(format!("ticket-{booking_id}.pdf"))
  }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
  Error::Collaborator(format!("{action} {}: {e}", path.display()))
}

#[async_trait]
impl TicketArchive for FsTicketArchive {
  async fn save(&self, booking_id: Uuid, document: Vec<u8>) -> Result<()> {
    tokio::fs::create_dir_all(&self.dir)
      .await
      .map_err(|e| io_error("creating", &self.dir, e))?;

    // Stage in a uniquely named file, then rename, so readers never see a
    // partial document and concurrent writers never share a staging file.
    let dir = self.dir.clone();
    let path = self.path_for(booking_id);
    let target = path.clone();
    let bytes = document.len();
    tokio::task::spawn_blocking(move || -> Result<()> {
      let mut staged = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| io_error("staging in", &dir, e))?;
      staged
        .write_all(&document)
        .map_err(|e| io_error("writing", &target, e))?;
      staged
        .persist(&target)
        .map_err(|e| io_error("renaming", &target, e.error))?;
      Ok(())
    })
    .await
    .map_err(|e| Error::Collaborator(format!("archive task failed: {e}")))??;

    tracing::debug!(booking_id = %booking_id, path = %path.display(), bytes, "tickets archived");
    Ok(())
  }

  async fn load(&self, booking_id: Uuid) -> Result<Vec<u8>> {
    let path = self.path_for(booking_id);
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(bytes),
      Err(e) if e.kind() == ErrorKind::NotFound => {
        Err(Error::TicketFileNotFound(booking_id))
      }
      Err(e) => Err(io_error("reading", &path, e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let archive = FsTicketArchive::new(dir.path().join("nested/tickets"));
    let id = Uuid::new_v4();

    archive.save(id, b"%PDF-1.4 one".to_vec()).await.unwrap();
    assert_eq!(archive.load(id).await.unwrap(), b"%PDF-1.4 one");
    assert!(archive.path_for(id).ends_with(format!("ticket-{id}.pdf")));

    // Overwrite keeps the latest document.
    archive.save(id, b"%PDF-1.4 two".to_vec()).await.unwrap();
    assert_eq!(archive.load(id).await.unwrap(), b"%PDF-1.4 two");
  }

  #[tokio::test]
  async fn concurrent_saves_leave_one_whole_document() {
    let dir = tempfile::tempdir().unwrap();
    let archive = FsTicketArchive::new(dir.path());
    let id = Uuid::new_v4();
    let first = vec![b'a'; 64 * 1024];
    let second = vec![b'b'; 64 * 1024];

    let (a, b) = tokio::join!(
      archive.save(id, first.clone()),
      archive.save(id, second.clone()),
    );
    a.unwrap();
    b.unwrap();

    let stored = archive.load(id).await.unwrap();
    assert!(stored == first || stored == second);

    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1, "no staging files left behind");
  }

  #[tokio::test]
  async fn missing_file_is_ticket_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let archive = FsTicketArchive::new(dir.path());
    let id = Uuid::new_v4();
    assert!(matches!(
      archive.load(id).await,
      Err(Error::TicketFileNotFound(x)) if x == id
    ));
  }
}
