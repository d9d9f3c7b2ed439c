use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::warn;
use parking_lot::Mutex;

use crate::storage::block::BlockId;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::Page;

/// Files whose name starts with this prefix are transient artifacts of a
/// higher layer and are removed when a manager is constructed over the
/// directory.
pub const TEMP_FILE_PREFIX: &str = "temp";

/// Gateway between block addresses, pages, and the filesystem.
///
/// One manager owns a storage directory and a fixed block size that applies
/// to every file in it. File handles are opened lazily in read-write mode
/// (creating the file if absent), cached by logical name, and kept open for
/// the manager's lifetime; they are released when the manager drops.
///
/// All operations serialize through one instance-wide mutex. At most one
/// read/write/append/length call runs at a time regardless of which block or
/// file it targets, so operations observe a total order and never see a
/// partial effect of another. Callers needing parallel throughput shard by
/// file or block above this layer.
pub struct FileManager {
    db_directory: PathBuf,
    block_size: usize,
    is_new: bool,
    open_files: Mutex<HashMap<String, File>>,
}

impl FileManager {
    /// Open the storage directory, creating it if absent.
    ///
    /// Reports whether the directory had to be created via
    /// [`is_new`](Self::is_new), which signals a brand-new database to
    /// higher layers. Stale temporary files (name starting with
    /// [`TEMP_FILE_PREFIX`]) are removed best-effort; individual deletion
    /// failures are logged and never abort construction.
    pub fn new(db_directory: impl AsRef<Path>, block_size: usize) -> StorageResult<Self> {
        let db_directory = db_directory.as_ref().to_path_buf();

        let is_new = match fs::metadata(&db_directory) {
            Ok(meta) => {
                if !meta.is_dir() {
                    return Err(StorageError::NotADirectory(db_directory));
                }
                false
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&db_directory)?;
                true
            }
            Err(e) => return Err(e.into()),
        };

        for entry in fs::read_dir(&db_directory)? {
            let entry = entry?;
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with(TEMP_FILE_PREFIX)
            {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(
                        "failed to remove stale temp file {}: {}",
                        entry.path().display(),
                        e
                    );
                }
            }
        }

        Ok(Self {
            db_directory,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// Read the contents of `block` into `page`.
    ///
    /// The block must have been appended before; reading past the current
    /// extent of the file is a caller error and fails with
    /// [`StorageError::BlockOutOfRange`].
    pub fn read(&self, block: &BlockId, page: &mut Page) -> StorageResult<()> {
        self.check_page_size(page.contents().len())?;

        let mut open_files = self.open_files.lock();
        let file = self.get_file(&mut open_files, block.file_name())?;

        let offset = block.number() * self.block_size as u64;
        if offset + self.block_size as u64 > file.metadata()?.len() {
            return Err(StorageError::BlockOutOfRange(block.clone()));
        }

        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(page.contents_mut())?;

        Ok(())
    }

    /// Write the contents of `page` to `block`, extending the file if the
    /// block lies past its current end.
    pub fn write(&self, block: &BlockId, page: &Page) -> StorageResult<()> {
        self.check_page_size(page.contents().len())?;

        let mut open_files = self.open_files.lock();
        let file = self.get_file(&mut open_files, block.file_name())?;

        let offset = block.number() * self.block_size as u64;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.contents())?;

        Ok(())
    }

    /// Extend `file_name` by one zero-filled block and return its id.
    ///
    /// This is the sole growth mechanism; block numbers are contiguous
    /// starting at 0.
    pub fn append(&self, file_name: &str) -> StorageResult<BlockId> {
        let mut open_files = self.open_files.lock();
        let file = self.get_file(&mut open_files, file_name)?;

        let new_block_num = file.metadata()?.len() / self.block_size as u64;
        let block = BlockId::new(file_name, new_block_num);

        let zeroes = vec![0u8; self.block_size];
        file.seek(SeekFrom::Start(new_block_num * self.block_size as u64))?;
        file.write_all(&zeroes)?;

        Ok(block)
    }

    /// Number of blocks in `file_name`, opening (and thereby creating) the
    /// file if it is not open yet. A file never written to has 0 blocks.
    pub fn length(&self, file_name: &str) -> StorageResult<u64> {
        let mut open_files = self.open_files.lock();
        let file = self.get_file(&mut open_files, file_name)?;
        Ok(file.metadata()?.len() / self.block_size as u64)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether the storage directory was created by this manager,
    /// signalling a brand-new database.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    fn check_page_size(&self, actual: usize) -> StorageResult<()> {
        if actual != self.block_size {
            return Err(StorageError::InvalidPageSize {
                expected: self.block_size,
                actual,
            });
        }
        Ok(())
    }

    // Caller must hold the open_files lock; the returned handle borrows
    // from the guarded map.
    fn get_file<'a>(
        &self,
        open_files: &'a mut HashMap<String, File>,
        file_name: &str,
    ) -> StorageResult<&'a mut File> {
        match open_files.entry(file_name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.db_directory.join(file_name);
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(path)?;
                Ok(entry.insert(file))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_new_directory_detection() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("db");

        let fm = FileManager::new(&db_path, 400)?;
        assert!(fm.is_new());
        assert_eq!(fm.block_size(), 400);
        drop(fm);

        let fm = FileManager::new(&db_path, 400)?;
        assert!(!fm.is_new());

        Ok(())
    }

    #[test]
    fn test_path_is_not_a_directory() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("occupied");
        fs::write(&file_path, b"not a directory")?;

        let result = FileManager::new(&file_path, 400);
        assert!(matches!(result, Err(StorageError::NotADirectory(_))));

        Ok(())
    }

    #[test]
    fn test_temp_file_cleanup() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("tempFoo"), b"stale")?;
        fs::write(dir.path().join("temp_scratch"), b"stale")?;
        fs::write(dir.path().join("other"), b"keep")?;

        let _fm = FileManager::new(dir.path(), 400)?;

        assert!(!dir.path().join("tempFoo").exists());
        assert!(!dir.path().join("temp_scratch").exists());
        assert!(dir.path().join("other").exists());

        Ok(())
    }

    #[test]
    fn test_append_monotonicity() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 128)?;

        for expected in 0..5u64 {
            let blk = fm.append("datafile")?;
            assert_eq!(blk.number(), expected);
            assert_eq!(fm.length("datafile")?, expected + 1);
        }

        Ok(())
    }

    #[test]
    fn test_length_creates_empty_file() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 128)?;

        assert_eq!(fm.length("fresh")?, 0);
        assert!(dir.path().join("fresh").exists());

        Ok(())
    }

    #[test]
    fn test_write_then_read_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 128)?;
        let blk = BlockId::new("datafile", 2);

        let mut p1 = Page::new(fm.block_size());
        p1.set_int(0, -42);
        p1.set_string(20, "round trip");
        fm.write(&blk, &p1)?;

        // Writing block 2 of an empty file extends it to three blocks.
        assert_eq!(fm.length("datafile")?, 3);

        let mut p2 = Page::new(fm.block_size());
        fm.read(&blk, &mut p2)?;
        assert_eq!(p2.get_int(0), -42);
        assert_eq!(p2.get_string(20), "round trip");

        Ok(())
    }

    #[test]
    fn test_blocks_do_not_overlap() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 64)?;

        fm.append("datafile")?;
        fm.append("datafile")?;
        fm.append("datafile")?;

        for n in 0..3u64 {
            let mut page = Page::new(64);
            page.contents_mut().fill(n as u8 + 1);
            fm.write(&BlockId::new("datafile", n), &page)?;
        }

        for n in 0..3u64 {
            let mut page = Page::new(64);
            fm.read(&BlockId::new("datafile", n), &mut page)?;
            assert!(page.contents().iter().all(|&b| b == n as u8 + 1));
        }

        Ok(())
    }

    #[test]
    fn test_append_zero_fills() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 64)?;

        let blk = fm.append("datafile")?;
        let mut page = Page::new(64);
        page.contents_mut().fill(0xAB);
        fm.read(&blk, &mut page)?;
        assert!(page.contents().iter().all(|&b| b == 0));

        Ok(())
    }

    #[test]
    fn test_read_out_of_range() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 64)?;

        let mut page = Page::new(64);
        let result = fm.read(&BlockId::new("datafile", 10), &mut page);
        assert!(matches!(result, Err(StorageError::BlockOutOfRange(_))));

        Ok(())
    }

    #[test]
    fn test_invalid_page_size() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 64)?;
        fm.append("datafile")?;

        let mut small = Page::new(32);
        let result = fm.read(&BlockId::new("datafile", 0), &mut small);
        assert!(matches!(
            result,
            Err(StorageError::InvalidPageSize {
                expected: 64,
                actual: 32
            })
        ));

        let result = fm.write(&BlockId::new("datafile", 0), &small);
        assert!(matches!(result, Err(StorageError::InvalidPageSize { .. })));

        Ok(())
    }

    #[test]
    fn test_separate_files_are_independent() -> Result<()> {
        let dir = tempdir()?;
        let fm = FileManager::new(dir.path(), 64)?;

        let blk_a = fm.append("alpha")?;
        fm.append("beta")?;

        let mut page = Page::new(64);
        page.set_int(0, 7);
        fm.write(&blk_a, &page)?;

        let mut check = Page::new(64);
        fm.read(&BlockId::new("beta", 0), &mut check)?;
        assert_eq!(check.get_int(0), 0);
        assert_eq!(fm.length("alpha")?, 1);
        assert_eq!(fm.length("beta")?, 1);

        Ok(())
    }

    #[test]
    fn test_concurrent_appends() -> Result<()> {
        let dir = tempdir()?;
        let fm = Arc::new(FileManager::new(dir.path(), 32)?);

        let threads = 4;
        let appends_per_thread = 25;
        let mut handles = Vec::new();

        for _ in 0..threads {
            let fm = Arc::clone(&fm);
            handles.push(thread::spawn(move || {
                let mut numbers = Vec::new();
                for _ in 0..appends_per_thread {
                    numbers.push(fm.append("shared").unwrap().number());
                }
                numbers
            }));
        }

        let mut all: Vec<u64> = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        all.sort_unstable();

        let total = (threads * appends_per_thread) as u64;
        assert_eq!(all, (0..total).collect::<Vec<_>>());
        assert_eq!(fm.length("shared")?, total);

        Ok(())
    }
}
