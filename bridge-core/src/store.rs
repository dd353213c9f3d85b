use crossbeam_channel::Receiver;
use log::{debug, error, info};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Every stored image lives under `rom_<title>`. A future layout change must
/// pick a new prefix so old archives keep working.
pub const KEY_PREFIX: &str = "rom_";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No ROM stored under '{0}'")]
    NotFound(String),
    #[error("ROM store unavailable: {0}")]
    Unavailable(String),
    #[error("ROM store is still opening")]
    InitPending,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),
}

struct StoreInner {
    path: PathBuf,
    opened: OnceLock<Result<(), String>>,
}

/// A title -> ROM image library backed by a single zip archive.
///
/// Cloning is cheap and every clone shares the same open state, so `open` can
/// run on a background thread while the owner keeps its handle.
#[derive(Clone)]
pub struct RomStore {
    inner: Arc<StoreInner>,
}

pub fn key_for(title: &str) -> String {
    format!("{}{}", KEY_PREFIX, title)
}

impl RomStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RomStore {
            inner: Arc::new(StoreInner {
                path: path.into(),
                opened: OnceLock::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Opens the store, creating an empty archive on first use. Blocks until
    /// done. Concurrent callers wait for the one initialization in flight and
    /// all see its outcome; failures are remembered, not retried.
    pub fn open(&self) -> Result<(), StoreError> {
        self.inner
            .opened
            .get_or_init(|| {
                initialize(&self.inner.path).map_err(|err| {
                    error!("Failed to open ROM store {}: {}", self.inner.path.display(), err);
                    err.to_string()
                })
            })
            .clone()
            .map_err(StoreError::Unavailable)
    }

    /// Runs `open` on a helper thread. The receiver yields exactly one result.
    pub fn open_in_background(&self) -> Receiver<Result<(), StoreError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let store = self.clone();
        let spawned = thread::Builder::new().name("rom-store".to_string()).spawn({
            let tx = tx.clone();
            move || {
                let _ = tx.send(store.open());
            }
        });

        if let Err(err) = spawned {
            let _ = tx.send(Err(StoreError::Unavailable(err.to_string())));
        }
        rx
    }

    pub fn is_open(&self) -> bool {
        matches!(self.inner.opened.get(), Some(Ok(())))
    }

    fn ready(&self) -> Result<(), StoreError> {
        match self.inner.opened.get() {
            None => Err(StoreError::InitPending),
            Some(Err(reason)) => Err(StoreError::Unavailable(reason.clone())),
            Some(Ok(())) => Ok(()),
        }
    }

    fn archive(&self) -> Result<ZipArchive<File>, StoreError> {
        Ok(ZipArchive::new(File::open(&self.inner.path)?)?)
    }

    /// Stores `rom` under `title`, replacing any previous image. Returns
    /// `false` when the identical image was already stored.
    pub fn put(&self, title: &str, rom: &[u8]) -> Result<bool, StoreError> {
        self.ready()?;

        let key = key_for(title);
        let crc = crc32fast::hash(rom);
        let mut archive = self.archive()?;

        if let Ok(existing) = archive.by_name(&key) {
            if existing.crc32() == crc && existing.size() == rom.len() as u64 {
                debug!("'{}' already stored (crc32 {:08x})", title, crc);
                return Ok(false);
            }
        }

        // rewrite into a sibling file and swap it in, so a crash never leaves
        // a half-written archive behind
        let tmp_path = self.inner.path.with_extension("zip.tmp");
        let mut writer = ZipWriter::new(File::create(&tmp_path)?);
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.name() == key {
                continue;
            }
            writer.raw_copy_file(entry)?;
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file(key.as_str(), options)?;
        writer.write_all(rom)?;
        writer.finish()?;
        fs::rename(&tmp_path, &self.inner.path)?;

        info!("Stored '{}' ({} bytes, crc32 {:08x})", title, rom.len(), crc);
        Ok(true)
    }

    pub fn get(&self, title: &str) -> Result<Vec<u8>, StoreError> {
        self.ready()?;

        let mut archive = self.archive()?;
        let mut entry = match archive.by_name(&key_for(title)) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(StoreError::NotFound(title.to_string())),
            Err(err) => return Err(err.into()),
        };

        let mut rom = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut rom)?;
        Ok(rom)
    }

    /// Titles of all stored images, sorted. Entries outside the `rom_`
    /// namespace are skipped.
    pub fn list_titles(&self) -> Result<Vec<String>, StoreError> {
        self.ready()?;

        let archive = self.archive()?;
        let mut titles: Vec<String> = archive
            .file_names()
            .filter_map(|name| name.strip_prefix(KEY_PREFIX))
            .map(str::to_string)
            .collect();
        titles.sort();
        Ok(titles)
    }
}

fn initialize(path: &Path) -> Result<(), StoreError> {
    if path.exists() {
        // make sure it is an archive we can read
        let archive = ZipArchive::new(File::open(path)?)?;
        info!("Opened ROM store {} ({} entries)", path.display(), archive.len());
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    ZipWriter::new(File::create(path)?).finish()?;
    info!("Created ROM store {}", path.display());
    Ok(())
}
