//! Hashed Table
//!
//! Point lookups, upserts, deletes and chain-order scans over one
//! directory/page file pair.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Buf;

use crate::config::{Config, SyncStrategy};
use crate::error::{Result, VaultError};

use super::cursor::TableCursor;
use super::slot::Slot;
use super::{TableEntry, TableHeader, TableLayout, DIR_MAGIC, HEADER_SIZE, NO_SLOT, PAG_MAGIC};

/// One open hashed table
///
/// Bucket heads are mirrored in memory and written through to the
/// directory file on every change. Slots are always read from the page file.
pub struct HashTable {
    /// Base path, without the `.dir`/`.pag` extension
    base: PathBuf,
    layout: TableLayout,
    dir: File,
    pag: File,
    /// Head slot of each bucket chain
    buckets: Vec<u64>,
    /// Slots available for reuse
    free_slots: Vec<u64>,
    /// Total slots in the page file (live + free)
    slot_count: u64,
    /// Live records
    live_count: usize,
    sync_strategy: SyncStrategy,
}

impl HashTable {
    /// Open the table at `base`, creating both files if neither holds data
    ///
    /// Zero-length files, or a page file holding no more than its header
    /// next to an empty or absent directory file, are what an interrupted
    /// create leaves behind. They are created over.
    ///
    /// On open:
    /// 1. Validate both headers against each other and `layout`
    /// 2. Load bucket heads
    /// 3. Truncate a torn trailing slot
    /// 4. Walk every chain, rebuilding the free list
    pub fn open(base: &Path, layout: TableLayout, config: &Config) -> Result<Self> {
        let (dir_path, pag_path) = Self::file_paths(base);
        let dir_len = Self::file_len(&dir_path)?;
        let pag_len = Self::file_len(&pag_path)?;

        match (dir_len, pag_len) {
            (None | Some(0), None | Some(0..=HEADER_SIZE)) => Self::create(base, layout, config),
            (Some(_), Some(_)) => Self::load(base, layout, config),
            (dir_len, _) => Err(VaultError::Corruption(format!(
                "Table {} is missing its {} file",
                base.display(),
                if dir_len.is_some() { ".pag" } else { ".dir" }
            ))),
        }
    }

    /// Remove both table files; missing files are not an error
    pub fn remove_files(base: &Path) -> Result<()> {
        let (dir_path, pag_path) = Self::file_paths(base);
        let staged_dir = Self::staged_dir_path(&dir_path);
        for path in [dir_path, pag_path, staged_dir] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// `<base>.dir` and `<base>.pag`
    pub fn file_paths(base: &Path) -> (PathBuf, PathBuf) {
        (base.with_extension("dir"), base.with_extension("pag"))
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Look up `key`; `Ok(None)` when absent
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_key(key)?;

        let bucket = self.bucket_of(key);
        let found = self.find(bucket, key)?;
        Ok(found.map(|(_, _, slot)| slot.value))
    }

    /// Insert or replace the value stored under `key`
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_key(key)?;
        if value.len() != self.layout.value_size {
            return Err(VaultError::InvalidArgument(format!(
                "Value is {} bytes, table stores {}",
                value.len(),
                self.layout.value_size
            )));
        }

        let bucket = self.bucket_of(key);

        // Replace in place if the key is already chained
        if let Some((index, _, slot)) = self.find(bucket, key)? {
            self.write_slot(index, &Slot::live(slot.next, key, value))?;
            return self.maybe_sync();
        }

        // Otherwise link a new slot at the head of the chain. The free list
        // and slot count only change once both writes have landed.
        let reused = self.free_slots.last().copied();
        let index = reused.unwrap_or(self.slot_count);
        let head = self.buckets[bucket];
        self.write_slot(index, &Slot::live(head, key, value))?;
        self.write_bucket(bucket, index)?;

        match reused {
            Some(_) => {
                self.free_slots.pop();
            }
            None => self.slot_count += 1,
        }
        self.live_count += 1;

        self.maybe_sync()
    }

    /// Remove `key`; `KeyNotFound` when absent
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.check_key(key)?;

        let bucket = self.bucket_of(key);
        let (index, prev, slot) = self.find(bucket, key)?.ok_or(VaultError::KeyNotFound)?;

        // Unlink from the chain
        match prev {
            Some((prev_index, mut prev_slot)) => {
                prev_slot.next = slot.next;
                self.write_slot(prev_index, &prev_slot)?;
            }
            None => self.write_bucket(bucket, slot.next)?,
        }

        self.write_slot(index, &Slot::free(self.layout))?;
        self.free_slots.push(index);
        self.live_count -= 1;

        self.maybe_sync()
    }

    /// Return the entry at `cursor` and advance past it
    ///
    /// Order is bucket order, then chain order. It is not sorted and is only
    /// meaningful while the table stays open.
    pub fn advance(&mut self, cursor: &mut TableCursor) -> Result<Option<TableEntry>> {
        while !cursor.exhausted {
            if cursor.bucket as usize >= self.buckets.len() {
                cursor.exhausted = true;
                break;
            }

            if let Some(slot) = self.nth_in_chain(cursor.bucket as usize, cursor.position)? {
                cursor.position += 1;
                return Ok(Some(TableEntry {
                    key: slot.key,
                    value: slot.value,
                }));
            }

            cursor.bucket += 1;
            cursor.position = 0;
        }

        Ok(None)
    }

    /// Flush both files to disk
    pub fn sync(&mut self) -> Result<()> {
        self.dir.sync_all()?;
        self.pag.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of live records
    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn bucket_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Total slots in the page file, including free ones
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    // =========================================================================
    // Open Helpers
    // =========================================================================

    fn create(base: &Path, layout: TableLayout, config: &Config) -> Result<Self> {
        let (dir_path, pag_path) = Self::file_paths(base);
        let bucket_count = config.bucket_count.max(1);

        // Page file first: a header-only page file without a directory
        // file is recognised as an unfinished create on the next open
        let mut pag = Self::open_options(config.file_mode)
            .truncate(true)
            .open(&pag_path)?;
        TableHeader::new(PAG_MAGIC, layout, bucket_count).write_to(&mut pag)?;
        pag.sync_all()?;

        // The directory file appears under its real name only when complete
        let staged_path = Self::staged_dir_path(&dir_path);
        {
            let mut staged = Self::open_options(config.file_mode)
                .truncate(true)
                .open(&staged_path)?;
            TableHeader::new(DIR_MAGIC, layout, bucket_count).write_to(&mut staged)?;
            let heads: Vec<u8> = (0..bucket_count)
                .flat_map(|_| NO_SLOT.to_le_bytes())
                .collect();
            staged.write_all(&heads)?;
            staged.sync_all()?;
        }
        fs::rename(&staged_path, &dir_path)?;
        let dir = Self::open_options(config.file_mode).open(&dir_path)?;

        tracing::info!(
            "Created table {} ({} buckets, {} byte slots)",
            base.display(),
            bucket_count,
            layout.slot_size()
        );

        Ok(Self {
            base: base.to_path_buf(),
            layout,
            dir,
            pag,
            buckets: vec![NO_SLOT; bucket_count as usize],
            free_slots: Vec::new(),
            slot_count: 0,
            live_count: 0,
            sync_strategy: config.sync_strategy,
        })
    }

    fn load(base: &Path, layout: TableLayout, config: &Config) -> Result<Self> {
        let (dir_path, pag_path) = Self::file_paths(base);

        let mut dir = Self::open_options(config.file_mode).open(&dir_path)?;
        let mut pag = Self::open_options(config.file_mode).open(&pag_path)?;

        let dir_len = dir.metadata()?.len();
        let pag_len = pag.metadata()?.len();
        if dir_len < HEADER_SIZE || pag_len < HEADER_SIZE {
            return Err(VaultError::Corruption(format!(
                "Table {} has a file shorter than its header",
                base.display()
            )));
        }

        // Step 1: Headers must agree with each other and with the caller
        let dir_header = TableHeader::read_from(&mut dir, DIR_MAGIC)?;
        let pag_header = TableHeader::read_from(&mut pag, PAG_MAGIC)?;

        if !dir_header.matches(&pag_header) {
            return Err(VaultError::Corruption(format!(
                "Table {} has mismatched .dir and .pag headers",
                base.display()
            )));
        }
        if dir_header.layout() != layout {
            return Err(VaultError::Corruption(format!(
                "Table {} stores {}/{} byte keys/values, expected {}/{}",
                base.display(),
                dir_header.key_size,
                dir_header.value_size,
                layout.key_size,
                layout.value_size
            )));
        }

        // Step 2: Bucket heads, sized by the header only if the file agrees
        let bucket_count = dir_header.bucket_count;
        let expected_len = u64::from(bucket_count)
            .checked_mul(8)
            .and_then(|heads| heads.checked_add(HEADER_SIZE));
        if expected_len != Some(dir_len) {
            return Err(VaultError::Corruption(format!(
                "Table {} directory is {} bytes, header declares {} buckets",
                base.display(),
                dir_len,
                bucket_count
            )));
        }
        let mut head_bytes = vec![0u8; (dir_len - HEADER_SIZE) as usize];
        dir.read_exact(&mut head_bytes)?;
        let mut heads = head_bytes.as_slice();
        let buckets: Vec<u64> = (0..bucket_count).map(|_| heads.get_u64_le()).collect();

        // Step 3: A partial slot at the end is an interrupted append
        let slot_size = layout.slot_size() as u64;
        let data_len = pag_len - HEADER_SIZE;
        let slot_count = data_len / slot_size;
        if data_len % slot_size != 0 {
            tracing::warn!(
                "Table {}: truncating {} bytes of torn slot",
                base.display(),
                data_len % slot_size
            );
            pag.set_len(HEADER_SIZE + slot_count * slot_size)?;
        }

        // Step 4: Decode every slot, then walk the chains
        let mut slots = Vec::with_capacity(slot_count as usize);
        {
            pag.seek(SeekFrom::Start(HEADER_SIZE))?;
            let mut reader = BufReader::new(&pag);
            let mut buf = vec![0u8; slot_size as usize];
            for index in 0..slot_count {
                reader.read_exact(&mut buf)?;
                slots.push(Slot::decode(&buf, layout, index)?);
            }
        }

        let mut reached = vec![false; slot_count as usize];
        for (bucket, &head) in buckets.iter().enumerate() {
            let mut index = head;
            while index != NO_SLOT {
                let slot = slots.get(index as usize).ok_or_else(|| {
                    VaultError::Corruption(format!(
                        "Bucket {} links to slot {} past the end of the page file",
                        bucket, index
                    ))
                })?;
                if reached[index as usize] {
                    return Err(VaultError::Corruption(format!(
                        "Slot {} is linked more than once",
                        index
                    )));
                }
                if !slot.is_live() {
                    return Err(VaultError::Corruption(format!(
                        "Bucket {} links to free slot {}",
                        bucket, index
                    )));
                }
                reached[index as usize] = true;
                index = slot.next;
            }
        }

        let mut table = Self {
            base: base.to_path_buf(),
            layout,
            dir,
            pag,
            buckets,
            free_slots: Vec::new(),
            slot_count,
            live_count: 0,
            sync_strategy: config.sync_strategy,
        };

        // Live slots no chain reaches were written but never linked
        for (index, slot) in slots.iter().enumerate() {
            let index = index as u64;
            if reached[index as usize] {
                table.live_count += 1;
            } else {
                if slot.is_live() {
                    tracing::warn!(
                        "Table {}: reclaiming unlinked slot {}",
                        base.display(),
                        index
                    );
                    table.write_slot(index, &Slot::free(layout))?;
                }
                table.free_slots.push(index);
            }
        }
        // Reuse low slots first
        table.free_slots.reverse();

        tracing::debug!(
            "Opened table {}: {} live, {} free, {} buckets",
            base.display(),
            table.live_count,
            table.free_slots.len(),
            bucket_count
        );

        Ok(table)
    }

    fn file_len(path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Where a new directory file is written before it is renamed into place
    fn staged_dir_path(dir_path: &Path) -> PathBuf {
        dir_path.with_extension("dir.tmp")
    }

    fn open_options(mode: u32) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        options
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.layout.key_size {
            return Err(VaultError::InvalidArgument(format!(
                "Key is {} bytes, table uses {}",
                key.len(),
                self.layout.key_size
            )));
        }
        Ok(())
    }

    fn bucket_of(&self, key: &[u8]) -> usize {
        crc32fast::hash(key) as usize % self.buckets.len()
    }

    /// Find `key` in `bucket`: (slot index, previous slot, slot)
    #[allow(clippy::type_complexity)]
    fn find(&mut self, bucket: usize, key: &[u8]) -> Result<Option<(u64, Option<(u64, Slot)>, Slot)>> {
        let mut prev: Option<(u64, Slot)> = None;
        let mut index = self.buckets[bucket];
        let mut steps = 0u64;

        while index != NO_SLOT {
            steps += 1;
            if steps > self.slot_count {
                return Err(VaultError::Corruption(format!(
                    "Bucket {} chain does not terminate",
                    bucket
                )));
            }

            let slot = self.read_slot(index)?;
            if slot.key == key {
                return Ok(Some((index, prev, slot)));
            }
            let next = slot.next;
            prev = Some((index, slot));
            index = next;
        }

        Ok(None)
    }

    fn nth_in_chain(&mut self, bucket: usize, n: u32) -> Result<Option<Slot>> {
        let mut index = self.buckets[bucket];
        let mut seen = 0u32;

        while index != NO_SLOT {
            if u64::from(seen) >= self.slot_count {
                return Err(VaultError::Corruption(format!(
                    "Bucket {} chain does not terminate",
                    bucket
                )));
            }

            let slot = self.read_slot(index)?;
            if seen == n {
                return Ok(Some(slot));
            }
            seen += 1;
            index = slot.next;
        }

        Ok(None)
    }

    fn slot_offset(&self, index: u64) -> u64 {
        HEADER_SIZE + index * self.layout.slot_size() as u64
    }

    fn read_slot(&mut self, index: u64) -> Result<Slot> {
        if index >= self.slot_count {
            return Err(VaultError::Corruption(format!(
                "Slot {} is past the end of the page file ({} slots)",
                index, self.slot_count
            )));
        }

        self.pag.seek(SeekFrom::Start(self.slot_offset(index)))?;
        let mut buf = vec![0u8; self.layout.slot_size()];
        self.pag.read_exact(&mut buf)?;
        Slot::decode(&buf, self.layout, index)
    }

    fn write_slot(&mut self, index: u64, slot: &Slot) -> Result<()> {
        self.pag.seek(SeekFrom::Start(self.slot_offset(index)))?;
        self.pag.write_all(&slot.encode())?;
        Ok(())
    }

    fn write_bucket(&mut self, bucket: usize, head: u64) -> Result<()> {
        self.dir
            .seek(SeekFrom::Start(HEADER_SIZE + bucket as u64 * 8))?;
        self.dir.write_all(&head.to_le_bytes())?;
        self.buckets[bucket] = head;
        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.sync()?;
        }
        Ok(())
    }
}
