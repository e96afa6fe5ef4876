//! # Slot File Record Store
//!
//! Fixed-size slots in two files per store:
//!
//! ```text
//! <name>.store   [64-byte header][slot 0][slot 1]...
//!                slot = [state: u8][generation: u64][crc32: u32][routing_key][header][payload]
//! <name>.keys    [64-byte header][key slot 0]...        (kinds that keep full keys)
//!                key slot = [state: u8][crc32: u32][full_key]
//! ```
//!
//! Every slot of a store has the same length, so slot `i` lives at a fixed
//! offset and a freed slot is reused in place. The record CRC covers the
//! generation and everything after the CRC field. The index of live slots is
//! rebuilt by scanning the store file on open.
//!
//! Reads and writes use positional I/O, so operations on different keys
//! (including `sync_data` with `sync_writes`) do not wait on each other.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::adapters::lock::DatabaseLock;
use crate::domain::entities::{RecordSummary, StoredRecord};
use crate::domain::errors::StoreIoError;
use crate::domain::formats::FormatSpec;
use crate::domain::keys::RoutingKey;
use crate::ports::outbound::RecordStore;

const STORE_MAGIC: &[u8; 8] = b"DSBLOCK1";
const KEYS_MAGIC: &[u8; 8] = b"DSKEYS01";
const FORMAT_VERSION: u32 = 1;
const FILE_HEADER_LEN: usize = 64;

const SLOT_FREE: u8 = 0;
const SLOT_USED: u8 = 1;
/// state + generation + crc32
const RECORD_META_LEN: usize = 1 + 8 + 4;
/// state + crc32
const KEY_META_LEN: usize = 1 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotLayout {
    routing_key_len: usize,
    header_len: usize,
    payload_len: usize,
    /// Zero when full keys are not kept
    full_key_len: usize,
}

impl SlotLayout {
    fn from_spec(spec: &FormatSpec) -> Self {
        Self {
            routing_key_len: spec.routing_key_len,
            header_len: spec.header_len,
            payload_len: spec.payload_len,
            full_key_len: if spec.store_full_keys {
                spec.full_key_len
            } else {
                0
            },
        }
    }

    fn record_len(&self) -> usize {
        RECORD_META_LEN + self.routing_key_len + self.header_len + self.payload_len
    }

    fn key_slot_len(&self) -> usize {
        KEY_META_LEN + self.full_key_len
    }

    fn record_offset(&self, slot: u64) -> u64 {
        FILE_HEADER_LEN as u64 + slot * self.record_len() as u64
    }

    fn key_offset(&self, slot: u64) -> u64 {
        FILE_HEADER_LEN as u64 + slot * self.key_slot_len() as u64
    }

    fn store_header(&self) -> [u8; FILE_HEADER_LEN] {
        let mut out = [0u8; FILE_HEADER_LEN];
        out[..8].copy_from_slice(STORE_MAGIC);
        let fields = [
            FORMAT_VERSION,
            self.routing_key_len as u32,
            self.header_len as u32,
            self.payload_len as u32,
            self.full_key_len as u32,
        ];
        for (i, field) in fields.iter().enumerate() {
            let at = 8 + i * 4;
            out[at..at + 4].copy_from_slice(&field.to_be_bytes());
        }
        out
    }

    fn keys_header(&self) -> [u8; FILE_HEADER_LEN] {
        let mut out = [0u8; FILE_HEADER_LEN];
        out[..8].copy_from_slice(KEYS_MAGIC);
        out[8..12].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
        out[12..16].copy_from_slice(&(self.full_key_len as u32).to_be_bytes());
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotInfo {
    slot: u64,
    generation: u64,
}

/// In-memory view of slot occupancy. Holds no file handles, so disk I/O never
/// runs under its lock.
#[derive(Default)]
struct SlotTable {
    index: HashMap<RoutingKey, SlotInfo>,
    free: Vec<u64>,
    slot_count: u64,
}

impl SlotTable {
    fn allocate(&mut self) -> u64 {
        match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slot_count += 1;
                self.slot_count - 1
            }
        }
    }
}

/// Durable record store over fixed-size slot files.
///
/// Slots are accessed with positional I/O on shared handles; only the slot
/// table is locked. Callers must serialize operations on any one routing key
/// (the block store's key stripes do), otherwise a read can race the removal
/// and reuse of its slot and report the record as corrupt.
pub struct FileRecordStore {
    store: File,
    keys: Option<File>,
    table: RwLock<SlotTable>,
    layout: SlotLayout,
    sync_writes: bool,
    store_path: PathBuf,
    _lock: DatabaseLock,
}

impl FileRecordStore {
    /// Open or create the files for store `name` under `dir`.
    ///
    /// # Errors
    ///
    /// - `StoreIoError::Lock` if another handle has the store open
    /// - `StoreIoError::LayoutMismatch` if the files were created for a
    ///   different block geometry
    pub fn open(
        dir: &Path,
        name: &str,
        spec: &FormatSpec,
        sync_writes: bool,
    ) -> Result<Self, StoreIoError> {
        fs::create_dir_all(dir)?;
        let lock = DatabaseLock::acquire(dir, name)?;
        let layout = SlotLayout::from_spec(spec);

        let store_path = dir.join(format!("{name}.store"));
        let store = open_rw(&store_path)?;
        let slot_count = prepare_file(
            &store,
            &store_path,
            &layout.store_header(),
            layout.record_len(),
        )?;

        let keys = if layout.full_key_len > 0 {
            let keys_path = dir.join(format!("{name}.keys"));
            let keys = open_rw(&keys_path)?;
            prepare_file(
                &keys,
                &keys_path,
                &layout.keys_header(),
                layout.key_slot_len(),
            )?;
            Some(keys)
        } else {
            None
        };

        let mut table = SlotTable {
            slot_count,
            ..SlotTable::default()
        };
        scan_slots(&store, &mut table, &layout, &store_path)?;

        tracing::info!(
            "[ds-02] Opened {} ({} live records, {} free slots)",
            store_path.display(),
            table.index.len(),
            table.free.len()
        );

        Ok(Self {
            store,
            keys,
            table: RwLock::new(table),
            layout,
            sync_writes,
            store_path,
            _lock: lock,
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn encode_record(&self, record: &StoredRecord) -> Result<Vec<u8>, StoreIoError> {
        let layout = &self.layout;
        if record.header.len() != layout.header_len || record.payload.len() != layout.payload_len
        {
            return Err(StoreIoError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "record geometry {}+{} does not fit slot {}+{}",
                    record.header.len(),
                    record.payload.len(),
                    layout.header_len,
                    layout.payload_len
                ),
            )));
        }

        let mut buf = Vec::with_capacity(layout.record_len());
        buf.push(SLOT_USED);
        buf.extend_from_slice(&record.generation.to_be_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(record.routing_key.as_bytes());
        buf.extend_from_slice(&record.header);
        buf.extend_from_slice(&record.payload);
        let crc = record_crc(&buf);
        buf[9..13].copy_from_slice(&crc.to_be_bytes());
        Ok(buf)
    }

    fn encode_full_key(&self, full_key: Option<&[u8]>) -> Vec<u8> {
        let mut buf = vec![0u8; self.layout.key_slot_len()];
        if let Some(full_key) = full_key.filter(|k| k.len() == self.layout.full_key_len) {
            buf[0] = SLOT_USED;
            buf[1..5].copy_from_slice(&crc32fast::hash(full_key).to_be_bytes());
            buf[KEY_META_LEN..].copy_from_slice(full_key);
        }
        buf
    }

    fn decode_record(
        &self,
        key: &RoutingKey,
        buf: &[u8],
        generation: u64,
    ) -> Result<(Vec<u8>, Vec<u8>), StoreIoError> {
        let corrupt = |reason: &str| StoreIoError::CorruptRecord {
            key: *key,
            reason: reason.to_string(),
        };
        if buf[0] != SLOT_USED {
            return Err(corrupt("slot is not in use"));
        }
        if u32::from_be_bytes(read_array(&buf[9..13])) != record_crc(buf) {
            return Err(corrupt("checksum mismatch"));
        }
        if u64::from_be_bytes(read_array(&buf[1..9])) != generation {
            return Err(corrupt("generation changed under the index"));
        }
        let key_end = RECORD_META_LEN + self.layout.routing_key_len;
        if &buf[RECORD_META_LEN..key_end] != key.as_bytes() {
            return Err(corrupt("slot holds a different routing key"));
        }
        let header_end = key_end + self.layout.header_len;
        Ok((
            buf[key_end..header_end].to_vec(),
            buf[header_end..].to_vec(),
        ))
    }

    fn write_slot(&self, slot: u64, record: &[u8], full_key: &[u8]) -> io::Result<()> {
        write_at(&self.store, self.layout.record_offset(slot), record)?;
        if let Some(keys) = &self.keys {
            write_at(keys, self.layout.key_offset(slot), full_key)?;
        }
        if self.sync_writes {
            self.store.sync_data()?;
            if let Some(keys) = &self.keys {
                keys.sync_data()?;
            }
        }
        Ok(())
    }

    fn clear_slot(&self, slot: u64) -> io::Result<()> {
        write_at(&self.store, self.layout.record_offset(slot), &[SLOT_FREE])?;
        if let Some(keys) = &self.keys {
            write_at(keys, self.layout.key_offset(slot), &[SLOT_FREE])?;
        }
        Ok(())
    }

    fn read_full_key(&self, keys: &File, slot: u64) -> Result<Option<Vec<u8>>, StoreIoError> {
        let mut buf = vec![0u8; self.layout.key_slot_len()];
        match read_at(keys, self.layout.key_offset(slot), &mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let full_key = &buf[KEY_META_LEN..];
        if buf[0] != SLOT_USED || u32::from_be_bytes(read_array(&buf[1..5])) != crc32fast::hash(full_key)
        {
            tracing::debug!("[ds-02] No valid full key in slot {}", slot);
            return Ok(None);
        }
        Ok(Some(full_key.to_vec()))
    }
}

impl RecordStore for FileRecordStore {
    fn read(&self, key: &RoutingKey) -> Result<Option<StoredRecord>, StoreIoError> {
        let Some(info) = self.table.read().index.get(key).copied() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.layout.record_len()];
        read_at(&self.store, self.layout.record_offset(info.slot), &mut buf)?;
        let (header, payload) = self.decode_record(key, &buf, info.generation)?;

        let full_key = match &self.keys {
            Some(keys) => self.read_full_key(keys, info.slot)?,
            None => None,
        };

        Ok(Some(StoredRecord {
            routing_key: *key,
            header,
            payload,
            full_key,
            generation: info.generation,
        }))
    }

    fn write(&self, record: &StoredRecord) -> Result<(), StoreIoError> {
        let buf = self.encode_record(record)?;
        let key_buf = self.encode_full_key(record.full_key.as_deref());

        let (slot, existing) = {
            let mut table = self.table.write();
            match table.index.get(&record.routing_key) {
                Some(info) => (info.slot, true),
                None => (table.allocate(), false),
            }
        };

        if let Err(e) = self.write_slot(slot, &buf, &key_buf) {
            if !existing {
                self.table.write().free.push(slot);
            }
            return Err(e.into());
        }

        self.table.write().index.insert(
            record.routing_key,
            SlotInfo {
                slot,
                generation: record.generation,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        let Some(info) = self.table.write().index.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.clear_slot(info.slot) {
            self.table.write().index.insert(*key, info);
            return Err(e.into());
        }
        self.table.write().free.push(info.slot);
        Ok(true)
    }

    fn contains(&self, key: &RoutingKey) -> Result<bool, StoreIoError> {
        Ok(self.table.read().index.contains_key(key))
    }

    fn scan(&self) -> Result<Vec<RecordSummary>, StoreIoError> {
        Ok(self
            .table
            .read()
            .index
            .iter()
            .map(|(key, info)| RecordSummary {
                routing_key: *key,
                generation: info.generation,
            })
            .collect())
    }

    fn len(&self) -> u64 {
        self.table.read().index.len() as u64
    }

    fn flush(&self) -> Result<(), StoreIoError> {
        self.store.sync_all()?;
        if let Some(keys) = &self.keys {
            keys.sync_all()?;
        }
        Ok(())
    }
}

fn open_rw(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
}

/// Write the header to a new file or validate an existing one, dropping any
/// torn trailing slot. Returns the number of whole slots.
fn prepare_file(
    file: &File,
    path: &Path,
    header: &[u8; FILE_HEADER_LEN],
    slot_len: usize,
) -> Result<u64, StoreIoError> {
    let len = file.metadata()?.len();
    if len == 0 {
        write_at(file, 0, header)?;
        return Ok(0);
    }

    let mismatch = |reason: &str| StoreIoError::LayoutMismatch {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if len < FILE_HEADER_LEN as u64 {
        return Err(mismatch("file shorter than its header"));
    }
    let mut existing = [0u8; FILE_HEADER_LEN];
    read_at(file, 0, &mut existing)?;
    if existing[..8] != header[..8] {
        return Err(mismatch("bad magic"));
    }
    if existing != *header {
        return Err(mismatch("slot geometry differs"));
    }

    let body = len - FILE_HEADER_LEN as u64;
    let slots = body / slot_len as u64;
    if body % slot_len as u64 != 0 {
        tracing::warn!(
            "[ds-02] Dropping torn trailing slot in {} ({} bytes)",
            path.display(),
            body % slot_len as u64
        );
        file.set_len(FILE_HEADER_LEN as u64 + slots * slot_len as u64)?;
    }
    Ok(slots)
}

/// Rebuild the live index and free list from slot headers.
fn scan_slots(
    store: &File,
    table: &mut SlotTable,
    layout: &SlotLayout,
    path: &Path,
) -> Result<(), StoreIoError> {
    let mut meta = vec![0u8; RECORD_META_LEN + layout.routing_key_len];
    for slot in 0..table.slot_count {
        read_at(store, layout.record_offset(slot), &mut meta)?;
        if meta[0] != SLOT_USED {
            table.free.push(slot);
            continue;
        }

        let generation = u64::from_be_bytes(read_array(&meta[1..9]));
        let key = RoutingKey::from_slice(&meta[RECORD_META_LEN..]).map_err(|e| {
            StoreIoError::LayoutMismatch {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        let info = SlotInfo { slot, generation };

        if let Some(previous) = table.index.insert(key, info) {
            let (keep, stale) = if previous.generation > generation {
                (previous, info)
            } else {
                (info, previous)
            };
            tracing::warn!(
                "[ds-02] Routing key {} found in slots {} and {}; keeping slot {}",
                key,
                keep.slot,
                stale.slot,
                keep.slot
            );
            table.index.insert(key, keep);
            write_at(store, layout.record_offset(stale.slot), &[SLOT_FREE])?;
            table.free.push(stale.slot);
        }
    }
    Ok(())
}

fn record_crc(buf: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&buf[1..9]);
    hasher.update(&buf[RECORD_META_LEN..]);
    hasher.finalize()
}

#[cfg(unix)]
fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_at(file: &File, offset: u64, buf: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_at(file: &File, mut offset: u64, mut buf: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
