//! Table file header
//!
//! Both table files start with the same header, told apart by their magic.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

use super::{TableLayout, FORMAT_VERSION, HEADER_SIZE};

/// Header shared by the directory and page files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub key_size: u32,
    pub value_size: u32,
    pub bucket_count: u32,
}

impl TableHeader {
    pub fn new(magic: &[u8; 4], layout: TableLayout, bucket_count: u32) -> Self {
        Self {
            magic: *magic,
            version: FORMAT_VERSION,
            key_size: layout.key_size as u32,
            value_size: layout.value_size as u32,
            bucket_count,
        }
    }

    pub fn layout(&self) -> TableLayout {
        TableLayout::new(self.key_size as usize, self.value_size as usize)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        debug_assert_eq!(bytes.len() as u64, HEADER_SIZE);
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read a header and check its magic and version
    pub fn read_from<R: Read>(reader: &mut R, expected_magic: &[u8; 4]) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut bytes)?;

        let header: TableHeader = bincode::deserialize(&bytes)?;

        if &header.magic != expected_magic {
            return Err(VaultError::Corruption(format!(
                "Invalid table magic: expected {:?}, got {:?}",
                expected_magic, header.magic
            )));
        }
        if header.version != FORMAT_VERSION {
            return Err(VaultError::Corruption(format!(
                "Unsupported table version: {}",
                header.version
            )));
        }
        if header.bucket_count == 0 {
            return Err(VaultError::Corruption("Table has zero buckets".to_string()));
        }

        Ok(header)
    }

    /// True when both headers describe the same table
    pub fn matches(&self, other: &TableHeader) -> bool {
        self.version == other.version
            && self.key_size == other.key_size
            && self.value_size == other.value_size
            && self.bucket_count == other.bucket_count
    }
}
