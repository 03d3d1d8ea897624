//! Shared fixture builders for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use forkfilter::ReadSeek;

/// Seconds between 1904-01-01 and 1970-01-01.
pub const MAC_EPOCH_OFFSET: u32 = 2_082_844_800;

/// Deterministic, mildly compressible payload.
pub fn sample_data(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(2_654_435_761).rotate_left(7) as u8 % 17 + b'a')
        .collect()
}

/// Reads a fork stream to the end.
pub fn read_all(stream: Option<Box<dyn ReadSeek>>) -> Vec<u8> {
    let mut out = Vec::new();
    stream
        .expect("fork stream should exist")
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Writes `contents` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

#[cfg(feature = "gzip")]
pub fn gzip(data: &[u8], mtime: u32) -> Vec<u8> {
    let mut encoder = flate2::GzBuilder::new()
        .mtime(mtime)
        .write(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[cfg(feature = "bzip2")]
pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(9));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builds a single-stream xz file with CRC32 checks, one LZMA2 block per
/// chunk of `data`.
#[cfg(feature = "lzma")]
pub fn xz(data: &[u8], block_size: usize) -> Vec<u8> {
    let flags = [0x00u8, 0x01];
    let mut out = vec![0xFD, b'7', b'z', b'X', b'Z', 0x00];
    out.extend_from_slice(&flags);
    out.extend_from_slice(&crc32fast::hash(&flags).to_le_bytes());

    let mut records = Vec::new();
    let chunks: Vec<&[u8]> = if data.is_empty() {
        Vec::new()
    } else {
        data.chunks(block_size.max(1)).collect()
    };
    for chunk in chunks {
        let mut header = vec![0x02, 0x00, 0x21, 0x01, 16, 0x00, 0x00, 0x00];
        let crc = crc32fast::hash(&header);
        header.extend_from_slice(&crc.to_le_bytes());

        let mut compressed = Vec::new();
        let mut options = lzma_rust2::Lzma2Options::with_preset(6);
        options.lzma_options.dict_size = 1 << 20;
        let mut writer = lzma_rust2::Lzma2Writer::new(&mut compressed, options);
        writer.write_all(chunk).unwrap();
        writer.finish().unwrap();

        let unpadded = header.len() + compressed.len() + 4;
        out.extend_from_slice(&header);
        out.extend_from_slice(&compressed);
        while (out.len() - 12) % 4 != 0 {
            out.push(0);
        }
        out.extend_from_slice(&crc32fast::hash(chunk).to_le_bytes());
        records.push((unpadded as u64, chunk.len() as u64));
    }

    let mut index = vec![0x00];
    push_varint(&mut index, records.len() as u64);
    for (unpadded, uncompressed) in &records {
        push_varint(&mut index, *unpadded);
        push_varint(&mut index, *uncompressed);
    }
    while index.len() % 4 != 0 {
        index.push(0);
    }
    let crc = crc32fast::hash(&index);
    index.extend_from_slice(&crc.to_le_bytes());
    let backward = (index.len() / 4 - 1) as u32;
    out.extend_from_slice(&index);

    let mut footer_fields = Vec::new();
    footer_fields.extend_from_slice(&backward.to_le_bytes());
    footer_fields.extend_from_slice(&flags);
    out.extend_from_slice(&crc32fast::hash(&footer_fields).to_le_bytes());
    out.extend_from_slice(&footer_fields);
    out.extend_from_slice(b"YZ");
    out
}

/// Builds an xz file with the stock encoder: CRC64 checks, one block, and
/// an optional pre-filter such as BCJ ahead of LZMA2.
#[cfg(feature = "lzma")]
pub fn xz_encoded(data: &[u8], pre_filter: Option<lzma_rust2::FilterType>) -> Vec<u8> {
    let mut options = lzma_rust2::XzOptions::with_preset(6);
    if let Some(filter) = pre_filter {
        options.prepend_pre_filter(filter, 0);
    }
    let mut writer = lzma_rust2::XzWriter::new(Vec::new(), options).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap()
}

#[cfg(feature = "lzma")]
fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Builds a one-member lzip file with a 1 MiB dictionary.
#[cfg(feature = "lzma")]
pub fn lzip(data: &[u8]) -> Vec<u8> {
    let mut out = b"LZIP\x01\x14".to_vec();
    let mut options = lzma_rust2::LzmaOptions::with_preset(6);
    options.dict_size = 1 << 20;
    let mut writer = lzma_rust2::LzmaWriter::new_no_header(&mut out, &options, true).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap();

    out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    let member_size = out.len() as u64 + 8;
    out.extend_from_slice(&member_size.to_le_bytes());
    out
}

/// Builds an AppleSingle (or AppleDouble) container from `(id, payload)`
/// entries, laid out in order after the entry table.
pub fn apple_container(magic: u32, home: &str, entries: &[(u32, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&magic.to_be_bytes());
    out.extend_from_slice(&0x0002_0000u32.to_be_bytes());
    let mut field = [b' '; 16];
    field[..home.len()].copy_from_slice(home.as_bytes());
    out.extend_from_slice(&field);
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    let mut offset = 26 + entries.len() * 12;
    for (id, payload) in entries {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        offset += payload.len();
    }
    for (_, payload) in entries {
        out.extend_from_slice(payload);
    }
    out
}

pub fn apple_single(entries: &[(u32, &[u8])]) -> Vec<u8> {
    apple_container(0x0005_1600, "Macintosh", entries)
}

pub fn apple_double(entries: &[(u32, &[u8])]) -> Vec<u8> {
    apple_container(0x0005_1607, "Macintosh", entries)
}

/// FileDates payload: creation, modification, backup and access times as
/// unsigned Unix seconds.
pub fn file_dates(created: u32, modified: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&created.to_be_bytes());
    out.extend_from_slice(&modified.to_be_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out
}

fn pad_block(out: &mut Vec<u8>) {
    while out.len() % 128 != 0 {
        out.push(0);
    }
}

/// Builds a MacBinary II file with an optional secondary header.
pub fn macbinary(name: &str, data: &[u8], rsrc: &[u8], secondary_len: u16) -> Vec<u8> {
    let mut header = [0u8; 128];
    header[1] = name.len() as u8;
    header[2..2 + name.len()].copy_from_slice(name.as_bytes());
    header[65..69].copy_from_slice(b"TEXT");
    header[69..73].copy_from_slice(b"ttxt");
    header[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
    header[87..91].copy_from_slice(&(rsrc.len() as u32).to_be_bytes());
    header[91..95].copy_from_slice(&(MAC_EPOCH_OFFSET + 1_000).to_be_bytes());
    header[95..99].copy_from_slice(&(MAC_EPOCH_OFFSET + 2_000).to_be_bytes());
    header[120..122].copy_from_slice(&secondary_len.to_be_bytes());
    header[122] = 129;
    header[123] = 129;

    let mut out = header.to_vec();
    out.extend(std::iter::repeat_n(0xEEu8, usize::from(secondary_len)));
    pad_block(&mut out);
    out.extend_from_slice(data);
    pad_block(&mut out);
    out.extend_from_slice(rsrc);
    pad_block(&mut out);
    out
}

/// Builds one `FINDER.DAT` record.
pub fn finder_record(mac_name: &str, dos_name: &[u8; 11], created: u32, modified: u32) -> Vec<u8> {
    let mut record = vec![0u8; 0x5C];
    record[0] = mac_name.len() as u8;
    record[1..1 + mac_name.len()].copy_from_slice(mac_name.as_bytes());
    record[32..36].copy_from_slice(b"APPL");
    record[36..40].copy_from_slice(b"MACS");
    record[40..42].copy_from_slice(&0x2100u16.to_be_bytes());
    record[60..64].copy_from_slice(&created.to_be_bytes());
    record[64..68].copy_from_slice(&modified.to_be_bytes());
    record[72..76].copy_from_slice(&0xFFFF_FFFEu32.to_be_bytes());
    record[76..87].copy_from_slice(dos_name);
    record
}
