//! Basic open/read/write/seek operations through the cache.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;

use oxicache::size::MIB;
use oxicache::{ContentAwareCache, Status};
use tempfile::TempDir;

// ============ Helper Functions ============

fn create_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path
}

// ============ Open / Read ============

#[test]
fn test_hit_path() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "a.txt", b"hello");

    let cache = ContentAwareCache::with_max_size(MIB);

    let mut file = cache.open(&path, "r").unwrap();
    let mut buf = [0u8; 16];
    let items = file.read(&mut buf, 1, 5);
    assert_eq!(items, 5);
    assert_eq!(&buf[..5], b"hello");
    cache.close(file);

    // Second open is served from memory.
    let file = cache.open(&path, "r").unwrap();
    cache.close(file);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.disk_reads, 1);
    assert_eq!(stats.disk_writes, 0);
}

#[test]
fn test_open_missing_file_for_read() {
    let dir = TempDir::new().unwrap();
    let cache = ContentAwareCache::new();

    let err = cache.open(dir.path().join("missing.txt"), "r").unwrap_err();
    assert_eq!(err, Status::NotFound);
}

#[test]
fn test_read_past_end_returns_zero() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "short.txt", b"abc");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "r").unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(file.read(&mut buf, 1, 8), 3);
    assert_eq!(file.read(&mut buf, 1, 8), 0);
}

#[test]
fn test_read_truncates_partial_final_item() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "five.dat", b"hello");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "r").unwrap();

    // Five bytes hold two whole 2-byte items; the short final item is
    // copied but not counted.
    let mut buf = [0u8; 8];
    let items = file.read(&mut buf, 2, 3);
    assert_eq!(items, 2);
    assert_eq!(&buf[..5], b"hello");
    assert_eq!(file.tell(), 5);
}

#[test]
fn test_read_requires_read_mode() {
    let dir = TempDir::new().unwrap();
    let cache = ContentAwareCache::new();

    let mut file = cache.open(dir.path().join("w.txt"), "w").unwrap();
    file.write(b"data", 1, 4);

    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf, 1, 4), 0);
}

// ============ Write ============

#[test]
fn test_write_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("b.cfg");

    let cache = ContentAwareCache::with_max_size(MIB);

    let mut file = cache.open(&path, "w").unwrap();
    assert_eq!(file.write(b"x=1", 1, 3), 3);
    cache.close(file);

    assert_eq!(fs::read(&path).unwrap(), b"x=1");
    assert_eq!(cache.stats().disk_writes, 1);
}

#[test]
fn test_write_requires_write_mode() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "ro.txt", b"before");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "r").unwrap();
    assert_eq!(file.write(b"after!", 1, 6), 0);
    drop(file);

    assert_eq!(fs::read(&path).unwrap(), b"before");
}

#[test]
fn test_append_advances_cursor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c.log");

    let cache = ContentAwareCache::with_max_size(MIB);

    let mut file = cache.open(&path, "w").unwrap();
    file.write(b"A", 1, 1);
    cache.close(file);

    let mut file = cache.open(&path, "a+").unwrap();
    file.write(b"B", 1, 1);
    cache.close(file);

    assert_eq!(fs::read(&path).unwrap(), b"AB");
}

#[test]
fn test_append_snaps_after_seek() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "d.log", b"base");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "a+").unwrap();

    file.seek(std::io::SeekFrom::Start(0)).unwrap();
    file.write(b"!", 1, 1);
    drop(file);

    // The cursor snapped back to the end before the write.
    assert_eq!(fs::read(&path).unwrap(), b"base!");
}

#[test]
fn test_plus_extends_permissions() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "e.txt", b"12345");

    let cache = ContentAwareCache::new();

    let mut file = cache.open(&path, "r+").unwrap();
    assert_eq!(file.write(b"xx", 1, 2), 2);
    drop(file);
    assert_eq!(fs::read(&path).unwrap(), b"xx345");

    let mut file = cache.open(dir.path().join("f.txt"), "w+").unwrap();
    file.write(b"ok", 1, 2);
    file.seek(std::io::SeekFrom::Start(0)).unwrap();
    let mut buf = [0u8; 2];
    assert_eq!(file.read(&mut buf, 1, 2), 2);
    assert_eq!(&buf, b"ok");
}

#[test]
fn test_write_mode_truncates_on_miss() {
    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "g.txt", b"old contents");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "w").unwrap();
    file.write(b"new", 1, 3);
    drop(file);

    assert_eq!(fs::read(&path).unwrap(), b"new");
}

// ============ Seek / Tell ============

#[test]
fn test_seek_and_tell() {
    use std::io::SeekFrom;

    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "h.txt", b"abcdef");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "r").unwrap();

    assert_eq!(file.seek(SeekFrom::Start(2)).unwrap(), 2);
    let mut buf = [0u8; 2];
    file.read(&mut buf, 1, 2);
    assert_eq!(&buf, b"cd");
    assert_eq!(file.tell(), 4);

    assert_eq!(file.seek(SeekFrom::Current(-1)).unwrap(), 3);
    assert_eq!(file.seek(SeekFrom::End(-2)).unwrap(), 4);
    assert_eq!(file.seek(SeekFrom::End(0)).unwrap(), 6);
}

#[test]
fn test_seek_past_end_fails() {
    use std::io::SeekFrom;

    let dir = TempDir::new().unwrap();
    let path = create_file(&dir, "i.txt", b"abcdef");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "r").unwrap();

    assert_eq!(file.seek(SeekFrom::Start(7)).unwrap_err(), Status::InvalidArgument);
    assert_eq!(file.seek(SeekFrom::End(1)).unwrap_err(), Status::InvalidArgument);
    assert_eq!(
        file.seek(SeekFrom::Current(-10)).unwrap_err(),
        Status::InvalidArgument
    );

    // A failed seek leaves the cursor unchanged.
    assert_eq!(file.tell(), 0);
}

// ============ Round Trip ============

#[test]
fn test_round_trip_through_fresh_cache() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blob.dat");
    let contents: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();

    {
        let cache = ContentAwareCache::with_max_size(MIB);
        let mut file = cache.open(&path, "w").unwrap();
        assert_eq!(file.write(&contents, 1, contents.len()), contents.len());
        drop(file);
    }

    let cache = ContentAwareCache::with_max_size(MIB);
    let mut file = cache.open(&path, "r").unwrap();
    let mut out = vec![0u8; contents.len() + 16];
    let out_len = out.len();
    let items = file.read(&mut out, 1, out_len);
    assert_eq!(items, contents.len());
    assert_eq!(&out[..items], &contents[..]);
}

// ============ std::io traits ============

#[test]
fn test_io_trait_round_trip() {
    use std::io::{Read, Seek, Write};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("io.txt");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "w+").unwrap();

    file.write_all(b"rust").unwrap();
    file.rewind().unwrap();

    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    assert_eq!(out, "rust");
}

// ============ Handle lifetime ============

#[test]
fn test_handle_outlives_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("late.txt");

    let cache = ContentAwareCache::new();
    let mut file = cache.open(&path, "w").unwrap();
    file.write(b"first", 1, 5);

    drop(cache);

    // The engine is gone; the handle still writes and flushes.
    file.write(b" second", 1, 7);
    drop(file);

    assert_eq!(fs::read(&path).unwrap(), b"first second");
}
