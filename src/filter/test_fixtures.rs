//! Gzipped feed fixtures for filter tests.

#![allow(clippy::unwrap_used)]

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Writes `header` and `rows` (newline separated) as a gzipped daily feed under `dir`.
pub fn write_feed(dir: &Path, header: &str, rows: &[String]) -> PathBuf {
    let path = dir.join("item_daily_1_20190127_EBAY_US.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::fast());
    writeln!(encoder, "{header}").unwrap();
    for row in rows {
        writeln!(encoder, "{row}").unwrap();
    }
    encoder.finish().unwrap();
    path
}

pub fn read_gz(path: &Path) -> String {
    let mut text = String::new();
    GzDecoder::new(std::fs::File::open(path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    text
}
