//! Generators for synthetic SNODAS daily containers.
//!
//! A container is a plain tar archive whose data members are gzip-compressed
//! big-endian `i16` rasters, named the way the NSIDC distribution names them.

use std::io::Write;

use bytes::Bytes;
use chrono::{Datelike, NaiveDate};
use flate2::write::GzEncoder;
use flate2::Compression;
use snow_common::{date_key, GridGeometry};

/// Member name used by the distribution for a product code and date.
///
/// The code sits inside a 5-digit run (`11036`), so it is found by the
/// substring fallback rather than the 4-digit group lookup.
pub fn member_name(code: &str, date: NaiveDate) -> String {
    format!(
        "us_ssmv1{}tS__T0001TTNATS{}05HP001.dat.gz",
        code,
        date_key(date)
    )
}

/// Big-endian encoding of a raw raster.
pub fn encode_be_i16(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Gzip-compress a buffer.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).expect("in-memory gzip write");
    encoder.finish().expect("in-memory gzip finish")
}

/// Deterministic raw raster for a geometry.
///
/// Values stay within 10..3010 so every decoded cell is at least 0.01 m and
/// escapes the zero snap.
pub fn raw_test_grid(geometry: &GridGeometry, seed: u32) -> Vec<i16> {
    let mut data = Vec::with_capacity(geometry.cell_count());
    for row in 0..geometry.row_count {
        for col in 0..geometry.column_count {
            let v = (seed as usize * 101 + row * 37 + col * 11) % 3000 + 10;
            data.push(v as i16);
        }
    }
    data
}

/// Physical values the decoder should produce for a raw raster with no
/// sentinel and no sub-threshold cells.
pub fn expected_values(raw: &[i16]) -> Vec<f32> {
    raw.iter().map(|&v| v as f32 / 1000.0).collect()
}

/// Seed used by [`synthetic_container`] for a code on a date.
pub fn seed_for(code: &str, date: NaiveDate) -> u32 {
    let code: u32 = code.parse().unwrap_or(0);
    date.ordinal() + (date.year() as u32 % 100) * 400 + code
}

/// Builder for a daily tarball.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    date: NaiveDate,
    members: Vec<(String, Vec<u8>)>,
}

impl ContainerBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            members: Vec::new(),
        }
    }

    /// Add a data member for a product code with the given raw values.
    pub fn variable(mut self, code: &str, raw: &[i16]) -> Self {
        let name = member_name(code, self.date);
        self.members.push((name, gzip(&encode_be_i16(raw))));
        self
    }

    /// Add the `.txt.gz` header companion the distribution ships with each raster.
    pub fn header_file(mut self, code: &str) -> Self {
        let name = member_name(code, self.date).replace(".dat.gz", ".txt.gz");
        self.members
            .push((name, gzip(b"Description: SNODAS synthetic header\n")));
        self
    }

    /// Add a member with arbitrary name and stored bytes.
    pub fn member(mut self, name: impl Into<String>, stored: Vec<u8>) -> Self {
        self.members.push((name.into(), stored));
        self
    }

    /// Serialize the tar archive.
    pub fn build(self) -> Bytes {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, stored) in &self.members {
            let mut header = tar::Header::new_gnu();
            header.set_size(stored.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, name, stored.as_slice())
                .expect("in-memory tar append");
        }
        Bytes::from(builder.into_inner().expect("in-memory tar finish"))
    }
}

/// A container holding every listed code with [`raw_test_grid`] values.
pub fn synthetic_container(date: NaiveDate, geometry: &GridGeometry, codes: &[&str]) -> Bytes {
    codes
        .iter()
        .fold(ContainerBuilder::new(date), |builder, code| {
            let raw = raw_test_grid(geometry, seed_for(code, date));
            builder.variable(code, &raw).header_file(code)
        })
        .build()
}
