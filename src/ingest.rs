//! Bulk loading from a delimited text source.
//!
//! The source is a tabular text file: the first line is a header and is
//! skipped; every following line holds one record (identifier, name, then
//! one coordinate per dimension) separated by a configurable delimiter.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::TreeConfig;
use crate::errors::IndexResult;
use crate::record::Record;
use crate::storage::DataFile;

/// Parses every record row of a delimited source file, skipping the
/// header line.
pub fn load_records(
    path: impl AsRef<Path>,
    delimiter: char,
    dimensions: usize,
) -> IndexResult<Vec<Record>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();
    for line in reader.lines().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(Record::from_line(&line, delimiter, dimensions)?);
    }
    Ok(records)
}

/// Builds the data file from a delimited source, grouping records into
/// blocks of the computed per-block capacity. Reopens the existing data
/// file instead when the config does not ask for a rebuild.
pub fn bulk_load(source: impl AsRef<Path>, config: &TreeConfig) -> IndexResult<DataFile> {
    if !config.rebuild && config.data_path().exists() {
        return DataFile::open(config.data_path());
    }

    let mut data = DataFile::create(config.data_path(), config.dimensions)?;
    let capacity = data.max_records_per_block();

    let reader = BufReader::new(File::open(source.as_ref())?);
    let mut group: Vec<Record> = Vec::with_capacity(capacity);
    let mut total = 0usize;
    for line in reader.lines().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if group.len() == capacity {
            data.append_block(&group)?;
            group.clear();
        }
        group.push(Record::from_line(&line, config.delimiter, config.dimensions)?);
        total += 1;
    }
    if !group.is_empty() {
        data.append_block(&group)?;
    }

    log::debug!(
        "bulk loaded {} records into {} data blocks",
        total,
        data.block_count() - 1
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexError;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_source(path: &Path, lines: &[&str]) {
        let mut file = File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    #[test]
    fn test_load_records_skips_header() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("points.csv");
        write_source(&source, &["id,name,x,y", "1,a,0.5,1.5", "2,b,2.0,3.0"]);

        let records = load_records(&source, ',', 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].coordinates, vec![2.0, 3.0]);
    }

    #[test]
    fn test_load_records_custom_delimiter() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("points.txt");
        write_source(&source, &["id;name;x;y", "5;e;7.0;8.0"]);

        let records = load_records(&source, ';', 2).unwrap();
        assert_eq!(records[0].id, 5);
    }

    #[test]
    fn test_load_records_reports_malformed_row() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("points.csv");
        write_source(&source, &["id,name,x,y", "1,a,0.5"]);

        let err = load_records(&source, ',', 2).unwrap_err();
        assert!(matches!(err, IndexError::InvalidRecord(_)));
    }

    #[test]
    fn test_bulk_load_groups_records_into_blocks() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("points.csv");
        let mut lines = vec!["id,name,x,y".to_string()];
        for i in 0..10 {
            lines.push(format!("{},p{},{}.0,{}.0", i, i, i, i));
        }
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        write_source(&source, &line_refs);

        let config = TreeConfig::new(2, dir.path().join("data.dat"), dir.path().join("index.dat"))
            .with_rebuild(true);
        let data = bulk_load(&source, &config).unwrap();

        assert_eq!(data.block_count(), 2);
        let records = data.read_block(1).unwrap().unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[9].name, "p9");
    }

    #[test]
    fn test_bulk_load_reopens_without_rebuild() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("points.csv");
        write_source(&source, &["id,name,x,y", "1,a,0.0,0.0"]);

        let config = TreeConfig::new(2, dir.path().join("data.dat"), dir.path().join("index.dat"))
            .with_rebuild(true);
        let data = bulk_load(&source, &config).unwrap();
        assert_eq!(data.block_count(), 2);
        drop(data);

        // Second call without rebuild must reopen, not truncate.
        let config = config.with_rebuild(false);
        let reopened = bulk_load(&source, &config).unwrap();
        assert_eq!(reopened.block_count(), 2);
        assert_eq!(reopened.read_block(1).unwrap().unwrap().len(), 1);
    }
}
