//! Instrumentation-point CSV parser.
//!
//! The assembly preprocessing step writes one CSV row per discovered
//! runtime control file:
//!
//! ```text
//! filepath,filename,line_numbers
//! /work/out/,aie_runtime_control2.asm,"6,8,293"
//! ```
//!
//! The third field is a comma-joined list of source line numbers at which a
//! timestamp capture instruction occurs. Fields may be double-quoted to
//! carry embedded commas; quotes toggle per character and escaped quotes
//! are not supported.
//!
//! The numeric id trailing the filename determines which microcontroller
//! runs the file and which 4-column tile band it owns.

use crate::profile::counters::CtCounter;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

/// Name of the CSV the preprocessing tool writes to the invocation
/// directory.
pub const TIMESTAMP_CSV_FILENAME: &str = "aie_profile_timestamps.csv";

/// Matches the trailing file id: `<prefix><digits>.asm`
static ASM_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.asm$").unwrap());

/// One source line where a timestamp capture is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampPoint {
    pub line_number: u32,
}

/// One discovered runtime control file and its capture points.
///
/// The file id fixes the microcontroller number and the tile band:
/// `uc = 4 * id`, columns `[4 * id, 4 * id + 3]`.
#[derive(Debug, Clone, Default)]
pub struct AsmFileInfo {
    pub filename: String,
    pub asm_id: u32,
    pub uc_number: u32,
    pub col_start: u32,
    pub col_end: u32,
    /// Capture points in CSV order.
    pub timestamps: Vec<TimestampPoint>,
    /// Counters owned by this file's column band, attached by
    /// reconciliation after the catalog is built.
    pub counters: Vec<CtCounter>,
}

impl AsmFileInfo {
    /// Create an entry for a file id, deriving its column band.
    pub fn new(filename: &str, asm_id: u32) -> Self {
        let col_start = asm_id * 4;
        Self {
            filename: filename.to_string(),
            asm_id,
            uc_number: 4 * asm_id,
            col_start,
            col_end: col_start + 3,
            timestamps: Vec::new(),
            counters: Vec::new(),
        }
    }
}

/// Read instrumentation points from the preprocessing tool's CSV.
///
/// Malformed rows, filenames without a trailing id, and unparsable line
/// numbers are skipped with a warning. An unreadable file yields an empty
/// result. The result is sorted ascending by file id; duplicate ids stay
/// as independent entries in CSV order.
pub fn read_asm_info(csv_path: &Path) -> Vec<AsmFileInfo> {
    let mut asm_files: Vec<AsmFileInfo> = Vec::new();

    let file = match File::open(csv_path) {
        Ok(f) => f,
        Err(_) => {
            log::warn!(
                "Unable to open CSV file: {}. Run the assembly preprocessing step first.",
                csv_path.display()
            );
            return asm_files;
        }
    };

    let reader = BufReader::new(file);
    let mut line_num = 0;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("Error reading CSV at line {}: {}", line_num + 1, e);
                break;
            }
        };
        line_num += 1;

        // Header row
        if line_num == 1 {
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let fields = split_quoted(&line);
        if fields.len() != 3 {
            log::warn!(
                "Invalid CSV format at line {}: expected 3 fields, got {}",
                line_num,
                fields.len()
            );
            continue;
        }

        let filename = &fields[1];
        let asm_id = match parse_asm_id(filename) {
            Some(id) => id,
            None => {
                log::warn!("Unable to extract file id from filename: {}", filename);
                continue;
            }
        };

        let mut info = AsmFileInfo::new(filename, asm_id);

        for token in fields[2].split(',') {
            if token.is_empty() {
                continue;
            }
            match token.trim().parse::<u32>() {
                Ok(line_number) => info.timestamps.push(TimestampPoint { line_number }),
                Err(_) => {
                    log::warn!(
                        "Error parsing line number '{}' in {}",
                        token,
                        info.filename
                    );
                }
            }
        }

        log::debug!(
            "Loaded {} (id={}, uc={}, columns {}-{}, {} capture points)",
            info.filename,
            info.asm_id,
            info.uc_number,
            info.col_start,
            info.col_end,
            info.timestamps.len()
        );
        asm_files.push(info);
    }

    // Stable: duplicate ids keep their CSV order
    asm_files.sort_by_key(|info| info.asm_id);

    let total: usize = asm_files.iter().map(|info| info.timestamps.len()).sum();
    log::info!(
        "Loaded {} control files from CSV with {} total capture points",
        asm_files.len(),
        total
    );

    asm_files
}

/// Extract the trailing numeric file id from a control filename.
fn parse_asm_id(filename: &str) -> Option<u32> {
    let captures = ASM_ID_PATTERN.captures(filename)?;
    captures[1].parse().ok()
}

/// Split a CSV line on commas, honoring double-quoted fields.
///
/// Quote characters toggle comma interpretation and are stripped from the
/// output; escaped quotes are not supported.
fn split_quoted(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quote = false;

    for c in line.chars() {
        if c == '"' {
            in_quote = !in_quote;
        } else if c == ',' && !in_quote {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_split_quoted_plain() {
        assert_eq!(split_quoted("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_quoted_embedded_commas() {
        assert_eq!(
            split_quoted(r#"/a/,f2.asm,"6,8,293""#),
            vec!["/a/", "f2.asm", "6,8,293"]
        );
    }

    #[test]
    fn test_split_quoted_trailing_empty_field() {
        assert_eq!(split_quoted("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_parse_asm_id() {
        assert_eq!(parse_asm_id("aie_runtime_control2.asm"), Some(2));
        assert_eq!(parse_asm_id("aie_runtime_control17.asm"), Some(17));
        assert_eq!(parse_asm_id("aie_runtime_control.asm"), None);
        assert_eq!(parse_asm_id("notes.txt"), None);
    }

    #[test]
    fn test_derived_column_band() {
        let info = AsmFileInfo::new("aie_runtime_control2.asm", 2);
        assert_eq!(info.uc_number, 8);
        assert_eq!(info.col_start, 8);
        assert_eq!(info.col_end, 11);

        let info = AsmFileInfo::new("aie_runtime_control0.asm", 0);
        assert_eq!(info.uc_number, 0);
        assert_eq!(info.col_start, 0);
        assert_eq!(info.col_end, 3);
    }

    #[test]
    fn test_read_basic_csv() {
        let file = write_csv(
            "filepath,filename,line_numbers\n\
             /a/,aie_runtime_control2.asm,\"6,8,293\"\n\
             /a/,aie_runtime_control0.asm,\"12\"\n",
        );

        let files = read_asm_info(file.path());
        assert_eq!(files.len(), 2);

        // Sorted ascending by id
        assert_eq!(files[0].asm_id, 0);
        assert_eq!(files[1].asm_id, 2);

        assert_eq!(
            files[1]
                .timestamps
                .iter()
                .map(|t| t.line_number)
                .collect::<Vec<_>>(),
            vec![6, 8, 293]
        );
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let file = write_csv("filepath,filename,line_numbers\n");
        assert!(read_asm_info(file.path()).is_empty());
    }

    #[test]
    fn test_missing_csv_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_asm_info(&dir.path().join("nope.csv")).is_empty());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let file = write_csv(
            "filepath,filename,line_numbers\n\
             only_two_fields,x\n\
             /a/,no_digits.asm,\"1,2\"\n\
             /a/,aie_runtime_control1.asm,\"4,oops,9\"\n",
        );

        let files = read_asm_info(file.path());
        // The two malformed rows contribute nothing; the bad token in the
        // good row is dropped without losing its neighbors.
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].asm_id, 1);
        assert_eq!(
            files[0]
                .timestamps
                .iter()
                .map(|t| t.line_number)
                .collect::<Vec<_>>(),
            vec![4, 9]
        );
    }

    #[test]
    fn test_empty_line_number_field() {
        let file = write_csv(
            "filepath,filename,line_numbers\n\
             /a/,aie_runtime_control3.asm,\"\"\n",
        );

        let files = read_asm_info(file.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].timestamps.is_empty());
    }

    #[test]
    fn test_duplicate_ids_kept() {
        let file = write_csv(
            "filepath,filename,line_numbers\n\
             /a/,aie_runtime_control1.asm,\"5\"\n\
             /b/,aie_runtime_control1.asm,\"7\"\n",
        );

        let files = read_asm_info(file.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].timestamps[0].line_number, 5);
        assert_eq!(files[1].timestamps[0].line_number, 7);
    }
}
