use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Cursor};
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use paste::paste;
use pd_tree::Tree;
use pd_epidemic::config::BdsirConfig;

// ============================================================
//  Base parsers
// ============================================================

/// A BDSIR model configuration in JSON.
pub fn read_bdsir_config<R: BufRead>(reader: R) -> Result<BdsirConfig> {
    Ok(serde_json::from_reader(reader)?)
}

/// The first tree of a Newick or NEXUS input.
///
/// Newick trees may span multiple lines; everything up to the first `;`
/// is parsed. In NEXUS input the first `tree NAME = ...;` line is used.
pub fn read_newick<R: BufRead>(reader: R) -> Result<Tree> {
    let mut text = String::new();
    let mut nexus = false;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if text.is_empty() && !nexus && line.eq_ignore_ascii_case("#nexus") {
            nexus = true;
            continue;
        }
        if nexus {
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("tree ") {
                let (_, newick) = line.split_once('=')
                    .ok_or_else(|| anyhow!("Malformed NEXUS tree line: {}", line))?;
                text.push_str(newick.trim());
            } else if text.is_empty() {
                continue;
            }
        } else if !line.starts_with('#') {
            text.push_str(line);
        }
        if let Some(end) = text.find(';') {
            text.truncate(end + 1);
            return Ok(Tree::from_newick(&text)?);
        }
    }
    if text.is_empty() {
        bail!("No tree found in input");
    }
    Ok(Tree::from_newick(&text)?)
}

/// `(taxon, value)` pairs of a trait file.
///
/// Entries are separated by commas or newlines and written either as
/// `taxon=value` or as `taxon value`. Lines starting with `#` are ignored.
pub fn read_traits<R: BufRead>(reader: R) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (lnum, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for entry in line.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let pair = entry.split_once('=')
                .or_else(|| entry.split_once(char::is_whitespace));
            let Some((taxon, value)) = pair else {
                bail!("Line {}: expected 'taxon=value', got '{}'", lnum + 1, entry);
            };
            let (taxon, value) = (taxon.trim(), value.trim());
            if taxon.is_empty() || value.is_empty() {
                bail!("Line {}: incomplete trait entry '{}'", lnum + 1, entry);
            }
            entries.push((taxon.to_string(), value.to_string()));
        }
    }
    if entries.is_empty() {
        bail!("No trait entries found in input");
    }
    Ok(entries)
}

// ============================================================
//  Macro generating file/string/stdin/input helpers
// ============================================================

/// Generate input adapters for a base parser function `fn base<R: BufRead>(R) -> Result<T>`.
///
/// This expands into:
/// - `base_string(&str)`
/// - `base_file<P: AsRef<Path>>(P)`
/// - `base_stdin()`
/// - `base_input(&str)`  (dispatches "-" → stdin, otherwise → file)
macro_rules! define_input_variants {
    ($base:ident, $ret:ty) => {
        paste! {
            /// Read from a string buffer.
            pub fn [<$base _string>](s: &str) -> $ret {
                $base(Cursor::new(s))
            }

            /// Read from a file path.
            pub fn [<$base _file>]<P: AsRef<Path>>(path: P) -> $ret {
                let path = path.as_ref();
                let file = File::open(path)
                    .map_err(|e| anyhow!("Cannot open {}: {}", path.display(), e))?;
                $base(BufReader::new(file))
            }

            /// Read from stdin.
            pub fn [<$base _stdin>]() -> $ret {
                let reader = BufReader::new(stdin());
                $base(reader)
            }

            /// Read either from stdin ("-") or a file path.
            pub fn [<$base _input>](s: &str) -> $ret {
                if s == "-" {
                    [<$base _stdin>]()
                } else {
                    [<$base _file>](s)
                }
            }
        }
    };
}

define_input_variants!(read_bdsir_config, Result<BdsirConfig>);
define_input_variants!(read_newick, Result<Tree>);
define_input_variants!(read_traits, Result<Vec<(String, String)>>);

// ============================================================
//  Unit tests
// ============================================================
