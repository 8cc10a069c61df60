pub mod analytics;
pub mod balances;
pub mod dashboard;
pub mod schema;
pub mod split;
pub mod validate;

use splitc::ledger::{read_ledger_json, Group};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Read a group ledger (JSON) from a file, or stdin with "-"
pub fn read_group(path: &Path) -> anyhow::Result<Group> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        read_from_file(path)
    }
}

pub fn read_groups(paths: &[PathBuf]) -> anyhow::Result<Vec<Group>> {
    paths.iter().map(|p| read_group(p)).collect()
}

fn read_from_file(path: &Path) -> anyhow::Result<Group> {
    let file = File::open(path)
        .map_err(|err| anyhow::anyhow!("cannot open {}: {}", path.display(), err))?;
    let mut group = read_ledger_json(BufReader::new(file))
        .map_err(|err| anyhow::anyhow!("{}: {}", path.display(), err))?;
    if group.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            group.name = stem.to_string_lossy().into_owned();
        }
    }
    Ok(group)
}

fn read_from_stdin() -> anyhow::Result<Group> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a ledger file or pipe data to stdin.");
    }

    let mut group = read_ledger_json(io::Cursor::new(buffer))?;
    if group.name.is_empty() {
        group.name = "stdin".to_string();
    }
    Ok(group)
}
