//! Command line interface for `srm`.

use std::io;
use std::num::NonZeroU64;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use srm_core::{Engine, EntryStatus, Execution, Intent, Outcome};
use srm_ore::fmt::HumanSecs;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Move files into quarantine, and delete them once their time-to-live runs out.
///
/// Every invocation also deletes the quarantined entries that are due. An entry is due once
/// TTL has passed since it was last modified, _not_ since it was staged, so staging something
/// that hasn't been touched in a while can get it deleted on the very next run.
#[derive(Debug, Parser)]
#[command(name = "srm", version)]
pub struct Args {
    /// Log what is happening to stderr.
    #[arg(short, long)]
    pub verbose: bool,
    /// Allow staging or deleting directories, along with everything in them.
    #[arg(short = 'r', short_alias = 'R', long, visible_alias = "directory")]
    pub recursive: bool,
    /// Delete PATH immediately instead of staging it.
    #[arg(short = 'n', short_alias = 'N', long, visible_alias = "rm", requires = "path")]
    pub now: bool,

    /// List everything that is staged, and when it will be deleted.
    #[arg(long, conflicts_with_all = ["path", "restore", "set_default"])]
    pub list: bool,
    /// Move the staged entry NAME back into the current directory.
    ///
    /// An entry staged as `NAME~N` because of a name collision is restored as NAME if nothing in
    /// the current directory is called that.
    #[arg(long, value_name = "NAME", conflicts_with_all = ["path", "set_default"])]
    pub restore: Option<String>,
    /// Change the TTL used when none is provided.
    #[arg(long, value_name = "TTL", value_parser = parse_ttl, conflicts_with = "path")]
    pub set_default: Option<u64>,
    /// Quarantine directory to use, defaults to one in the home directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
    /// Print the configuration and exit.
    #[arg(long)]
    pub show_config: bool,

    /// File, or directory with `-r`, to remove.
    pub path: Option<PathBuf>,
    /// How long to keep PATH around, e.g. `30s`, `15m`, `12h` or `7d`. A bare number is in days
    /// and 0 uses the default.
    #[arg(value_parser = parse_ttl, requires = "path")]
    pub ttl: Option<u64>,
}

impl Args {
    /// The [`Intent`] these arguments describe, restored entries are moved into `cwd`.
    pub fn intent(&self, cwd: PathBuf) -> Result<Intent, anyhow::Error> {
        if let Some(name) = &self.restore {
            return Ok(Intent::Restore {
                name: name.clone(),
                destination_dir: cwd,
            });
        }
        if let Some(ttl_secs) = self.set_default {
            let Some(ttl) = NonZeroU64::new(ttl_secs) else {
                anyhow::bail!("the default TTL must be positive");
            };
            return Ok(Intent::SetDefaultTtl { ttl });
        }
        if self.list {
            return Ok(Intent::List);
        }

        let intent = match &self.path {
            Some(path) if self.now => Intent::DeleteNow {
                path: path.clone(),
                recursive: self.recursive,
            },
            Some(path) => Intent::Stage {
                path: path.clone(),
                ttl_secs: self.ttl.unwrap_or(0),
                recursive: self.recursive,
            },
            None => Intent::Sweep,
        };
        Ok(intent)
    }
}

/// Parse a time-to-live like `90s`, `15m`, `12h`, `7d`, or `3` (days) into seconds.
pub fn parse_ttl(raw: &str) -> Result<u64, anyhow::Error> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => (&raw[..idx], unit),
        _ => (raw, 'd'),
    };

    let multiplier = match unit.to_ascii_lowercase() {
        's' => 1,
        'm' => MINUTE,
        'h' => HOUR,
        'd' => DAY,
        other => anyhow::bail!("unknown unit '{other}' in '{raw}', expected one of s, m, h or d"),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        anyhow::bail!("invalid TTL '{raw}', expected a number optionally followed by s, m, h or d");
    }

    let count: u64 = digits
        .parse()
        .with_context(|| format!("invalid TTL '{raw}'"))?;
    count
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("TTL '{raw}' is too large"))
}

/// Tell the user how `execution` went on `out` and stderr, then persist the store of `engine`.
///
/// The store is persisted even when writing to `out` fails. Returns `false` if anything failed.
pub async fn report_and_persist<W: io::Write>(
    engine: &Engine,
    execution: Execution,
    out: &mut W,
) -> bool {
    let mut succeeded = true;
    if let Err(err) = execution.report.into_result() {
        eprintln!("srm: {err}");
        succeeded = false;
    }
    match execution.outcome {
        Ok(outcome) => {
            if let Err(err) = write_outcome(out, &outcome).and_then(|()| out.flush()) {
                eprintln!("srm: failed to write the result: {err}");
                succeeded = false;
            }
        }
        Err(err) => {
            eprintln!("srm: {err:#}");
            succeeded = false;
        }
    }

    if let Err(err) = engine.persist().await {
        eprintln!("srm: {err:#}");
        eprintln!(
            "srm: staged entries may no longer be tracked, recover them manually from '{}'",
            engine.quarantine().root().display()
        );
        succeeded = false;
    }
    succeeded
}

/// Describe `outcome` for the user.
pub fn write_outcome<W: io::Write>(w: &mut W, outcome: &Outcome) -> io::Result<()> {
    match outcome {
        Outcome::Staged { record } => writeln!(
            w,
            "staged '{}', deleting it {} after its last modification",
            record.name(),
            HumanSecs(record.ttl().get())
        ),
        Outcome::Deleted { path, kind } => writeln!(w, "deleted {kind} '{}'", path.display()),
        Outcome::Restored { record, path } => {
            writeln!(w, "restored '{}' to '{}'", record.name(), path.display())
        }
        Outcome::DefaultTtlSet { old, new } => writeln!(
            w,
            "default TTL changed from {} to {}",
            HumanSecs(old.get()),
            HumanSecs(new.get())
        ),
        Outcome::Listing {
            default_ttl,
            entries,
        } => {
            writeln!(w, "default TTL: {}", HumanSecs(default_ttl.get()))?;
            if entries.is_empty() {
                writeln!(w, "nothing is staged")?;
            }
            for entry in entries {
                write_entry(w, entry)?;
            }
            Ok(())
        }
        Outcome::Swept => Ok(()),
    }
}

fn write_entry<W: io::Write>(w: &mut W, entry: &EntryStatus) -> io::Result<()> {
    let EntryStatus {
        record,
        due_in_secs,
    } = entry;
    let ttl = HumanSecs(record.ttl().get());
    match due_in_secs {
        Some(secs) if *secs > 0 => {
            let remaining = HumanSecs(secs.unsigned_abs());
            writeln!(w, "{}\tttl {ttl}\tdeleted in {remaining}", record.name())
        }
        Some(_) => writeln!(w, "{}\tttl {ttl}\tdue", record.name()),
        None => writeln!(w, "{}\tttl {ttl}\tmissing", record.name()),
    }
}
