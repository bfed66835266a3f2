//! Single interface for registering all of the [`Config`]s for `srm`.

use srm_cfg::{Config, ConfigSetBuilder};

pub static DEFAULT_TTL_SECS: Config<u64> = Config::new(
    "default_ttl_secs",
    "Time-to-live, in seconds, of a quarantine that has never persisted its own default.",
    24 * 60 * 60,
);

pub static QUARANTINE_DIR_NAME: Config<&'static str> = Config::new(
    "quarantine_dir_name",
    "Name of the quarantine directory within the home directory.",
    ".safe_rm",
);

pub static ENTRIES_FILENAME: Config<&'static str> = Config::new(
    "entries_filename",
    "Filename, within the quarantine directory, that the staged entries are persisted to.",
    ".entries",
);

pub static SCAN_WORKER_THREADS: Config<u64> = Config::new(
    "scan_worker_threads",
    "Number of threads used for filesystem work like scanning for due entries.",
    1,
);

pub fn all_cfgs(builder: &mut ConfigSetBuilder) {
    builder
        .register(&DEFAULT_TTL_SECS)
        .register(&QUARANTINE_DIR_NAME)
        .register(&ENTRIES_FILENAME)
        .register(&SCAN_WORKER_THREADS);
}
