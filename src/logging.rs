//! File logging. `RUST_LOG` overrides the default spec.

use std::path::Path;

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming,
    WriteMode,
};

const BASENAME: &str = "telegram-top-bot";
const DEBUG_SPEC: &str = "info, telegram_top_bot=debug";
// grammers is chatty at info.
const RELEASE_SPEC: &str = "warn, telegram_top_bot=info";
const MAX_LOG_BYTES: u64 = 10_000_000;
const KEPT_LOG_FILES: usize = 3;

fn default_spec() -> &'static str {
    if cfg!(debug_assertions) {
        DEBUG_SPEC
    } else {
        RELEASE_SPEC
    }
}

/// Start the logger. Debug builds mirror everything to stdout; release
/// builds mirror warnings to stderr and rotate the file.
///
/// Keep the returned handle alive, dropping it loses buffered lines.
pub fn init(log_dir: &Path) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str(default_spec())?
        .log_to_file(FileSpec::default().directory(log_dir).basename(BASENAME))
        .format_for_files(flexi_logger::detailed_format)
        .append();

    let logger = if cfg!(debug_assertions) {
        logger.duplicate_to_stdout(Duplicate::All)
    } else {
        logger.duplicate_to_stderr(Duplicate::Warn).rotate(
            Criterion::Size(MAX_LOG_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEPT_LOG_FILES),
        )
    };

    logger.write_mode(WriteMode::BufferAndFlush).start()
}
