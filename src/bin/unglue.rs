//! Lists and extracts Dark Seed II Glue archives.

use std::process::ExitCode;

use ds2arc::ArchiveKind;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    ds2arc::cli::main(ArchiveKind::Glue).await
}
