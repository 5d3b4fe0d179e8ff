//! Lists and extracts Dark Seed II TND text archives.

use std::process::ExitCode;

use ds2arc::ArchiveKind;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    ds2arc::cli::main(ArchiveKind::Tnd).await
}
