use std::process::ExitCode;

fn main() -> ExitCode {
    // Log level comes from -v/-q; RUST_LOG overrides it:
    //   RUST_LOG=ffx_imagefs_lib::engine=trace ffx-imagefs expand '/var/log/**'
    ffx_imagefs_lib::cli::run()
}
