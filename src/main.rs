use std::process::ExitCode;

fn main() -> ExitCode {
    pool_block_notifier_lib::run()
}
