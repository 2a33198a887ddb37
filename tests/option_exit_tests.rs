// Reading an unregistered option terminates the process with status 37.
// Runs in a forked child so the test harness survives.

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};
use svcboot::error::EXIT_UNKNOWN_OPTION;
use svcboot::OptionSchema;

#[test]
fn test_unknown_option_exits_37() {
    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            let mut schema = OptionSchema::new("exit-check", "0.0.1");
            let _ = schema.get_option("nope");
            // Not reached
            std::process::exit(0);
        }
        ForkResult::Parent { child } => {
            let status = waitpid(child, None).unwrap();
            assert_eq!(status, WaitStatus::Exited(child, EXIT_UNKNOWN_OPTION));
        }
    }
}

#[test]
fn test_removed_option_is_unknown_again() {
    let mut schema = OptionSchema::new("exit-check", "0.0.1");
    assert!(schema.try_get_option("debug").is_ok());
    schema.remove_option("debug");
    assert!(schema.try_get_option("debug").is_err());
}
