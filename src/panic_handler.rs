use log::error;
use std::panic;

/// Install panic reporting.
///
/// Debug builds get better-panic backtraces; release builds get a
/// human-panic crash report. Either way the panic also lands in the log
/// file, which is otherwise the only trace a background worker leaves.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let thread = std::thread::current();
        error!(
            "Panic in thread '{}': {panic_info}",
            thread.name().unwrap_or("<unnamed>")
        );
        log::logger().flush();

        default_hook(panic_info);
    }));
}
