// Routes the `log` macros to the browser console
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the console logger and the panic hook. Only the first call
/// installs; later calls just adjust the level.
pub fn init(level: log::Level) {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        if console_log::init_with_level(level).is_err() {
            // Another logger is already installed; keep it
        }
    });
    log::set_max_level(level.to_level_filter());
}
