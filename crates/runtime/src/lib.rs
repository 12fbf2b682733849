pub mod runtime;
pub mod throttle;
pub mod watcher;
pub mod window;
