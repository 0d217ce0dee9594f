use chrono::Local;
use std::fmt;

fn stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub fn info(args: fmt::Arguments) {
    println!("[{}] INFO {}", stamp(), args);
}

pub fn warn(args: fmt::Arguments) {
    println!("[{}] WARN {}", stamp(), args);
}

pub fn error(args: fmt::Arguments) {
    eprintln!("[{}] ERROR {}", stamp(), args);
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logger::info(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logger::warn(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logger::error(format_args!($($arg)*))
    };
}
