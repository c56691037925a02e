//! Logging shims.
//!
//! Call sites use `debug!`/`info!`/`warn!` without caring which diagnostic
//! backend is compiled in. With the `log` feature the calls forward to the
//! `log` crate, with `defmt` to `defmt`, with `esp32-log` to `esp-println`,
//! and with none of them they compile to nothing.

#![allow(unused_macros)]

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::debug!($s $(, $x)*);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(all(feature = "esp32-log", not(any(feature = "log", feature = "defmt"))))]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::info!($s $(, $x)*);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::info!($s $(, $x)*);
        #[cfg(all(feature = "esp32-log", not(any(feature = "log", feature = "defmt"))))]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::warn!($s $(, $x)*);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(all(feature = "esp32-log", not(any(feature = "log", feature = "defmt"))))]
        ::esp_println::println!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt", feature = "esp32-log")))]
        let _ = ($( & $x ),*);
    }};
}
